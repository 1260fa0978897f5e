//! Schema normalization for duck-typed upstream market records.
//!
//! The upstream API is inconsistent about field naming (camelCase,
//! snake_case, and legacy spellings coexist) and about where settlement
//! tokens live. Normalization maps any of those shapes onto
//! [`NormalizedMarket`] via ordered alias lookup. It is a total, pure
//! function: no I/O, never fails, every field resolves to a value or `None`.

use serde_json::{Number, Value};

use super::types::{ChildTokens, NormalizedMarket, TokenPair, TokenSummary};

/// Child container keys, in priority order.
const CHILD_KEYS: [&str; 3] = ["childMarkets", "child_markets", "children"];

/// Recursion bound for child markets. Upstream data nests one level in
/// practice; the bound exists so a malformed payload with circular
/// references cannot recurse unboundedly.
const MAX_CHILD_DEPTH: usize = 8;

/// Normalize one raw upstream record, recursively including its children.
pub fn normalize(raw: &Value) -> NormalizedMarket {
    normalize_at(raw, 0)
}

fn normalize_at(raw: &Value, depth: usize) -> NormalizedMarket {
    let child_markets = if depth < MAX_CHILD_DEPTH {
        pick_children(raw)
            .iter()
            .map(|child| normalize_at(child, depth + 1))
            .collect()
    } else {
        Vec::new()
    };

    NormalizedMarket {
        market_id: pick_str(raw, &["marketId", "id", "market_id"])
            .unwrap_or_else(|| "unknown".to_string()),
        title: pick_str(raw, &["marketTitle", "title"])
            .unwrap_or_else(|| "Untitled market".to_string()),
        status: pick_str(raw, &["statusEnum", "status"]),
        rules: pick_str(raw, &["rules", "rule"]),
        chain_id: pick_num(raw, &["chainId", "chain_id"]),
        quote_token: pick_str(raw, &["quoteToken", "quote_token"]),
        volume_24h: pick_num(raw, &["volume24h", "volume_24h"]),
        volume_7d: pick_num(raw, &["volume7d", "volume_7d"]),
        total_volume: pick_num(raw, &["totalVolume", "total_volume", "volume"]),
        created_at: pick_str(raw, &["createdAt", "created_at"]),
        cutoff_at: pick_str(raw, &["cutoffAt", "cutoff_at"]),
        resolved_at: pick_str(raw, &["resolvedAt", "resolved_at"]),
        yes_token_id: pick_str(raw, &["yesTokenId", "yes_token_id"]),
        no_token_id: pick_str(raw, &["noTokenId", "no_token_id"]),
        child_markets,
    }
}

/// Report where a market's settlement tokens live: on the root record, on
/// children, or both. Token placement varies upstream, so callers use this
/// instead of re-deriving it per market.
pub fn summarize_token_location(market: &NormalizedMarket) -> TokenSummary {
    let has_root_tokens = market.yes_token_id.is_some() || market.no_token_id.is_some();

    let child_tokens = market
        .child_markets
        .iter()
        .filter(|child| child.yes_token_id.is_some() || child.no_token_id.is_some())
        .map(|child| ChildTokens {
            market_id: child.market_id.clone(),
            yes_token_id: child.yes_token_id.clone(),
            no_token_id: child.no_token_id.clone(),
        })
        .collect();

    TokenSummary {
        root_tokens: has_root_tokens.then(|| TokenPair {
            yes_token_id: market.yes_token_id.clone(),
            no_token_id: market.no_token_id.clone(),
        }),
        child_tokens,
    }
}

/// First candidate key holding a non-empty string wins.
fn pick_str(raw: &Value, keys: &[&str]) -> Option<String> {
    let obj = raw.as_object()?;
    for key in keys {
        if let Some(Value::String(s)) = obj.get(*key) {
            if !s.is_empty() {
                return Some(s.clone());
            }
        }
    }
    None
}

/// First candidate key holding a native number or a parseable numeric string
/// (trimmed, non-empty) wins; everything else is absent.
fn pick_num(raw: &Value, keys: &[&str]) -> Option<Number> {
    let obj = raw.as_object()?;
    for key in keys {
        match obj.get(*key) {
            Some(Value::Number(n)) => return Some(n.clone()),
            Some(Value::String(s)) => {
                if let Some(n) = parse_number(s.trim()) {
                    return Some(n);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_number(text: &str) -> Option<Number> {
    if text.is_empty() {
        return None;
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Number::from(i));
    }
    if let Ok(u) = text.parse::<u64>() {
        return Some(Number::from(u));
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

/// First child container key holding an array wins; anything else is empty.
fn pick_children(raw: &Value) -> &[Value] {
    if let Some(obj) = raw.as_object() {
        for key in CHILD_KEYS {
            if let Some(Value::Array(children)) = obj.get(key) {
                return children;
            }
        }
    }
    &[]
}
