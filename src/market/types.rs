//! Canonical market schema.

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// A market record in the canonical schema.
///
/// Every field is either a typed value or `None`; construction never fails.
/// Child markets carry the same shape recursively, so the schema is
/// self-similar at any depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMarket {
    /// Canonical market identifier. `"unknown"` when no source field
    /// resolved, which signals an upstream contract violation rather than a
    /// usable id.
    pub market_id: String,

    /// Display title, `"Untitled market"` when absent upstream.
    pub title: String,

    pub status: Option<String>,
    pub rules: Option<String>,
    pub chain_id: Option<Number>,
    pub quote_token: Option<String>,

    pub volume_24h: Option<Number>,
    pub volume_7d: Option<Number>,
    pub total_volume: Option<Number>,

    pub created_at: Option<String>,
    pub cutoff_at: Option<String>,
    pub resolved_at: Option<String>,

    /// Settlement token ids; placement varies upstream (root or children).
    pub yes_token_id: Option<String>,
    pub no_token_id: Option<String>,

    /// Recursively normalized children, upstream order preserved.
    pub child_markets: Vec<NormalizedMarket>,
}

/// Where a market's settlement tokens live: on the root record, on child
/// markets, or both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSummary {
    /// Tokens on the top-level market itself, if any.
    pub root_tokens: Option<TokenPair>,
    /// Every child market that carries tokens.
    pub child_tokens: Vec<ChildTokens>,
}

/// A yes/no settlement token pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub yes_token_id: Option<String>,
    pub no_token_id: Option<String>,
}

/// Token pair attributed to a specific child market.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildTokens {
    pub market_id: String,
    pub yes_token_id: Option<String>,
    pub no_token_id: Option<String>,
}
