//! Client-side filter predicate over normalized markets.
//!
//! The upstream API does not reliably apply these filters server-side, so
//! the reconciler applies them per record after normalization.

use serde::Deserialize;

use super::types::NormalizedMarket;

/// Optional, independently applied filter criteria. Present criteria are
/// ANDed; absent criteria impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FilterCriteria {
    /// Case-insensitive substring match against the title.
    pub q: Option<String>,
    /// Case-insensitive exact match against the normalized status.
    pub status: Option<String>,
    /// String-compared chain id, tolerating numeric/string mismatch.
    pub chain_id: Option<String>,
    /// Case-insensitive exact match against the quote token.
    pub quote_token: Option<String>,
}

impl FilterCriteria {
    /// Whether `market` satisfies every present criterion. A market with an
    /// absent attribute fails any criterion naming that attribute.
    pub fn matches(&self, market: &NormalizedMarket) -> bool {
        if let Some(q) = &self.q {
            if !market.title.to_lowercase().contains(&q.to_lowercase()) {
                return false;
            }
        }

        if let Some(status) = &self.status {
            match &market.status {
                Some(s) if s.eq_ignore_ascii_case(status) => {}
                _ => return false,
            }
        }

        if let Some(chain_id) = &self.chain_id {
            match &market.chain_id {
                Some(id) if chain_id_matches(id, chain_id) => {}
                _ => return false,
            }
        }

        if let Some(quote_token) = &self.quote_token {
            match &market.quote_token {
                Some(t) if t.eq_ignore_ascii_case(quote_token) => {}
                _ => return false,
            }
        }

        true
    }

    /// Whether any criterion is present at all.
    pub fn is_empty(&self) -> bool {
        self.q.is_none()
            && self.status.is_none()
            && self.chain_id.is_none()
            && self.quote_token.is_none()
    }
}

/// Chain id comparison tolerating numeric/string representation drift: an
/// integral float like `56.0` matches the filter value `"56"`.
fn chain_id_matches(id: &serde_json::Number, wanted: &str) -> bool {
    if id.to_string() == wanted {
        return true;
    }
    match (id.as_f64(), wanted.trim().parse::<f64>()) {
        (Some(have), Ok(want)) => have == want,
        _ => false,
    }
}
