//! Pagination reconciler.
//!
//! The upstream API paginates before our filters apply, while callers expect
//! pages of *filtered* results. The reconciler bridges the two: it scans
//! successive unfiltered upstream pages sequentially, normalizes and filters
//! each record, and assembles the one output window the caller asked for.
//! Matches before the window are counted and discarded; the scan stops when
//! the window is satisfied, the upstream runs out of data, or the scan
//! ceiling is reached.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::UpstreamError;
use crate::metrics;
use crate::upstream::{ListQuery, MarketSource};

use super::filter::FilterCriteria;
use super::normalize::normalize;
use super::types::NormalizedMarket;

/// Envelope keys that may wrap the record list, in priority order.
const LIST_KEYS: [&str; 4] = ["items", "list", "markets", "data"];

/// Keys that may carry the upstream-reported unfiltered total.
const TOTAL_KEYS: [&str; 4] = ["total", "count", "totalCount", "total_count"];

/// Hard output page size bounds.
pub const MIN_PAGE_SIZE: u32 = 1;
pub const MAX_PAGE_SIZE: u32 = 50;

/// One requested output window plus filter and sort parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Output page, 1-based.
    pub page: u32,
    /// Output page size; also used as the upstream page size.
    pub page_size: u32,
    pub filter: FilterCriteria,
    /// Sort key, forwarded to the upstream as-is.
    pub sort: Option<String>,
}

impl PageRequest {
    /// Build a request with page and page size clamped to their bounds.
    pub fn new(page: u32, page_size: u32, filter: FilterCriteria, sort: Option<String>) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE),
            filter,
            sort,
        }
    }

    /// Canonical cache key covering every parameter that affects the result.
    /// Serialized as JSON so values containing separator characters cannot
    /// collide with each other's parameters.
    pub fn cache_key(&self) -> String {
        serde_json::json!({
            "page": self.page,
            "pageSize": self.page_size,
            "q": self.filter.q,
            "status": self.filter.status,
            "chainId": self.filter.chain_id,
            "quoteToken": self.filter.quote_token,
            "sort": self.sort,
        })
        .to_string()
    }

    fn list_query(&self) -> ListQuery {
        ListQuery {
            page_size: self.page_size,
            q: self.filter.q.clone(),
            status: self.filter.status.clone(),
            chain_id: self.filter.chain_id.clone(),
            quote_token: self.filter.quote_token.clone(),
            sort: self.sort.clone(),
        }
    }
}

/// One assembled output page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketPage {
    /// Filtered, normalized records inside the requested window.
    pub items: Vec<NormalizedMarket>,
    /// False only when end-of-upstream-data was reached during the scan; a
    /// heuristic, since matches past the scan ceiling are unknown.
    pub has_more: bool,
    /// Filtered matches seen during the scan, window included. Bounded by the
    /// scan ceiling, so an estimate for selective filters on large data.
    pub matched_count: u64,
    /// Unfiltered total reported by the upstream, when present. Kept separate
    /// from `matched_count`; the two measure different things.
    pub upstream_total: Option<u64>,
}

/// Assemble one output window by scanning up to `max_scan_pages` upstream
/// pages through `source`.
#[instrument(skip(source, request), fields(page = request.page, page_size = request.page_size))]
pub async fn get_page(
    source: &dyn MarketSource,
    request: &PageRequest,
    max_scan_pages: u32,
) -> Result<MarketPage, UpstreamError> {
    // Re-clamp here so a hand-built request cannot underflow the window math.
    let page = request.page.max(1) as usize;
    let page_size = request.page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE) as usize;
    let start_index = (page - 1) * page_size;
    let end_index = start_index + page_size;

    let mut query = request.list_query();
    query.page_size = page_size as u32;
    let mut items: Vec<NormalizedMarket> = Vec::new();
    let mut matched_count = 0usize;
    let mut reached_end = false;
    let mut upstream_total = None;
    let mut pages_scanned = 0u32;

    for api_page in 1..=max_scan_pages {
        let payload = source.fetch_page(&query, api_page).await?;
        pages_scanned = api_page;

        check_app_error(&payload)?;

        if upstream_total.is_none() {
            upstream_total = extract_total(&payload);
        }

        let raw_markets = extract_markets(&payload);
        if raw_markets.is_empty() {
            if let Some(obj) = payload.as_object() {
                let keys: Vec<&str> = obj.keys().take(10).map(String::as_str).collect();
                warn!(?keys, api_page, "upstream page had no extractable records");
            }
            reached_end = true;
            break;
        }

        for raw in raw_markets {
            let market = normalize(raw);
            if !request.filter.matches(&market) {
                continue;
            }
            if matched_count >= start_index && items.len() < page_size {
                items.push(market);
            }
            matched_count += 1;
            if items.len() >= page_size && matched_count >= end_index {
                break;
            }
        }

        if items.len() >= page_size && matched_count >= end_index {
            break;
        }

        // Upstream convention: a short page is the last page.
        if raw_markets.len() < page_size {
            reached_end = true;
            break;
        }
    }

    metrics::record_scan_pages(pages_scanned);
    if !reached_end && items.len() < page_size {
        debug!(
            pages_scanned,
            matched = matched_count,
            "scan ceiling reached before the window filled"
        );
    }

    Ok(MarketPage {
        items,
        has_more: !reached_end,
        matched_count: matched_count as u64,
        upstream_total,
    })
}

/// Check the application-level error envelope carried independently of HTTP
/// status: `errno != 0` means failure even on a 200.
pub fn check_app_error(payload: &Value) -> Result<(), UpstreamError> {
    let Some(obj) = payload.as_object() else {
        return Ok(());
    };
    match obj.get("errno").and_then(Value::as_i64) {
        Some(errno) if errno != 0 => Err(UpstreamError::Application {
            errno,
            errmsg: obj
                .get("errmsg")
                .and_then(Value::as_str)
                .unwrap_or("Upstream error")
                .to_string(),
        }),
        _ => Ok(()),
    }
}

/// Pull the raw record list out of whichever envelope the upstream used: a
/// bare array, a known list key, or one level of nesting under `data` or
/// `result`. Unknown shapes read as zero records.
fn extract_markets(payload: &Value) -> &[Value] {
    if let Value::Array(list) = payload {
        return list;
    }
    let Some(obj) = payload.as_object() else {
        return &[];
    };

    for key in LIST_KEYS {
        if let Some(Value::Array(list)) = obj.get(key) {
            return list;
        }
    }

    if let Some(Value::Object(nested)) = obj.get("data") {
        for key in ["items", "list", "markets"] {
            if let Some(Value::Array(list)) = nested.get(key) {
                return list;
            }
        }
    }

    if let Some(Value::Object(nested)) = obj.get("result") {
        if let Some(Value::Array(list)) = nested.get("list") {
            return list;
        }
    }

    &[]
}

/// Pull the upstream-reported unfiltered total, when present.
fn extract_total(payload: &Value) -> Option<u64> {
    let obj = payload.as_object()?;

    let mut candidates: Vec<&Value> = TOTAL_KEYS.iter().filter_map(|key| obj.get(*key)).collect();
    if let Some(Value::Object(result)) = obj.get("result") {
        if let Some(total) = result.get("total") {
            candidates.push(total);
        }
    }

    for value in candidates {
        match value {
            Value::Number(n) => {
                if let Some(total) = n.as_u64() {
                    return Some(total);
                }
            }
            Value::String(s) => {
                if let Ok(total) = s.trim().parse() {
                    return Some(total);
                }
            }
            _ => {}
        }
    }
    None
}
