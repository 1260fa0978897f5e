//! HTTP API handlers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use tracing::error;

use crate::cache::LruTtlCache;
use crate::config::Config;
use crate::error::UpstreamError;
use crate::market::paginate::{check_app_error, get_page, MarketPage, PageRequest};
use crate::market::{normalize, summarize_token_location, FilterCriteria, NormalizedMarket, TokenSummary};
use crate::metrics;
use crate::upstream::{ListQuery, MarketSource};

/// Default output page size.
const DEFAULT_PAGE_SIZE: u32 = 20;

/// Application state shared with handlers. Constructed once at startup; the
/// caches live for the process lifetime, not per request.
#[derive(Clone)]
pub struct AppState {
    /// Upstream market source.
    pub source: Arc<dyn MarketSource>,
    /// Cache for assembled list pages.
    pub list_cache: Arc<Mutex<LruTtlCache<MarketPage>>>,
    /// Cache for detail responses, keyed by market id.
    pub detail_cache: Arc<Mutex<LruTtlCache<DetailResponse>>>,
    /// Scan ceiling for the pagination reconciler.
    pub max_scan_pages: u32,
    /// Configured upstream base URL, reported by the debug endpoint.
    pub api_base: String,
    /// Whether an upstream credential is configured.
    pub has_api_key: bool,
    /// Prometheus render handle, when metrics are installed.
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Create app state from config and an upstream source.
    pub fn new(config: &Config, source: Arc<dyn MarketSource>) -> Self {
        Self {
            source,
            list_cache: Arc::new(Mutex::new(LruTtlCache::new(
                config.cache_capacity,
                Duration::from_millis(config.list_cache_ttl_ms),
            ))),
            detail_cache: Arc::new(Mutex::new(LruTtlCache::new(
                config.cache_capacity,
                Duration::from_millis(config.detail_cache_ttl_ms),
            ))),
            max_scan_pages: config.max_scan_pages,
            api_base: config.opinion_api_base.clone(),
            has_api_key: config.has_api_key(),
            metrics_handle: None,
        }
    }

    /// Attach a Prometheus handle for the `/metrics` endpoint.
    pub fn with_metrics_handle(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

/// Query parameters accepted by the list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<u32>,
    /// Preferred page size parameter.
    pub limit: Option<u32>,
    /// Alternate page size parameter; `limit` wins when both are present.
    pub page_size: Option<u32>,
    pub q: Option<String>,
    pub status: Option<String>,
    pub chain_id: Option<String>,
    pub quote_token: Option<String>,
    pub sort: Option<String>,
    /// `legacy` selects the original response field naming.
    pub shape: Option<String>,
}

/// List response in the current shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub items: Vec<NormalizedMarket>,
    /// Upstream-reported unfiltered total when available, else the count of
    /// filtered matches seen during the scan.
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
}

/// List response in the legacy shape consumed by existing clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyListResponse {
    pub list: Vec<LegacyListItem>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
}

/// Per-item field naming used by the legacy list shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyListItem {
    pub market_id: String,
    pub market_title: String,
    pub status_enum: Option<String>,
    pub chain_id: Option<Number>,
    pub quote_token: Option<String>,
    pub volume_24h: Option<Number>,
    pub volume_7d: Option<Number>,
    pub total_volume: Option<Number>,
    pub child_markets: Vec<NormalizedMarket>,
}

impl From<NormalizedMarket> for LegacyListItem {
    fn from(market: NormalizedMarket) -> Self {
        Self {
            market_id: market.market_id,
            market_title: market.title,
            status_enum: market.status,
            chain_id: market.chain_id,
            quote_token: market.quote_token,
            volume_24h: market.volume_24h,
            volume_7d: market.volume_7d,
            total_volume: market.total_volume,
            child_markets: market.child_markets,
        }
    }
}

/// Detail response: the normalized market with a trimmed child projection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailResponse {
    pub market_id: String,
    pub title: String,
    pub status: Option<String>,
    pub rules: Option<String>,
    pub created_at: Option<String>,
    pub cutoff_at: Option<String>,
    pub resolved_at: Option<String>,
    pub child_markets: Vec<DetailChild>,
}

/// Child market projection in the detail response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailChild {
    pub market_id: String,
    pub title: String,
    pub resolved_at: Option<String>,
    pub yes_token_id: Option<String>,
    pub no_token_id: Option<String>,
    pub total_volume: Option<Number>,
}

impl From<NormalizedMarket> for DetailResponse {
    fn from(market: NormalizedMarket) -> Self {
        Self {
            market_id: market.market_id,
            title: market.title,
            status: market.status,
            rules: market.rules,
            created_at: market.created_at,
            cutoff_at: market.cutoff_at,
            resolved_at: market.resolved_at,
            child_markets: market
                .child_markets
                .into_iter()
                .map(|child| DetailChild {
                    market_id: child.market_id,
                    title: child.title,
                    resolved_at: child.resolved_at,
                    yes_token_id: child.yes_token_id,
                    no_token_id: child.no_token_id,
                    total_volume: child.total_volume,
                })
                .collect(),
        }
    }
}

/// Error body returned on upstream failure.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Debug endpoint response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugResponse {
    pub config: DebugConfig,
    pub probe: DebugProbe,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<NormalizedMarket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenSummary>,
}

/// Configuration presence reported by the debug endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugConfig {
    pub api_base: String,
    pub has_key: bool,
}

/// Result of the cheap upstream reachability probe.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugProbe {
    pub status: Option<u16>,
    pub sample_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Query parameters for the debug endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugParams {
    pub market_id: Option<String>,
}

fn upstream_failure(err: &UpstreamError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Upstream request failed",
            message: err.to_string(),
        }),
    )
        .into_response()
}

fn render_list(page: MarketPage, request: &PageRequest, legacy: bool) -> Response {
    let total = page.upstream_total.unwrap_or(page.matched_count);
    if legacy {
        Json(LegacyListResponse {
            list: page.items.into_iter().map(LegacyListItem::from).collect(),
            total,
            page: request.page,
            page_size: request.page_size,
            has_more: page.has_more,
        })
        .into_response()
    } else {
        Json(ListResponse {
            items: page.items,
            total,
            page: request.page,
            page_size: request.page_size,
            has_more: page.has_more,
        })
        .into_response()
    }
}

/// List endpoint: one page of filtered, normalized markets.
pub async fn list_markets(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    let filter = FilterCriteria {
        q: params.q.clone(),
        status: params.status.clone(),
        chain_id: params.chain_id.clone(),
        quote_token: params.quote_token.clone(),
    };
    let request = PageRequest::new(
        params.page.unwrap_or(1),
        params
            .limit
            .or(params.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE),
        filter,
        params.sort.clone(),
    );
    let legacy = params.shape.as_deref() == Some("legacy");

    let key = request.cache_key();
    let cached = state.list_cache.lock().unwrap().get(&key);
    if let Some(page) = cached {
        metrics::inc_cache_hit("list");
        return render_list(page, &request, legacy);
    }
    metrics::inc_cache_miss("list");

    match get_page(state.source.as_ref(), &request, state.max_scan_pages).await {
        Ok(page) => {
            state.list_cache.lock().unwrap().set(&key, page.clone());
            render_list(page, &request, legacy)
        }
        Err(err) => {
            error!(
                error = %err,
                page = request.page,
                page_size = request.page_size,
                "list request failed"
            );
            upstream_failure(&err)
        }
    }
}

/// Detail endpoint: one normalized market with its child markets.
pub async fn market_detail(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
) -> Response {
    let market_id = market_id.trim().to_string();
    if market_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Missing market id",
                message: "a market id path segment is required".to_string(),
            }),
        )
            .into_response();
    }

    let cached = state.detail_cache.lock().unwrap().get(&market_id);
    if let Some(detail) = cached {
        metrics::inc_cache_hit("detail");
        return Json(detail).into_response();
    }
    metrics::inc_cache_miss("detail");

    match fetch_detail(state.source.as_ref(), &market_id).await {
        Ok(detail) => {
            state.detail_cache.lock().unwrap().set(&market_id, detail.clone());
            Json(detail).into_response()
        }
        Err(err) => {
            error!(error = %err, market_id, "detail request failed");
            upstream_failure(&err)
        }
    }
}

async fn fetch_detail(
    source: &dyn MarketSource,
    market_id: &str,
) -> Result<DetailResponse, UpstreamError> {
    let raw = source.fetch_market(market_id).await?;
    check_app_error(&raw)?;
    Ok(DetailResponse::from(normalize(&raw)))
}

/// Debug endpoint: configuration presence, an upstream reachability probe,
/// and optionally one market with its token-location summary.
pub async fn debug(State(state): State<AppState>, Query(params): Query<DebugParams>) -> Response {
    let probe_query = ListQuery {
        page_size: 1,
        ..ListQuery::default()
    };
    let probe = match state.source.fetch_page(&probe_query, 1).await {
        Ok(payload) => DebugProbe {
            status: Some(200),
            sample_keys: payload
                .as_object()
                .map(|obj| obj.keys().take(10).cloned().collect())
                .unwrap_or_default(),
            message: None,
        },
        Err(err) => DebugProbe {
            status: None,
            sample_keys: Vec::new(),
            message: Some(err.to_string()),
        },
    };

    let config = DebugConfig {
        api_base: state.api_base.clone(),
        has_key: state.has_api_key,
    };

    let Some(market_id) = params.market_id.filter(|id| !id.is_empty()) else {
        return Json(DebugResponse {
            config,
            probe,
            market: None,
            tokens: None,
        })
        .into_response();
    };

    let looked_up = async {
        let raw = state.source.fetch_market(&market_id).await?;
        check_app_error(&raw)?;
        Ok::<_, UpstreamError>(normalize(&raw))
    }
    .await;

    match looked_up {
        Ok(market) => {
            let tokens = summarize_token_location(&market);
            Json(DebugResponse {
                config,
                probe,
                market: Some(market),
                tokens: Some(tokens),
            })
            .into_response()
        }
        Err(err) => {
            error!(error = %err, market_id, "debug market lookup failed");
            upstream_failure(&err)
        }
    }
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Prometheus metrics render.
pub async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
