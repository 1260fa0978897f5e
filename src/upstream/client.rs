//! Opinion API client adapter.
//!
//! The adapter knows nothing about the market schema: it builds authenticated
//! requests, enforces the timeout and retry contract, and hands back untyped
//! JSON for the normalizer to interpret.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::error::UpstreamError;
use crate::metrics;

/// Options for one upstream request.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// HTTP method, GET by default.
    pub method: Method,
    /// Query parameters; `None` or empty values are omitted entirely, never
    /// sent as literal placeholder strings.
    pub query: Vec<(&'static str, Option<String>)>,
    /// Optional JSON body.
    pub body: Option<Value>,
    /// Per-request timeout override.
    pub timeout: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }
}

/// Query parameters forwarded to the upstream list endpoint. One upstream
/// page fetch, independent of the filtered output page.
#[derive(Debug, Clone)]
pub struct ListQuery {
    /// Upstream page size; the reconciler uses the caller's page size.
    pub page_size: u32,
    pub q: Option<String>,
    pub status: Option<String>,
    pub chain_id: Option<String>,
    pub quote_token: Option<String>,
    pub sort: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page_size: 20,
            q: None,
            status: None,
            chain_id: None,
            quote_token: None,
            sort: None,
        }
    }
}

/// Source of raw market data, implemented by the real client and by the test
/// mock. The detail fallback lives here so every implementation shares the
/// plural/singular tolerance.
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Fetch one raw upstream list page.
    async fn fetch_page(&self, query: &ListQuery, api_page: u32) -> Result<Value, UpstreamError>;

    /// Fetch one market via the plural `markets/{id}` route.
    async fn fetch_market_plural(&self, market_id: &str) -> Result<Value, UpstreamError>;

    /// Fetch one market via the legacy singular `market/{id}` route.
    async fn fetch_market_singular(&self, market_id: &str) -> Result<Value, UpstreamError>;

    /// Fetch one market, tolerating the upstream plural/singular routing
    /// inconsistency: try `markets/{id}` first, fall back to `market/{id}`.
    async fn fetch_market(&self, market_id: &str) -> Result<Value, UpstreamError> {
        match self.fetch_market_plural(market_id).await {
            Ok(payload) => Ok(payload),
            Err(err) => {
                debug!(market_id, error = %err, "plural detail route failed, trying singular");
                self.fetch_market_singular(market_id).await
            }
        }
    }
}

/// Authenticated HTTP client for the Opinion open API.
#[derive(Debug, Clone)]
pub struct OpinionClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL, normalized to end with a slash so joins keep the base path.
    base_url: String,
    /// Credential for the `x-api-key` header.
    api_key: Option<String>,
    /// Fixed backoff before the single retry.
    retry_backoff: Duration,
}

impl OpinionClient {
    /// Create a new client from config.
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(Duration::from_secs(2))
            .tcp_keepalive(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .expect("failed to create HTTP client");

        let base_url = if config.opinion_api_base.ends_with('/') {
            config.opinion_api_base.clone()
        } else {
            format!("{}/", config.opinion_api_base)
        };

        Self {
            http,
            base_url,
            api_key: config.opinion_api_key.clone(),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Issue one upstream request per the adapter contract: fail fast without
    /// a credential, retry exactly once on 429/5xx or transport failure, and
    /// return the body as untyped JSON.
    #[instrument(skip(self, options), fields(path = %path))]
    pub async fn fetch(&self, path: &str, options: FetchOptions) -> Result<Value, UpstreamError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(UpstreamError::MissingCredential)?;

        let url = self.build_url(path, &options.query)?;

        match self.attempt(api_key, &url, &options).await {
            Err(err) if err.is_retryable() => {
                warn!(url = %url, error = %err, "transient upstream failure, retrying once");
                metrics::inc_upstream_retries();
                tokio::time::sleep(self.retry_backoff).await;
                self.attempt(api_key, &url, &options).await
            }
            result => result,
        }
    }

    async fn attempt(
        &self,
        api_key: &str,
        url: &Url,
        options: &FetchOptions,
    ) -> Result<Value, UpstreamError> {
        let started = Instant::now();

        let mut request = self
            .http
            .request(options.method.clone(), url.clone())
            .header("content-type", "application/json")
            .header("x-api-key", api_key);

        if let Some(body) = &options.body {
            request = request.json(body);
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                error!(url = %url, "upstream request timed out");
            }
            UpstreamError::Transport(err)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), url = %url, "upstream returned non-2xx");
            return Err(UpstreamError::Http {
                status: status.as_u16(),
                body,
            });
        }

        metrics::record_upstream_latency(started);

        response
            .json::<Value>()
            .await
            .map_err(|err| UpstreamError::Parse(err.to_string()))
    }

    /// Resolve `path` against the base URL and attach non-empty query
    /// parameters. Absent or empty parameters are omitted entirely.
    fn build_url(
        &self,
        path: &str,
        query: &[(&'static str, Option<String>)],
    ) -> Result<Url, UpstreamError> {
        let base = Url::parse(&self.base_url)
            .map_err(|err| UpstreamError::Parse(format!("invalid base URL: {err}")))?;
        let mut url = base
            .join(path)
            .map_err(|err| UpstreamError::Parse(format!("invalid path {path:?}: {err}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                if let Some(value) = value {
                    if !value.is_empty() {
                        pairs.append_pair(key, value);
                    }
                }
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        Ok(url)
    }
}

#[async_trait]
impl MarketSource for OpinionClient {
    async fn fetch_page(&self, query: &ListQuery, api_page: u32) -> Result<Value, UpstreamError> {
        let page_size = query.page_size.to_string();
        self.fetch(
            "markets",
            FetchOptions {
                query: vec![
                    ("page", Some(api_page.to_string())),
                    ("pageSize", Some(page_size.clone())),
                    ("limit", Some(page_size)),
                    ("q", query.q.clone()),
                    ("status", query.status.clone()),
                    ("chainId", query.chain_id.clone()),
                    ("quoteToken", query.quote_token.clone()),
                    ("sort", query.sort.clone()),
                ],
                ..FetchOptions::default()
            },
        )
        .await
    }

    async fn fetch_market_plural(&self, market_id: &str) -> Result<Value, UpstreamError> {
        self.fetch(&format!("markets/{market_id}"), FetchOptions::default())
            .await
    }

    async fn fetch_market_singular(&self, market_id: &str) -> Result<Value, UpstreamError> {
        self.fetch(&format!("market/{market_id}"), FetchOptions::default())
            .await
    }
}
