//! Mock market source for unit testing.
//!
//! Provides a [`MarketSource`] backed by queued payloads so the reconciler
//! and HTTP handlers can be tested without network access.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::UpstreamError;

use super::client::{ListQuery, MarketSource};

/// Configuration for mock source behavior.
#[derive(Debug, Clone, Default)]
pub struct MockSourceConfig {
    /// Fail every list page fetch with a 503.
    pub fail_pages: bool,
    /// Fail the plural `markets/{id}` route so callers exercise the
    /// singular fallback.
    pub fail_plural_detail: bool,
    /// Fail the singular `market/{id}` route too.
    pub fail_singular_detail: bool,
}

/// Mock market source for testing.
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    config: MockSourceConfig,
    /// List page payloads; index 0 serves upstream page 1. Pages past the
    /// end serve an empty envelope.
    pages: Arc<Mutex<Vec<Value>>>,
    /// Detail payloads by market id.
    details: Arc<Mutex<HashMap<String, Value>>>,
    /// Upstream page indices requested, in order.
    page_requests: Arc<Mutex<Vec<u32>>>,
    /// Detail paths requested, in order (`markets/{id}` or `market/{id}`).
    detail_requests: Arc<Mutex<Vec<String>>>,
}

impl MockSource {
    /// Create a mock source with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock source with custom failure behavior.
    pub fn with_config(config: MockSourceConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Queue the payload served for the next unserved upstream page index.
    pub fn push_page(&self, payload: Value) {
        self.pages.lock().unwrap().push(payload);
    }

    /// Set the detail payload for a market id.
    pub fn set_detail(&self, market_id: &str, payload: Value) {
        self.details
            .lock()
            .unwrap()
            .insert(market_id.to_string(), payload);
    }

    /// Upstream page indices requested so far.
    pub fn page_requests(&self) -> Vec<u32> {
        self.page_requests.lock().unwrap().clone()
    }

    /// Detail paths requested so far.
    pub fn detail_requests(&self) -> Vec<String> {
        self.detail_requests.lock().unwrap().clone()
    }

    fn detail_for(&self, market_id: &str) -> Result<Value, UpstreamError> {
        self.details
            .lock()
            .unwrap()
            .get(market_id)
            .cloned()
            .ok_or(UpstreamError::Http {
                status: 404,
                body: format!("no mock detail for {market_id}"),
            })
    }
}

#[async_trait]
impl MarketSource for MockSource {
    async fn fetch_page(&self, _query: &ListQuery, api_page: u32) -> Result<Value, UpstreamError> {
        self.page_requests.lock().unwrap().push(api_page);

        if self.config.fail_pages {
            return Err(UpstreamError::Http {
                status: 503,
                body: "mock outage".to_string(),
            });
        }

        let pages = self.pages.lock().unwrap();
        Ok(pages
            .get(api_page.saturating_sub(1) as usize)
            .cloned()
            .unwrap_or_else(|| json!({ "items": [] })))
    }

    async fn fetch_market_plural(&self, market_id: &str) -> Result<Value, UpstreamError> {
        self.detail_requests
            .lock()
            .unwrap()
            .push(format!("markets/{market_id}"));

        if self.config.fail_plural_detail {
            return Err(UpstreamError::Http {
                status: 500,
                body: "mock plural route failure".to_string(),
            });
        }

        self.detail_for(market_id)
    }

    async fn fetch_market_singular(&self, market_id: &str) -> Result<Value, UpstreamError> {
        self.detail_requests
            .lock()
            .unwrap()
            .push(format!("market/{market_id}"));

        if self.config.fail_singular_detail {
            return Err(UpstreamError::Http {
                status: 500,
                body: "mock singular route failure".to_string(),
            });
        }

        self.detail_for(market_id)
    }
}
