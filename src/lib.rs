//! Read-only aggregation gateway for the Opinion prediction-market API.
//!
//! The upstream API paginates before filtering and is inconsistent about
//! field naming, response envelopes, and even singular vs. plural routes.
//! This crate absorbs all of that: it normalizes heterogeneous upstream
//! records into one canonical schema, applies the client-side filters the
//! upstream does not reliably support, reconciles filtered output pages
//! against unfiltered upstream pages, and caches assembled responses briefly
//! to ride out upstream latency and rate limits.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`upstream`]: Authenticated upstream client and the `MarketSource` seam
//! - [`market`]: Normalization, filtering, and pagination reconciliation
//! - [`cache`]: Bounded LRU cache with per-entry TTL
//! - [`api`]: HTTP API serving the aggregated pages
//! - [`metrics`]: Prometheus metrics

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod market;
pub mod metrics;
pub mod upstream;

pub use config::Config;
pub use error::UpstreamError;
