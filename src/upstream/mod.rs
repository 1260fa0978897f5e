//! Upstream Opinion API access.
//!
//! This module handles:
//! - The authenticated HTTP client adapter with timeout and single-retry
//! - The `MarketSource` seam the reconciler and handlers are written against
//! - A mock source for testing without network access

pub mod client;
pub mod mock;

pub use client::{FetchOptions, ListQuery, MarketSource, OpinionClient};
pub use mock::{MockSource, MockSourceConfig};
