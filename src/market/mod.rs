//! Market normalization, filtering, and pagination reconciliation.
//!
//! This module handles:
//! - The canonical market schema and token-location summary
//! - Normalizing duck-typed upstream records into that schema
//! - The client-side filter predicate
//! - The result-window reconciler that pages over unfiltered upstream data

pub mod filter;
pub mod normalize;
pub mod paginate;
pub mod types;

pub use filter::FilterCriteria;
pub use normalize::{normalize, summarize_token_location};
pub use paginate::{get_page, MarketPage, PageRequest};
pub use types::{NormalizedMarket, TokenSummary};
