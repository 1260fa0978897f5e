//! Prometheus metrics for upstream latency and cache behavior.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};

// === Metric Name Constants ===

/// Upstream request latency metric name.
pub const METRIC_UPSTREAM_LATENCY: &str = "upstream_request_latency_ms";
/// Upstream retries counter metric name.
pub const METRIC_UPSTREAM_RETRIES: &str = "upstream_retries_total";
/// Upstream pages scanned per reconciliation metric name.
pub const METRIC_SCAN_PAGES: &str = "reconciler_scan_pages";
/// Cache hits counter metric name.
pub const METRIC_CACHE_HITS: &str = "cache_hits_total";
/// Cache misses counter metric name.
pub const METRIC_CACHE_MISSES: &str = "cache_misses_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_UPSTREAM_LATENCY,
        "Upstream API request latency in milliseconds"
    );
    describe_histogram!(
        METRIC_SCAN_PAGES,
        "Upstream pages scanned to fill one output window"
    );
    describe_counter!(METRIC_UPSTREAM_RETRIES, "Upstream requests retried once");
    describe_counter!(METRIC_CACHE_HITS, "Response cache hits");
    describe_counter!(METRIC_CACHE_MISSES, "Response cache misses");
}

/// Record latency of one successful upstream request.
pub fn record_upstream_latency(start: Instant) {
    histogram!(METRIC_UPSTREAM_LATENCY).record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Increment the upstream retry counter.
pub fn inc_upstream_retries() {
    counter!(METRIC_UPSTREAM_RETRIES).increment(1);
}

/// Record how many upstream pages one reconciliation scanned.
pub fn record_scan_pages(pages: u32) {
    histogram!(METRIC_SCAN_PAGES).record(pages as f64);
}

/// Increment the cache hit counter for a named cache.
pub fn inc_cache_hit(cache: &'static str) {
    counter!(METRIC_CACHE_HITS, "cache" => cache).increment(1);
}

/// Increment the cache miss counter for a named cache.
pub fn inc_cache_miss(cache: &'static str) {
    counter!(METRIC_CACHE_MISSES, "cache" => cache).increment(1);
}
