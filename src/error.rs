//! Unified error types for the gateway.

use thiserror::Error;

/// Errors raised while talking to the upstream Opinion API.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// No API credential is configured; no network call was attempted.
    #[error("missing OPINION_API_KEY credential")]
    MissingCredential,

    /// Transport-level failure (connect error, timeout, TLS, ...).
    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx HTTP status after the retry budget was exhausted.
    #[error("upstream HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, best effort.
        body: String,
    },

    /// Application-level error envelope in an otherwise-OK response.
    #[error("upstream application error {errno}: {errmsg}")]
    Application {
        /// Upstream error code (`errno != 0`).
        errno: i64,
        /// Upstream error message.
        errmsg: String,
    },

    /// Response body was not parseable as JSON.
    #[error("failed to parse upstream payload: {0}")]
    Parse(String),
}

impl UpstreamError {
    /// Whether this failure warrants the adapter's single retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            UpstreamError::Http { status, .. } => *status == 429 || (500..=599).contains(status),
            UpstreamError::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_429_and_5xx_are_retryable() {
        assert!(UpstreamError::Http { status: 429, body: String::new() }.is_retryable());
        assert!(UpstreamError::Http { status: 500, body: String::new() }.is_retryable());
        assert!(UpstreamError::Http { status: 503, body: String::new() }.is_retryable());
    }

    #[test]
    fn other_4xx_and_application_errors_are_not_retryable() {
        assert!(!UpstreamError::Http { status: 404, body: String::new() }.is_retryable());
        assert!(!UpstreamError::Http { status: 400, body: String::new() }.is_retryable());
        assert!(!UpstreamError::Application { errno: 7, errmsg: "bad".into() }.is_retryable());
        assert!(!UpstreamError::MissingCredential.is_retryable());
    }
}
