//! Store error types and HTTP status classification.
//!
//! Every HTTP response funnels through [`classify_status`]; the resulting
//! [`StatusClass`] is interpreted per operation.  Listing swallows
//! `NotFound` (an empty prefix is a valid outcome), fetch/delete/locate
//! raise it.  Redirects are never followed and always fatal.

use thiserror::Error;

/// Coarse classification of an HTTP response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx.
    Success,
    /// 404.
    NotFound,
    /// [300, 399] — fatal, redirects are never followed.
    Redirect,
    /// Any other 4xx or 5xx (and anything outside [200, 599]).
    Error,
}

/// Classify an HTTP status code.
pub fn classify_status(status: u16) -> StatusClass {
    match status {
        404 => StatusClass::NotFound,
        200..=299 => StatusClass::Success,
        300..=399 => StatusClass::Redirect,
        _ => StatusClass::Error,
    }
}

/// Errors surfaced by store operations.
///
/// Nothing is retried internally; every failure propagates to the caller
/// synchronously as the operation's terminal outcome.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object does not exist (HTTP 404 on delete/fetch/locate).
    #[error("object not found")]
    NotFound,

    /// The backend answered with a redirect, which is a configuration
    /// error: the store never follows redirects.
    #[error("redirect not supported: HTTP {status} {status_text}")]
    RedirectUnsupported { status: u16, status_text: String },

    /// The backend rejected the request (4xx/5xx other than 404).
    /// Carries the error-stream body, best-effort (empty if unavailable).
    #[error("{verb} {url} failed: HTTP {status} {status_text}: {body}")]
    Request {
        verb: String,
        url: String,
        status: u16,
        status_text: String,
        body: String,
    },

    /// I/O or transport failure, including connect/read timeouts.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store configuration cannot produce a usable request
    /// (unparseable base URL, missing host).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A 2xx response whose body could not be decoded (JSON or XML).
    #[error("malformed response from {url}: {detail}")]
    MalformedResponse { url: String, detail: String },
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_success_range() {
        assert_eq!(classify_status(200), StatusClass::Success);
        assert_eq!(classify_status(204), StatusClass::Success);
        assert_eq!(classify_status(299), StatusClass::Success);
    }

    #[test]
    fn test_classify_not_found() {
        assert_eq!(classify_status(404), StatusClass::NotFound);
    }

    #[test]
    fn test_classify_redirect_range() {
        assert_eq!(classify_status(300), StatusClass::Redirect);
        assert_eq!(classify_status(301), StatusClass::Redirect);
        assert_eq!(classify_status(399), StatusClass::Redirect);
    }

    #[test]
    fn test_classify_errors() {
        assert_eq!(classify_status(400), StatusClass::Error);
        assert_eq!(classify_status(403), StatusClass::Error);
        assert_eq!(classify_status(409), StatusClass::Error);
        assert_eq!(classify_status(500), StatusClass::Error);
        assert_eq!(classify_status(599), StatusClass::Error);
    }

    #[test]
    fn test_classify_informational_is_error() {
        // 1xx responses are not a success for this protocol.
        assert_eq!(classify_status(100), StatusClass::Error);
    }

    #[test]
    fn test_request_error_display_carries_context() {
        let err = StoreError::Request {
            verb: "PUT".to_string(),
            url: "http://s3.example.com/bucket/Foo/1".to_string(),
            status: 500,
            status_text: "Internal Server Error".to_string(),
            body: "<Error><Code>InternalError</Code></Error>".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("PUT"));
        assert!(msg.contains("http://s3.example.com/bucket/Foo/1"));
        assert!(msg.contains("500"));
        assert!(msg.contains("InternalError"));
    }
}
