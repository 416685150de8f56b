use std::time::Duration;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why a URL was refused before sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidUriKind {
    Unparsable,
    NoHost,
    NoScheme,
}

/// Failure to obtain a response.
///
/// A 4xx or 5xx answer is not an error here; the caller inspects
/// [`HttpResponse::status`](crate::HttpResponse::status).
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid request: {0}")]
    Request(#[from] http::Error),

    #[error("invalid header name: {0}")]
    HeaderName(#[from] http::header::InvalidHeaderName),

    #[error("invalid header value: {0}")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUri {
        url: String,
        kind: InvalidUriKind,
        reason: String,
    },

    #[error("URL scheme '{scheme}' is not allowed")]
    SchemeNotAllowed { scheme: String },

    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Connection, DNS or protocol failure.
    #[error("connection failed: {0}")]
    Connect(#[source] BoxError),

    #[error("TLS setup failed: {0}")]
    Tls(#[source] BoxError),

    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The request queue in front of the connection pool is full.
    #[error("too many requests in flight")]
    Overloaded,

    #[error("HTTP client worker stopped")]
    Closed,
}
