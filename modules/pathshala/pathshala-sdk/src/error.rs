//! Error types for the pathshala module.

use pathshala_http::HttpError;
use std::fmt;
use thiserror::Error;

/// Message used when neither the response nor the transport explain a failure.
pub const FALLBACK_MESSAGE: &str = "Something went wrong";

/// A single client-side validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Wire name of the offending field.
    pub field: &'static str,
    /// Human readable reason.
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors that can occur when talking to the Pathshala backend.
///
/// Every variant can be viewed as `{status, message, data}` through
/// [`status`](Self::status), [`message`](Self::message) and
/// [`data`](Self::data).
#[derive(Debug, Error)]
pub enum PathshalaError {
    /// No response was received (connection, DNS, TLS, timeout).
    #[error(transparent)]
    Transport(#[from] HttpError),

    /// The backend answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// A request hit 401 and the token refresh that followed failed.
    #[error("token refresh failed: {source}")]
    RefreshFailed {
        #[source]
        source: Box<PathshalaError>,
    },

    /// The envelope reported `success: false`.
    #[error("{message}")]
    Rejected { message: String },

    /// Input was rejected before any request was made.
    #[error("validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// Client storage could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl PathshalaError {
    /// Build an [`PathshalaError::Http`] from a status and a raw error body.
    ///
    /// The message is taken from the body's `detail`, then its `message`,
    /// then `transport_text`, then [`FALLBACK_MESSAGE`].
    #[must_use]
    pub fn from_status(status: u16, body: &[u8], transport_text: Option<&str>) -> Self {
        let data = serde_json::from_slice::<serde_json::Value>(body).ok();
        let from_body = |key: &str| {
            data.as_ref()
                .and_then(|v| v.get(key))
                .and_then(serde_json::Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };

        let message = from_body("detail")
            .or_else(|| from_body("message"))
            .or_else(|| {
                transport_text
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| FALLBACK_MESSAGE.to_owned());

        PathshalaError::Http {
            status,
            message,
            data,
        }
    }

    /// HTTP status associated with the failure, if any.
    ///
    /// A failed refresh reports 401.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            PathshalaError::Http { status, .. } => Some(*status),
            PathshalaError::RefreshFailed { .. } => Some(401),
            _ => None,
        }
    }

    /// Human readable message for display.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            PathshalaError::Http { message, .. } | PathshalaError::Rejected { message } => {
                message.clone()
            }
            PathshalaError::RefreshFailed { source } => source.message(),
            PathshalaError::Validation(errors) => errors
                .first()
                .map_or_else(|| FALLBACK_MESSAGE.to_owned(), ToString::to_string),
            PathshalaError::Transport(err) => err.to_string(),
            PathshalaError::Decode(_) | PathshalaError::Storage(_) => self.to_string(),
        }
    }

    /// Parsed response body of the failed request, if there was one.
    #[must_use]
    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            PathshalaError::Http { data, .. } => data.as_ref(),
            PathshalaError::RefreshFailed { source } => source.data(),
            _ => None,
        }
    }

    /// `true` for authorization failures that should send the user to login.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            PathshalaError::Http { status: 401, .. } | PathshalaError::RefreshFailed { .. }
        )
    }
}
