use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Response, StatusCode};
use http_body_util::BodyExt;
use http_body_util::combinators::BoxBody;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{BoxError, HttpError};

/// Decompressed response body.
pub type ResponseBody = BoxBody<Bytes, BoxError>;

/// Response whose body reads are capped at the client's body limit and
/// finish within the request deadline.
#[derive(Debug)]
pub struct HttpResponse {
    inner: Response<ResponseBody>,
    body_limit: usize,
    /// Set when the request was sent; headers and body share it.
    deadline: Instant,
    timeout: Duration,
}

impl HttpResponse {
    pub(crate) fn new(
        inner: Response<ResponseBody>,
        body_limit: usize,
        deadline: Instant,
        timeout: Duration,
    ) -> Self {
        Self {
            inner,
            body_limit,
            deadline,
            timeout,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Collect the body regardless of status.
    ///
    /// # Errors
    /// `HttpError::BodyTooLarge` past the limit, `HttpError::Timeout` when the
    /// request deadline passes first, `HttpError::Connect` if the stream
    /// breaks.
    pub async fn bytes(self) -> Result<Bytes, HttpError> {
        let timeout = self.timeout;
        let body = collect(self.inner.into_body(), self.body_limit);
        tokio::time::timeout_at(self.deadline, body)
            .await
            .map_err(|_| {
                tracing::debug!(timeout_ms = timeout.as_millis(), "response body stalled");
                HttpError::Timeout(timeout)
            })?
    }
}

async fn collect(mut body: ResponseBody, limit: usize) -> Result<Bytes, HttpError> {
    let mut buf = BytesMut::new();
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(HttpError::Connect)?;
        if let Some(chunk) = frame.data_ref() {
            if buf.len() + chunk.len() > limit {
                return Err(HttpError::BodyTooLarge { limit });
            }
            buf.extend_from_slice(chunk);
        }
    }
    Ok(buf.freeze())
}
