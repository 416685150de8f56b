use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use std::future::Future;
use std::pin::Pin;
use std::task::Poll;
use std::time::Duration;
use tower::Service;
use tower::buffer::Buffer;

use crate::builder::HttpClientBuilder;
use crate::config::TransportSecurity;
use crate::error::{BoxError, HttpError};
use crate::request::RequestBuilder;
use crate::response::ResponseBody;

pub type StackFuture =
    Pin<Box<dyn Future<Output = Result<Response<ResponseBody>, HttpError>> + Send>>;

/// The middleware stack behind a bounded queue; clones share one worker.
pub type SharedService = Buffer<Request<Full<Bytes>>, StackFuture>;

/// Cloneable HTTP client.
///
/// Every clone feeds the same connection pool, so the client can be held
/// directly in long-lived services.
#[derive(Clone)]
pub struct HttpClient {
    pub(crate) service: SharedService,
    pub(crate) body_limit: usize,
    pub(crate) request_timeout: Duration,
    pub(crate) security: TransportSecurity,
}

impl HttpClient {
    #[must_use]
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Start a request. `url` must be absolute.
    pub fn request(&self, method: http::Method, url: &str) -> RequestBuilder {
        RequestBuilder::new(self, method, url)
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(http::Method::GET, url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.request(http::Method::POST, url)
    }
}

/// Errors from the stack arrive boxed; anything else means the worker died.
pub fn from_queue_error(err: BoxError) -> HttpError {
    match err.downcast::<HttpError>() {
        Ok(err) => *err,
        Err(err) => {
            tracing::error!(error = %err, "http client worker stopped");
            HttpError::Closed
        }
    }
}

/// Claim a queue slot without waiting; a full queue is `Overloaded`.
pub async fn reserve(service: &mut SharedService) -> Result<(), HttpError> {
    let ready = std::future::poll_fn(|cx| match service.poll_ready(cx) {
        Poll::Ready(result) => Poll::Ready(Some(result)),
        Poll::Pending => Poll::Ready(None),
    })
    .await;

    match ready {
        Some(Ok(())) => Ok(()),
        Some(Err(err)) => Err(from_queue_error(err)),
        None => Err(HttpError::Overloaded),
    }
}
