use bytes::Bytes;
use http::header::{HeaderValue, USER_AGENT};
use http::Response;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::time::Duration;
use tower::buffer::Buffer;
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::decompression::DecompressionLayer;
use tower_http::set_header::SetRequestHeaderLayer;

use crate::client::{HttpClient, SharedService};
use crate::config::{ClientOptions, TlsRootConfig, TransportSecurity};
use crate::error::{BoxError, HttpError};
use crate::response::ResponseBody;
use crate::tls;

/// Requests allowed to wait for the worker before `Overloaded`.
const QUEUE_CAPACITY: usize = 64;
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const POOL_MAX_IDLE_PER_HOST: usize = 4;

/// Configures and builds an [`HttpClient`].
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    options: ClientOptions,
}

impl HttpClientBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole-request deadline, body included.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.request_timeout = timeout;
        self
    }

    /// Sent when the request has no `User-Agent` of its own.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.options.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.options.body_limit = bytes;
        self
    }

    #[must_use]
    pub fn transport(mut self, security: TransportSecurity) -> Self {
        self.options.security = security;
        self
    }

    #[must_use]
    pub fn tls_roots(mut self, roots: TlsRootConfig) -> Self {
        self.options.roots = roots;
        self
    }

    /// Must be called inside a tokio runtime; the request queue spawns its
    /// worker task here.
    ///
    /// # Errors
    /// TLS setup failures and a user agent that is not a valid header value.
    pub fn build(self) -> Result<HttpClient, HttpError> {
        let ClientOptions {
            request_timeout,
            body_limit,
            user_agent,
            security,
            roots,
        } = self.options;

        if security.allows_http() {
            tracing::warn!("plain HTTP allowed; use only against local backends");
        }

        let connector = tls::connector(roots, security)?;
        let user_agent_value = HeaderValue::from_str(&user_agent)?;

        let hyper = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .build::<_, Full<Bytes>>(connector);

        let stack = ServiceBuilder::new()
            .layer(TimeoutLayer::new(request_timeout))
            .layer(SetRequestHeaderLayer::if_not_present(USER_AGENT, user_agent_value))
            .layer(DecompressionLayer::new())
            .service(hyper)
            .map_response(box_body)
            .map_err(move |err: BoxError| classify(err, request_timeout))
            .boxed_clone();
        let service: SharedService = Buffer::new(stack, QUEUE_CAPACITY);

        tracing::debug!(
            timeout_ms = request_timeout.as_millis(),
            user_agent = %user_agent,
            "http client built"
        );
        Ok(HttpClient {
            service,
            body_limit,
            request_timeout,
            security,
        })
    }
}

fn box_body<B>(response: Response<B>) -> Response<ResponseBody>
where
    B: hyper::body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<BoxError>,
{
    response.map(|body| body.map_err(Into::into).boxed())
}

fn classify(err: BoxError, timeout: Duration) -> HttpError {
    if err.is::<Elapsed>() {
        return HttpError::Timeout(timeout);
    }
    match err.downcast::<HttpError>() {
        Ok(err) => *err,
        Err(err) => HttpError::Connect(err),
    }
}
