use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Request, Uri};
use http_body_util::Full;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tower::Service;
use zeroize::Zeroizing;

use crate::client::{HttpClient, SharedService, from_queue_error, reserve};
use crate::config::TransportSecurity;
use crate::error::{HttpError, InvalidUriKind};
use crate::response::HttpResponse;

/// A request being assembled. Builder errors surface from [`send`](Self::send).
#[must_use = "a request is only sent by .send()"]
pub struct RequestBuilder {
    service: SharedService,
    body_limit: usize,
    timeout: Duration,
    security: TransportSecurity,
    method: http::Method,
    url: String,
    headers: HeaderMap,
    body: Bytes,
    json: bool,
    pending: Option<HttpError>,
}

impl RequestBuilder {
    pub(crate) fn new(client: &HttpClient, method: http::Method, url: &str) -> Self {
        Self {
            service: client.service.clone(),
            body_limit: client.body_limit,
            timeout: client.request_timeout,
            security: client.security,
            method,
            url: url.to_owned(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            json: false,
            pending: None,
        }
    }

    /// Set a header, replacing an earlier value of the same name.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.pending.is_none() {
            match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
                (Ok(name), Ok(value)) => {
                    self.headers.insert(name, value);
                }
                (Err(e), _) => self.pending = Some(e.into()),
                (_, Err(e)) => self.pending = Some(e.into()),
            }
        }
        self
    }

    /// `Authorization: Bearer <token>`, marked sensitive.
    pub fn bearer_auth(mut self, token: &str) -> Self {
        if self.pending.is_none() {
            let formatted = Zeroizing::new(format!("Bearer {token}"));
            match HeaderValue::from_str(&formatted) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    self.headers.insert(header::AUTHORIZATION, value);
                }
                Err(e) => self.pending = Some(e.into()),
            }
        }
        self
    }

    /// JSON body; `Content-Type` defaults to `application/json`.
    ///
    /// # Errors
    /// A pending builder error, or `HttpError::Json`.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, HttpError> {
        if let Some(err) = self.pending.take() {
            return Err(err);
        }
        self.body = Bytes::from(serde_json::to_vec(body)?);
        self.json = true;
        Ok(self)
    }

    pub fn body_bytes(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    /// Any status, 4xx and 5xx included, is `Ok`.
    ///
    /// # Errors
    /// Builder errors, refused URLs, connection failures, timeouts and a
    /// full request queue.
    pub async fn send(mut self) -> Result<HttpResponse, HttpError> {
        let deadline = Instant::now() + self.timeout;
        if let Some(err) = self.pending.take() {
            return Err(err);
        }

        let uri = check_url(&self.url, self.security)?;
        if self.json && !self.headers.contains_key(header::CONTENT_TYPE) {
            self.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }

        let mut request = Request::builder()
            .method(self.method.clone())
            .uri(uri)
            .body(Full::new(self.body))?;
        *request.headers_mut() = self.headers;

        reserve(&mut self.service).await?;
        tracing::trace!(method = %self.method, url = %self.url, "sending request");
        let response = self
            .service
            .call(request)
            .await
            .map_err(from_queue_error)?;

        Ok(HttpResponse::new(
            response,
            self.body_limit,
            deadline,
            self.timeout,
        ))
    }
}

fn check_url(url: &str, security: TransportSecurity) -> Result<Uri, HttpError> {
    let invalid = |kind, reason: String| HttpError::InvalidUri {
        url: url.to_owned(),
        kind,
        reason,
    };

    let uri: Uri = url
        .parse()
        .map_err(|e: http::uri::InvalidUri| invalid(InvalidUriKind::Unparsable, e.to_string()))?;
    if uri.host().is_none() {
        return Err(invalid(InvalidUriKind::NoHost, "no host".to_owned()));
    }

    match uri.scheme_str() {
        None => Err(invalid(InvalidUriKind::NoScheme, "no scheme".to_owned())),
        Some("https") => Ok(uri),
        Some("http") if security.allows_http() => Ok(uri),
        Some(scheme) => Err(HttpError::SchemeNotAllowed {
            scheme: scheme.to_owned(),
        }),
    }
}
