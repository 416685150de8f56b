//! HTTP implementation of [`PathshalaApi`].
//!
//! Requests carry the stored access token as a bearer credential. A 401 on
//! a request triggers one `POST /auth/refresh` on a separate transport,
//! after which the request is replayed exactly once. Refreshes are
//! serialized: a request that waited on another refresh, or whose token was
//! replaced meanwhile, replays without refreshing again.

use async_trait::async_trait;
use bytes::Bytes;
use pathshala_http::{
    HttpClient, HttpClientBuilder, HttpError, HttpResponse, InvalidUriKind, TlsRootConfig,
    TransportSecurity,
};
use pathshala_sdk::{
    ContactInfoUpdate, Credentials, Envelope, GeneralInfoUpdate, LeadershipUpdate, LoginResponse,
    LogoUpload, Pathshala, PathshalaApi, PathshalaError, SessionUser, TenantSlug,
};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;

use crate::config::ApiConfig;
use crate::storage::{ClientStorage, keys};

/// Header carrying the tenant slug on tenant-scoped requests.
pub const TENANT_HEADER: &str = "x-pathshala-id";

const JSON: &str = "application/json";

struct ApiRequest {
    method: http::Method,
    url: String,
    tenant: Option<TenantSlug>,
    body: Option<Bytes>,
    /// Login and refresh answer 401 for bad credentials; never refresh on them.
    refresh_on_unauthorized: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody<'a> {
    user_name: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody<'a> {
    reason: &'static str,
    refresh_token: Option<&'a str>,
}

/// Backend client with bearer auth and refresh-on-401.
pub struct ApiClient {
    http: HttpClient,
    refresh_http: HttpClient,
    base_url: Url,
    storage: Arc<dyn ClientStorage>,
    refresh_lock: tokio::sync::Mutex<()>,
    /// Completed refreshes. A refresh may leave the stored token unchanged
    /// (cookie sessions), so waiters compare this instead.
    refreshes: AtomicU64,
}

impl ApiClient {
    /// # Errors
    /// Returns `PathshalaError::Transport` if the base URL is invalid or the
    /// transport cannot be built.
    pub fn new(
        config: &ApiConfig,
        storage: Arc<dyn ClientStorage>,
    ) -> Result<Self, PathshalaError> {
        let base_url = parse_base_url(&config.base_url)?;

        let builder = || {
            let mut builder = HttpClientBuilder::new().timeout(config.request_timeout);
            if let Some(user_agent) = &config.user_agent {
                builder = builder.user_agent(user_agent.clone());
            }
            if config.allow_insecure_http {
                builder = builder.transport(TransportSecurity::AllowInsecureHttp);
            }
            if config.native_roots {
                builder = builder.tls_roots(TlsRootConfig::Native);
            }
            builder
        };

        // Refresh runs on a second transport without auth handling
        let http = builder().build()?;
        let refresh_http = builder().build()?;

        Ok(Self {
            http,
            refresh_http,
            base_url,
            storage,
            refresh_lock: tokio::sync::Mutex::new(()),
            refreshes: AtomicU64::new(0),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        // parse_base_url rejects URLs that cannot take path segments
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.into()
    }

    fn access_token(&self) -> Result<Option<String>, PathshalaError> {
        Ok(self.storage.get(keys::ACCESS_TOKEN)?)
    }

    fn request(&self, method: http::Method, segments: &[&str]) -> ApiRequest {
        ApiRequest {
            method,
            url: self.endpoint(segments),
            tenant: None,
            body: None,
            refresh_on_unauthorized: true,
        }
    }

    async fn send_once(
        &self,
        req: &ApiRequest,
        token: Option<&str>,
    ) -> Result<HttpResponse, PathshalaError> {
        let mut builder = self
            .http
            .request(req.method.clone(), &req.url)
            .header("content-type", JSON)
            .header("accept", JSON);
        if let Some(tenant) = &req.tenant {
            builder = builder.header(TENANT_HEADER, tenant.as_str());
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &req.body {
            builder = builder.body_bytes(body.clone());
        }
        Ok(builder.send().await?)
    }

    #[tracing::instrument(skip_all, fields(method = %req.method, url = %req.url))]
    async fn execute<T: DeserializeOwned>(
        &self,
        req: ApiRequest,
    ) -> Result<Envelope<T>, PathshalaError> {
        let seen = self.refreshes.load(Ordering::Acquire);
        let token = self.access_token()?;
        let resp = self.send_once(&req, token.as_deref()).await?;

        if resp.status() != http::StatusCode::UNAUTHORIZED || !req.refresh_on_unauthorized {
            return decode(resp).await;
        }

        tracing::debug!("request unauthorized; refreshing access token");
        self.refresh(seen, token.as_deref())
            .await
            .map_err(|e| PathshalaError::RefreshFailed {
                source: Box::new(e),
            })?;

        let token = self.access_token()?;
        let replay = self.send_once(&req, token.as_deref()).await?;
        decode(replay).await
    }

    /// Exchange the refresh token for new tokens.
    ///
    /// `seen` is the refresh count and `stale` the access token from before
    /// the failed request was sent. When another refresh completed since, or
    /// the token was replaced, nothing is sent.
    #[tracing::instrument(skip_all)]
    async fn refresh(&self, seen: u64, stale: Option<&str>) -> Result<(), PathshalaError> {
        let _guard = self.refresh_lock.lock().await;

        if self.refreshes.load(Ordering::Acquire) != seen {
            tracing::debug!("access token already refreshed by a concurrent request");
            return Ok(());
        }
        let current = self.access_token()?;
        if current.is_some() && current.as_deref() != stale {
            tracing::debug!("access token replaced while the request was in flight");
            return Ok(());
        }

        let refresh_token = self.storage.get(keys::REFRESH_TOKEN)?;
        let body = RefreshBody {
            reason: "expired_token",
            refresh_token: refresh_token.as_deref(),
        };
        let resp = self
            .refresh_http
            .post(&self.endpoint(&["auth", "refresh"]))
            .header("accept", JSON)
            .json(&body)?
            .send()
            .await?;

        // A cookie-based refresh may answer 200 with no body
        if resp.status().is_success() {
            let body = resp.bytes().await?;
            if !body.iter().all(u8::is_ascii_whitespace) {
                let envelope: Envelope<serde_json::Value> =
                    serde_json::from_slice(&body).map_err(PathshalaError::Decode)?;
                self.store_refreshed_tokens(envelope.into_result()?.as_ref())?;
            }
        } else {
            decode::<serde_json::Value>(resp).await?;
        }
        self.refreshes.fetch_add(1, Ordering::AcqRel);
        tracing::info!("access token refreshed");
        Ok(())
    }

    fn store_refreshed_tokens(
        &self,
        result: Option<&serde_json::Value>,
    ) -> Result<(), PathshalaError> {
        let token = |key: &str| {
            result
                .and_then(|v| v.get(key))
                .and_then(serde_json::Value::as_str)
                .filter(|s| !s.is_empty())
        };

        if let Some(access) = token("accessToken") {
            self.storage.set(keys::ACCESS_TOKEN, access)?;
        }
        if let Some(refresh) = token("refreshToken") {
            self.storage.set(keys::REFRESH_TOKEN, refresh)?;
        }
        Ok(())
    }

    fn tenant_post<B: Serialize>(
        &self,
        slug: &TenantSlug,
        segments: &[&str],
        body: &B,
    ) -> Result<ApiRequest, PathshalaError> {
        let mut req = self.request(http::Method::POST, segments);
        req.tenant = Some(slug.clone());
        req.body = Some(Bytes::from(
            serde_json::to_vec(body).map_err(HttpError::from)?,
        ));
        Ok(req)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, PathshalaError> {
    let invalid = |reason: String| {
        PathshalaError::Transport(HttpError::InvalidUri {
            url: raw.to_owned(),
            kind: InvalidUriKind::Unparsable,
            reason,
        })
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot be used as a base".to_owned()));
    }
    Ok(url)
}

async fn decode<T: DeserializeOwned>(resp: HttpResponse) -> Result<Envelope<T>, PathshalaError> {
    let status = resp.status();
    if status.is_success() {
        let body = resp.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Envelope {
                success: true,
                message: None,
                result: None,
            });
        }
        return serde_json::from_slice(&body).map_err(PathshalaError::Decode);
    }

    // An unreadable error body still yields the status error
    let body = resp.bytes().await.unwrap_or_default();
    let transport_text = format!("Request failed with status code {}", status.as_u16());
    tracing::debug!(status = status.as_u16(), "request failed");
    Err(PathshalaError::from_status(
        status.as_u16(),
        &body,
        Some(&transport_text),
    ))
}

#[async_trait]
impl PathshalaApi for ApiClient {
    async fn verify_tenant(
        &self,
        slug: &TenantSlug,
    ) -> Result<Envelope<Pathshala>, PathshalaError> {
        let req = self.request(
            http::Method::GET,
            &["pathshala", "verify", slug.as_str()],
        );
        self.execute(req).await
    }

    async fn logged_in_user(
        &self,
        slug: &TenantSlug,
    ) -> Result<Envelope<SessionUser>, PathshalaError> {
        let mut req = self.request(http::Method::GET, &["user", "loggedin-user"]);
        req.tenant = Some(slug.clone());
        self.execute(req).await
    }

    async fn login(
        &self,
        slug: &TenantSlug,
        credentials: &Credentials,
    ) -> Result<Envelope<LoginResponse>, PathshalaError> {
        let body = LoginBody {
            user_name: &credentials.user_name,
            password: credentials.password.expose_secret(),
        };
        let mut req = self.tenant_post(slug, &["auth", "login"], &body)?;
        req.refresh_on_unauthorized = false;
        self.execute(req).await
    }

    async fn logout(&self) -> Result<(), PathshalaError> {
        let req = self.request(http::Method::POST, &["auth", "logout"]);
        self.execute::<serde_json::Value>(req).await.map(|_| ())
    }

    async fn update_general(
        &self,
        slug: &TenantSlug,
        tenant_id: &str,
        update: &GeneralInfoUpdate,
    ) -> Result<Envelope<Pathshala>, PathshalaError> {
        let req = self.tenant_post(slug, &["pathshala", "update-general", tenant_id], update)?;
        self.execute(req).await
    }

    async fn update_contact(
        &self,
        slug: &TenantSlug,
        tenant_id: &str,
        update: &ContactInfoUpdate,
    ) -> Result<Envelope<Pathshala>, PathshalaError> {
        let req = self.tenant_post(slug, &["pathshala", "update-contact", tenant_id], update)?;
        self.execute(req).await
    }

    async fn update_leadership(
        &self,
        slug: &TenantSlug,
        tenant_id: &str,
        update: &LeadershipUpdate,
    ) -> Result<Envelope<Pathshala>, PathshalaError> {
        let req = self.tenant_post(
            slug,
            &["pathshala", "update-leadership", tenant_id],
            update,
        )?;
        self.execute(req).await
    }

    async fn update_logo(
        &self,
        slug: &TenantSlug,
        tenant_id: &str,
        upload: &LogoUpload,
    ) -> Result<Envelope<Pathshala>, PathshalaError> {
        let req = self.tenant_post(slug, &["pathshala", "update-logo", tenant_id], upload)?;
        self.execute(req).await
    }
}
