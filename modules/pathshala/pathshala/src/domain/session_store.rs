use parking_lot::RwLock;
use pathshala_sdk::{Credentials, FieldError, PathshalaApi, PathshalaError, SessionUser, TenantSlug};
use secrecy::ExposeSecret;
use std::sync::Arc;

use crate::storage::{ClientStorage, keys};

const ACCESS_DENIED: &str = "Access denied: please check your credentials and try again";

/// Lifecycle of the session user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    /// `None` means the backend reported no logged-in user.
    Loaded(Option<SessionUser>),
    Failed {
        message: String,
        /// Authorization failure; leads to the login page instead of a
        /// retryable error.
        unauthorized: bool,
    },
}

struct Inner {
    state: SessionState,
    /// Tenant the state belongs to; the user is only valid for it.
    slug: Option<TenantSlug>,
    epoch: u64,
}

/// Fetches and caches the logged-in user, and owns login and logout.
pub struct SessionStore {
    api: Arc<dyn PathshalaApi>,
    storage: Arc<dyn ClientStorage>,
    inner: RwLock<Inner>,
}

impl SessionStore {
    #[must_use]
    pub fn new(api: Arc<dyn PathshalaApi>, storage: Arc<dyn ClientStorage>) -> Self {
        Self {
            api,
            storage,
            inner: RwLock::new(Inner {
                state: SessionState::Idle,
                slug: None,
                epoch: 0,
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.read().state.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<SessionUser> {
        match &self.inner.read().state {
            SessionState::Loaded(user) => user.clone(),
            _ => None,
        }
    }

    /// Tenant the current state was fetched for, if any.
    #[must_use]
    pub fn slug(&self) -> Option<TenantSlug> {
        self.inner.read().slug.clone()
    }

    /// Fetch the logged-in user for `slug` and return the resulting state.
    ///
    /// No-op while a fetch for the same slug is in flight or while a user is
    /// cached for it. State held for another slug is discarded.
    #[tracing::instrument(skip_all, fields(slug = %slug))]
    pub async fn fetch(&self, slug: &TenantSlug) -> SessionState {
        let epoch = {
            let mut inner = self.inner.write();
            if inner.slug.as_ref() == Some(slug) {
                if matches!(
                    inner.state,
                    SessionState::Loading | SessionState::Loaded(Some(_))
                ) {
                    tracing::trace!("session fetch skipped");
                    return inner.state.clone();
                }
            } else if inner.slug.is_some() {
                tracing::debug!("session held for another tenant; discarding");
                inner.epoch += 1;
            }
            inner.state = SessionState::Loading;
            inner.slug = Some(slug.clone());
            inner.epoch
        };

        let next = match self.api.logged_in_user(slug).await {
            Ok(envelope) => {
                let user = envelope.result;
                tracing::info!(logged_in = user.is_some(), "session resolved");
                SessionState::Loaded(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, unauthorized = e.is_unauthorized(), "session fetch failed");
                SessionState::Failed {
                    message: e.message(),
                    unauthorized: e.is_unauthorized(),
                }
            }
        };

        let mut inner = self.inner.write();
        if inner.epoch == epoch {
            inner.state = next.clone();
        }
        next
    }

    /// Authenticate against the tenant and persist the issued tokens.
    ///
    /// Returns the user name reported by the backend.
    ///
    /// # Errors
    /// - `Validation` if a field is empty (no request is made)
    /// - `Rejected` if the backend denies access
    /// - transport, HTTP and storage errors as they occur
    #[tracing::instrument(skip_all, fields(slug = %slug))]
    pub async fn login(
        &self,
        slug: &TenantSlug,
        credentials: &Credentials,
    ) -> Result<String, PathshalaError> {
        let mut errors = Vec::new();
        if credentials.user_name.trim().is_empty() {
            errors.push(FieldError::new("userName", "is required"));
        }
        if credentials.password.expose_secret().is_empty() {
            errors.push(FieldError::new("password", "is required"));
        }
        if !errors.is_empty() {
            return Err(PathshalaError::Validation(errors));
        }

        let envelope = self.api.login(slug, credentials).await?;
        let login = match (envelope.success, envelope.result) {
            (true, Some(login)) => login,
            _ => {
                tracing::info!("login denied");
                return Err(PathshalaError::Rejected {
                    message: ACCESS_DENIED.to_owned(),
                });
            }
        };

        self.storage
            .set(keys::ACCESS_TOKEN, login.access_token.expose_secret())?;
        self.storage
            .set(keys::REFRESH_TOKEN, login.refresh_token.expose_secret())?;
        self.storage.set(keys::USER_NAME, &login.user_name)?;
        self.reset_attempt();

        tracing::info!(user = %login.user_name, "logged in");
        Ok(login.user_name)
    }

    /// Log out on the backend, then drop the user and tokens whatever the
    /// backend answered.
    ///
    /// # Errors
    /// Returns the backend error, else any storage error, after local state
    /// has been cleared.
    #[tracing::instrument(skip_all)]
    pub async fn logout(&self) -> Result<(), PathshalaError> {
        let remote = self.api.logout().await;
        if let Err(e) = &remote {
            tracing::warn!(error = %e, "logout request failed; clearing local session anyway");
        }

        let local = self.clear_tokens();
        self.clear();
        remote.and(local)
    }

    fn clear_tokens(&self) -> Result<(), PathshalaError> {
        let mut first_error = None;
        for key in [keys::ACCESS_TOKEN, keys::REFRESH_TOKEN, keys::USER_NAME] {
            if let Err(e) = self.storage.remove(key) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), |e| Err(e.into()))
    }

    /// Forget a settled attempt so the next bootstrap fetches again. A
    /// cached user is kept.
    pub fn reset_attempt(&self) {
        let mut inner = self.inner.write();
        if !matches!(inner.state, SessionState::Loaded(Some(_))) {
            inner.state = SessionState::Idle;
            inner.epoch += 1;
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.state = SessionState::Idle;
        inner.slug = None;
        inner.epoch += 1;
    }
}
