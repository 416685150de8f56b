//! Bootstrap gate.
//!
//! The gate is a strictly ordered ladder evaluated over a [`Snapshot`] of
//! the tenant and session stores. [`evaluate`] and [`next_action`] are pure;
//! [`Bootstrap`] owns the stores and runs the side effects until the ladder
//! settles.

use pathshala_sdk::{Pathshala, SessionUser, TenantSlug};
use std::sync::Arc;

use super::session_store::{SessionState, SessionStore};
use super::tenant_store::{TenantState, TenantStore};

/// Message shown when the host carries no tenant.
pub const NO_TENANT_MESSAGE: &str = "Invalid access: use your school's subdomain";

/// Resolved context handed to everything behind the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapContext {
    pub slug: TenantSlug,
    pub tenant: Pathshala,
    pub user: SessionUser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapState {
    Unmounted,
    NoTenant,
    ResolvingTenant,
    TenantError { message: String },
    ResolvingSession,
    SessionError { message: String },
    Unauthenticated,
    Ready(Box<BootstrapContext>),
}

impl BootstrapState {
    /// `true` once no further fetch is needed.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(
            self,
            BootstrapState::ResolvingTenant | BootstrapState::ResolvingSession
        )
    }
}

/// Side effect implied by a bootstrap state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    FetchTenant,
    FetchSession,
    RedirectToLogin,
    None,
}

/// Everything the ladder looks at.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub mounted: bool,
    pub slug: Option<TenantSlug>,
    pub tenant: TenantState,
    pub session: SessionState,
}

#[must_use]
pub fn evaluate(snapshot: &Snapshot) -> BootstrapState {
    if !snapshot.mounted {
        return BootstrapState::Unmounted;
    }
    let Some(slug) = &snapshot.slug else {
        return BootstrapState::NoTenant;
    };

    let tenant = match &snapshot.tenant {
        TenantState::Idle | TenantState::Loading => return BootstrapState::ResolvingTenant,
        TenantState::Failed { message } => {
            return BootstrapState::TenantError {
                message: message.clone(),
            };
        }
        TenantState::Loaded(tenant) => tenant,
    };

    match &snapshot.session {
        SessionState::Idle | SessionState::Loading => BootstrapState::ResolvingSession,
        SessionState::Failed {
            message,
            unauthorized: false,
        } => BootstrapState::SessionError {
            message: message.clone(),
        },
        SessionState::Failed {
            unauthorized: true, ..
        }
        | SessionState::Loaded(None) => BootstrapState::Unauthenticated,
        SessionState::Loaded(Some(user)) => BootstrapState::Ready(Box::new(BootstrapContext {
            slug: slug.clone(),
            tenant: tenant.clone(),
            user: user.clone(),
        })),
    }
}

#[must_use]
pub fn next_action(state: &BootstrapState) -> Action {
    match state {
        BootstrapState::ResolvingTenant => Action::FetchTenant,
        BootstrapState::ResolvingSession => Action::FetchSession,
        BootstrapState::Unauthenticated => Action::RedirectToLogin,
        BootstrapState::Unmounted
        | BootstrapState::NoTenant
        | BootstrapState::TenantError { .. }
        | BootstrapState::SessionError { .. }
        | BootstrapState::Ready(_) => Action::None,
    }
}

/// Drives the ladder for one resolved slug.
pub struct Bootstrap {
    slug: Option<TenantSlug>,
    tenants: Arc<TenantStore>,
    sessions: Arc<SessionStore>,
    mounted: bool,
}

impl Bootstrap {
    #[must_use]
    pub fn new(
        slug: Option<TenantSlug>,
        tenants: Arc<TenantStore>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            slug,
            tenants,
            sessions,
            mounted: false,
        }
    }

    #[must_use]
    pub fn slug(&self) -> Option<&TenantSlug> {
        self.slug.as_ref()
    }

    pub fn mount(&mut self) {
        self.mounted = true;
    }

    /// Leave the gate. Store state is discarded; fetches still in flight
    /// finish but their results are dropped.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.tenants.clear();
        self.sessions.clear();
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        // A tenant cached for another slug does not count
        let tenant = if self.tenants.slug().as_ref() == self.slug.as_ref() {
            self.tenants.state()
        } else {
            TenantState::Idle
        };
        // Same for a session fetched under another tenant header
        let session = if self.sessions.slug().as_ref() == self.slug.as_ref() {
            self.sessions.state()
        } else {
            SessionState::Idle
        };
        Snapshot {
            mounted: self.mounted,
            slug: self.slug.clone(),
            tenant,
            session,
        }
    }

    #[must_use]
    pub fn state(&self) -> BootstrapState {
        evaluate(&self.snapshot())
    }

    /// Run the action for the current state once and return the new state.
    pub async fn step(&self) -> BootstrapState {
        let state = self.state();
        let Some(slug) = &self.slug else {
            return state;
        };
        match next_action(&state) {
            Action::FetchTenant => {
                self.tenants.fetch(slug).await;
            }
            Action::FetchSession => {
                self.sessions.fetch(slug).await;
            }
            Action::RedirectToLogin | Action::None => return state,
        }
        self.state()
    }

    /// Step until the ladder settles. Each store is fetched at most once, so
    /// a fetch owned by another task leaves the state resolving.
    #[tracing::instrument(skip_all, fields(slug = ?self.slug.as_ref().map(TenantSlug::as_str)))]
    pub async fn run(&self) -> BootstrapState {
        let mut tenant_fetched = false;
        let mut session_fetched = false;
        loop {
            let state = self.state();
            let fetched = match next_action(&state) {
                Action::FetchTenant => &mut tenant_fetched,
                Action::FetchSession => &mut session_fetched,
                Action::RedirectToLogin | Action::None => {
                    tracing::debug!(?state, "bootstrap settled");
                    return state;
                }
            };
            if *fetched {
                return state;
            }
            *fetched = true;
            self.step().await;
        }
    }

    /// Re-issue the tenant fetch after a `TenantError`, then settle.
    pub async fn retry_tenant(&self) -> BootstrapState {
        if self.mounted && self.slug.is_some() {
            self.tenants.retry().await;
        }
        self.run().await
    }

    /// Forget a failed session attempt, then settle.
    pub async fn retry_session(&self) -> BootstrapState {
        self.sessions.reset_attempt();
        self.run().await
    }
}
