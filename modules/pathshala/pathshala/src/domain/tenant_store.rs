use parking_lot::RwLock;
use pathshala_sdk::{Pathshala, PathshalaApi, PathshalaError, TenantSlug};
use std::sync::Arc;

use crate::storage::{ClientStorage, keys};

const FALLBACK_MESSAGE: &str = "Failed to load pathshala";

/// Lifecycle of the tenant record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantState {
    Idle,
    Loading,
    Loaded(Pathshala),
    Failed { message: String },
}

struct Inner {
    state: TenantState,
    slug: Option<TenantSlug>,
    /// Bumped by `clear()`; completions from an older epoch are dropped.
    epoch: u64,
}

/// Fetches and caches the tenant record for a slug.
pub struct TenantStore {
    api: Arc<dyn PathshalaApi>,
    storage: Arc<dyn ClientStorage>,
    inner: RwLock<Inner>,
}

impl TenantStore {
    #[must_use]
    pub fn new(api: Arc<dyn PathshalaApi>, storage: Arc<dyn ClientStorage>) -> Self {
        Self {
            api,
            storage,
            inner: RwLock::new(Inner {
                state: TenantState::Idle,
                slug: None,
                epoch: 0,
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> TenantState {
        self.inner.read().state.clone()
    }

    #[must_use]
    pub fn tenant(&self) -> Option<Pathshala> {
        match &self.inner.read().state {
            TenantState::Loaded(tenant) => Some(tenant.clone()),
            _ => None,
        }
    }

    /// Slug of the last fetch, if any.
    #[must_use]
    pub fn slug(&self) -> Option<TenantSlug> {
        self.inner.read().slug.clone()
    }

    /// Fetch the tenant for `slug` and return the resulting state.
    ///
    /// On success the slug is persisted under `pathshala_subdomain`. Every
    /// failure, including `success: false`, ends in `Failed`.
    #[tracing::instrument(skip_all, fields(slug = %slug))]
    pub async fn fetch(&self, slug: &TenantSlug) -> TenantState {
        let epoch = {
            let mut inner = self.inner.write();
            inner.state = TenantState::Loading;
            inner.slug = Some(slug.clone());
            inner.epoch
        };

        let next = match self.load(slug).await {
            Ok(tenant) => {
                if let Err(e) = self.storage.set(keys::SUBDOMAIN, slug.as_str()) {
                    tracing::warn!(error = %e, "failed to persist tenant subdomain");
                }
                tracing::info!(tenant_id = %tenant.pathshala_id, "tenant resolved");
                TenantState::Loaded(tenant)
            }
            Err(e) => {
                tracing::warn!(error = %e, "tenant fetch failed");
                let message = e.message();
                TenantState::Failed {
                    message: if message.is_empty() {
                        FALLBACK_MESSAGE.to_owned()
                    } else {
                        message
                    },
                }
            }
        };

        let mut inner = self.inner.write();
        if inner.epoch == epoch {
            inner.state = next.clone();
        } else {
            tracing::debug!("tenant store cleared during fetch; dropping result");
        }
        next
    }

    async fn load(&self, slug: &TenantSlug) -> Result<Pathshala, PathshalaError> {
        self.api
            .verify_tenant(slug)
            .await?
            .into_result()?
            .ok_or_else(|| PathshalaError::Rejected {
                message: FALLBACK_MESSAGE.to_owned(),
            })
    }

    /// Re-issue the fetch for the last slug. Stays `Idle` when nothing was
    /// fetched yet.
    pub async fn retry(&self) -> TenantState {
        match self.slug() {
            Some(slug) => self.fetch(&slug).await,
            None => self.state(),
        }
    }

    /// Store a tenant returned by a settings save.
    pub fn replace(&self, tenant: Pathshala) {
        self.inner.write().state = TenantState::Loaded(tenant);
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.state = TenantState::Idle;
        inner.slug = None;
        inner.epoch += 1;
    }

    /// Subdomain persisted by the last successful fetch.
    ///
    /// # Errors
    /// Returns `PathshalaError::Storage` if storage cannot be read.
    pub fn cached_slug(&self) -> Result<Option<TenantSlug>, PathshalaError> {
        Ok(self.storage.get(keys::SUBDOMAIN)?.map(TenantSlug::new))
    }
}
