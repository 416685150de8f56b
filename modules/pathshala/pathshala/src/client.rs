//! Composition root.

use pathshala_sdk::{PathshalaApi, PathshalaError, TenantSlug};
use std::sync::Arc;

use crate::config::PathshalaConfig;
use crate::domain::api_client::ApiClient;
use crate::domain::bootstrap::Bootstrap;
use crate::domain::session_store::SessionStore;
use crate::domain::settings::SettingsService;
use crate::domain::tenant_store::TenantStore;
use crate::storage::{ClientStorage, FileStorage, MemoryStorage};
use crate::tenant::TenantResolver;

/// Owns one set of services sharing a storage backend and an API client.
pub struct PathshalaClient {
    resolver: TenantResolver,
    storage: Arc<dyn ClientStorage>,
    api: Arc<dyn PathshalaApi>,
    tenants: Arc<TenantStore>,
    sessions: Arc<SessionStore>,
    settings: SettingsService,
}

impl PathshalaClient {
    /// Build the client over HTTP. Storage is file-backed when
    /// `storage.path` is set, in-memory otherwise.
    ///
    /// # Errors
    /// Returns an error if the storage file is unreadable or the API
    /// transport cannot be built.
    pub fn from_config(config: &PathshalaConfig) -> Result<Self, PathshalaError> {
        let storage: Arc<dyn ClientStorage> = match &config.storage.path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "using file storage");
                Arc::new(FileStorage::open(path)?)
            }
            None => Arc::new(MemoryStorage::new()),
        };
        let api = Arc::new(ApiClient::new(&config.api, storage.clone())?);
        Ok(Self::with_api(
            TenantResolver::new(config.tenant.local_host.clone()),
            api,
            storage,
        ))
    }

    /// Build the client over any [`PathshalaApi`] implementation.
    #[must_use]
    pub fn with_api(
        resolver: TenantResolver,
        api: Arc<dyn PathshalaApi>,
        storage: Arc<dyn ClientStorage>,
    ) -> Self {
        let tenants = Arc::new(TenantStore::new(api.clone(), storage.clone()));
        let sessions = Arc::new(SessionStore::new(api.clone(), storage.clone()));
        let settings = SettingsService::new(api.clone(), tenants.clone());
        Self {
            resolver,
            storage,
            api,
            tenants,
            sessions,
            settings,
        }
    }

    #[must_use]
    pub fn resolve(&self, host: &str) -> Option<TenantSlug> {
        self.resolver.resolve(host)
    }

    /// A bootstrap gate for `host`, sharing this client's stores.
    #[must_use]
    pub fn bootstrap(&self, host: &str) -> Bootstrap {
        let slug = self.resolve(host);
        tracing::debug!(host, slug = ?slug.as_ref().map(TenantSlug::as_str), "resolved host");
        Bootstrap::new(slug, self.tenants.clone(), self.sessions.clone())
    }

    #[must_use]
    pub fn tenants(&self) -> &Arc<TenantStore> {
        &self.tenants
    }

    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    #[must_use]
    pub fn settings(&self) -> &SettingsService {
        &self.settings
    }

    #[must_use]
    pub fn api(&self) -> &Arc<dyn PathshalaApi> {
        &self.api
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn ClientStorage> {
        &self.storage
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::bootstrap::BootstrapState;
    use crate::storage::keys;
    use crate::test_support::{FakeApi, Reply, tenant, user};

    #[tokio::test]
    async fn bootstrap_shares_stores() {
        let api = FakeApi::new();
        api.tenant_replies(vec![Reply::Ok(Some(tenant("VK Learning Center")))]);
        api.user_replies(vec![Reply::Ok(Some(user("asha", &["3"])))]);
        let client = PathshalaClient::with_api(
            TenantResolver::default(),
            api.clone(),
            Arc::new(MemoryStorage::new()),
        );

        let mut gate = client.bootstrap("vk-learnings.vk-services.shop");
        gate.mount();
        assert!(matches!(gate.run().await, BootstrapState::Ready(_)));

        assert!(client.tenants().tenant().is_some());
        assert_eq!(client.sessions().user().unwrap().user_name, "asha");
        assert_eq!(
            client.storage().get(keys::SUBDOMAIN).unwrap().as_deref(),
            Some("vk-learnings")
        );
    }

    #[test]
    fn local_host_has_no_tenant() {
        let client = PathshalaClient::with_api(
            TenantResolver::default(),
            FakeApi::new(),
            Arc::new(MemoryStorage::new()),
        );
        assert!(client.resolve("localhost:5173").is_none());
        assert!(client.bootstrap("localhost").slug().is_none());
    }

    #[tokio::test]
    async fn from_config_uses_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"access_token":"tok"}"#).unwrap();

        let mut config = PathshalaConfig::default();
        config.storage.path = Some(path);
        let client = PathshalaClient::from_config(&config).unwrap();

        assert_eq!(
            client.storage().get(keys::ACCESS_TOKEN).unwrap().as_deref(),
            Some("tok")
        );
    }
}
