//! Configuration for the Pathshala client.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Backend API used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://vk-services.shop/api/v1";

/// Client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathshalaConfig {
    pub api: ApiConfig,
    pub tenant: TenantConfig,
    pub storage: StorageConfig,
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to.
    pub base_url: String,

    /// Per-request timeout.
    #[serde(with = "humantime_duration")]
    pub request_timeout: Duration,

    /// Overrides the transport's default User-Agent.
    pub user_agent: Option<String>,

    /// Permit `http://` base URLs. Local backends only.
    pub allow_insecure_http: bool,

    /// Trust the OS certificate store instead of the bundled roots.
    pub native_roots: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            request_timeout: Duration::from_secs(15),
            user_agent: None,
            allow_insecure_http: false,
            native_roots: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TenantConfig {
    /// Host that never maps to a tenant (local development).
    pub local_host: String,
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            local_host: "localhost".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// JSON file holding tokens and the cached subdomain.
    /// In-memory storage is used when unset.
    pub path: Option<PathBuf>,
}

/// `Duration` as a humantime string ("15s", "1m 30s").
pub(crate) mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
