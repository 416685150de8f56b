use std::time::Duration;

/// `User-Agent` sent when the caller does not configure one.
pub const DEFAULT_USER_AGENT: &str = concat!("pathshala-http/", env!("CARGO_PKG_VERSION"));

/// Response bodies larger than this are refused.
pub const DEFAULT_BODY_LIMIT: usize = 4 * 1024 * 1024;

/// Where trusted root certificates come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsRootConfig {
    /// Bundled Mozilla roots, identical on every host.
    #[default]
    WebPki,
    /// The operating system certificate store.
    Native,
}

/// URL schemes the transport accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportSecurity {
    /// `https://` only.
    #[default]
    TlsOnly,
    /// `http://` as well. Local backends and mock servers.
    AllowInsecureHttp,
}

impl TransportSecurity {
    #[must_use]
    pub fn allows_http(self) -> bool {
        self == Self::AllowInsecureHttp
    }
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub request_timeout: Duration,
    pub body_limit: usize,
    pub user_agent: String,
    pub security: TransportSecurity,
    pub roots: TlsRootConfig,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            body_limit: DEFAULT_BODY_LIMIT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            security: TransportSecurity::TlsOnly,
            roots: TlsRootConfig::WebPki,
        }
    }
}
