//! Hostname to tenant slug resolution.

use pathshala_sdk::TenantSlug;

/// Derives the tenant slug from the host the client was reached on.
#[derive(Debug, Clone)]
pub struct TenantResolver {
    local_host: String,
}

impl Default for TenantResolver {
    fn default() -> Self {
        Self::new("localhost")
    }
}

impl TenantResolver {
    #[must_use]
    pub fn new(local_host: impl Into<String>) -> Self {
        Self {
            local_host: local_host.into(),
        }
    }

    /// `sub.domain.tld` resolves to `sub`, `www.domain.tld` to `domain`.
    /// The local development host and single-label hosts have no tenant.
    /// A `:port` suffix is ignored.
    #[must_use]
    pub fn resolve(&self, host: &str) -> Option<TenantSlug> {
        let hostname = strip_port(host.trim()).to_ascii_lowercase();
        if hostname.is_empty() || hostname.eq_ignore_ascii_case(&self.local_host) {
            return None;
        }

        let labels: Vec<&str> = hostname.split('.').collect();
        if labels.len() < 2 {
            return None;
        }

        let slug = if labels[0] == "www" {
            labels[1]
        } else {
            labels[0]
        };
        if slug.is_empty() {
            return None;
        }

        Some(TenantSlug::new(slug))
    }
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}
