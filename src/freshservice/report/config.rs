use std::fmt;
use std::time::Duration;

use crate::freshservice::report::error::{ReportError, Result};
use crate::freshservice::report::throttle::ThrottlePolicy;

/// Type field holding the operating system on computer assets.
pub const DEFAULT_OS_FIELD: &str = "os_23001176139";
/// Type field holding the primary IP address on computer assets.
pub const DEFAULT_IP_FIELD: &str = "computer_ip_address_23001176139";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// API key used as the basic-auth username. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

/// Connection settings for the asset service, built once at startup and
/// handed to the HTTP source.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    base_url: String,
    api_key: ApiKey,
    pub throttle: ThrottlePolicy,
    pub timeout: Duration,
    pub os_field: String,
    pub ip_field: String,
}

impl ServiceConfig {
    /// Builds a configuration for `https://{domain}.freshservice.com/api/v2/`.
    pub fn for_domain(domain: &str, api_key: ApiKey) -> Result<Self> {
        let domain = domain.trim();
        if domain.is_empty() || domain.contains('/') {
            return Err(ReportError::Config(format!(
                "invalid service domain '{domain}'"
            )));
        }
        Self::with_base_url(&format!("https://{domain}.freshservice.com/api/v2/"), api_key)
    }

    /// Builds a configuration against an explicit API root.
    pub fn with_base_url(base_url: &str, api_key: ApiKey) -> Result<Self> {
        let base_url = base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ReportError::Config(format!(
                "base URL must start with http:// or https://, got '{base_url}'"
            )));
        }
        if api_key.expose().trim().is_empty() {
            return Err(ReportError::Config("API key must not be empty".into()));
        }

        Ok(Self {
            base_url: format!("{}/", base_url.trim_end_matches('/')),
            api_key,
            throttle: ThrottlePolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            os_field: DEFAULT_OS_FIELD.to_string(),
            ip_field: DEFAULT_IP_FIELD.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    /// Joins a relative endpoint path onto the API root.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }
}
