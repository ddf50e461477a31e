//! Client configuration.
//!
//! # Design
//! `ClientConfig` is validated once, at construction, and never changes
//! afterwards. Host and primary key are mandatory; everything else has a
//! default. It can also be deserialized from an application's own config
//! file, going through the same validation.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed API base path appended to every host.
pub const API_BASE_PATH: &str = "/api/v1";

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawClientConfig")]
pub struct ClientConfig {
    host: String,
    api_key: String,
    api_secret: Option<String>,
    timeout: Duration,
    tls: bool,
}

impl ClientConfig {
    /// `host` is a bare domain such as `example.talentlms.com`, optionally
    /// with a port. A trailing slash is stripped.
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let host = host.into();
        let host = host.trim().trim_end_matches('/');
        let api_key = api_key.into();

        if host.is_empty() {
            return Err(Error::Configuration("host is empty".to_string()));
        }
        if host.contains("://") || host.contains('/') {
            return Err(Error::Configuration(format!(
                "host must be a bare domain, got {host:?}"
            )));
        }
        if api_key.trim().is_empty() {
            return Err(Error::Configuration("api key is empty".to_string()));
        }

        Ok(Self {
            host: host.to_string(),
            api_key,
            api_secret: None,
            timeout: DEFAULT_TIMEOUT,
            tls: true,
        })
    }

    /// Secondary key, sent only to operations that require it. An empty
    /// secret is treated as absent.
    pub fn with_api_secret(mut self, api_secret: impl Into<String>) -> Self {
        let api_secret = api_secret.into();
        self.api_secret = (!api_secret.is_empty()).then_some(api_secret);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `false` switches the scheme to plain `http`, for local test servers.
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_secret(&self) -> Option<&str> {
        self.api_secret.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn tls(&self) -> bool {
        self.tls
    }

    /// `https://{host}/api/v1`, without a trailing slash.
    pub fn base_url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{scheme}://{}{API_BASE_PATH}", self.host)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("api_key", &"<redacted>")
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("tls", &self.tls)
            .finish()
    }
}

#[derive(Deserialize)]
struct RawClientConfig {
    host: String,
    api_key: String,
    #[serde(default)]
    api_secret: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default = "default_tls")]
    tls: bool,
}

fn default_tls() -> bool {
    true
}

impl TryFrom<RawClientConfig> for ClientConfig {
    type Error = Error;

    fn try_from(raw: RawClientConfig) -> Result<Self> {
        let mut config = ClientConfig::new(raw.host, raw.api_key)?.with_tls(raw.tls);
        if let Some(secret) = raw.api_secret {
            config = config.with_api_secret(secret);
        }
        if let Some(secs) = raw.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}
