//! Client configuration.

use std::time::Duration;

use tracing::warn;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for talking to the Nexus backend.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL every relative path is resolved against. Always ends in `/`.
    pub base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Config for `base_url` with the default timeout.
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: normalize_base(Url::parse(base_url)?),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                  | Default                 |
    /// |---------------------------|-------------------------|
    /// | `NEXUS_API_URL`           | `http://localhost:8000` |
    /// | `NEXUS_HTTP_TIMEOUT_SECS` | `30`                    |
    pub fn from_env() -> Self {
        let base_url = std::env::var("NEXUS_API_URL")
            .ok()
            .and_then(|raw| match Url::parse(&raw) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(value = %raw, error = %e, "ignoring invalid NEXUS_API_URL");
                    None
                }
            })
            .unwrap_or_else(default_base_url);

        let timeout_secs = std::env::var("NEXUS_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Some(secs),
                _ => {
                    warn!(value = %raw, "ignoring invalid NEXUS_HTTP_TIMEOUT_SECS");
                    None
                }
            })
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            base_url: normalize_base(base_url),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: normalize_base(default_base_url()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_API_URL).expect("default API URL is valid")
}

/// Ensure the path ends with `/` so that joins keep any path prefix.
fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
