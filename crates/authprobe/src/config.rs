//! Harness settings: timeouts, concurrency, redirects and proxying.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct HarnessConfig {
    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,
    /// Number of probes allowed in flight during a suite run.
    pub concurrency: usize,
    pub max_redirects: usize,
    pub user_agent: String,
    /// Explicit proxy applied to every probe.
    pub proxy_url: Option<String>,
    /// Honor `HTTP_PROXY` / `HTTPS_PROXY` from the environment.
    pub system_proxy: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            concurrency: 1,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: format!("authprobe/{}", env!("CARGO_PKG_VERSION")),
            proxy_url: None,
            system_proxy: true,
        }
    }
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from a YAML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `AUTHPROBE_*` environment overrides on top of `self`.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        // A missing .env file is fine.
        let _ = dotenvy::dotenv();

        if let Some(timeout) = env_number("AUTHPROBE_TIMEOUT_SECS")? {
            self.timeout_secs = timeout;
        }
        if let Some(concurrency) = env_number("AUTHPROBE_CONCURRENCY")? {
            self.concurrency = concurrency;
        }
        if let Some(redirects) = env_number("AUTHPROBE_MAX_REDIRECTS")? {
            self.max_redirects = redirects;
        }
        if let Ok(proxy) = env::var("AUTHPROBE_PROXY_URL")
            && !proxy.trim().is_empty()
        {
            self.proxy_url = Some(proxy);
        }

        self.validate()?;
        Ok(self)
    }

    /// Loads defaults plus environment overrides.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Sets the per-probe timeout. Timeouts are kept in whole seconds, so a
    /// fractional duration rounds up: 1500 ms becomes 2 s and 1 ms becomes 1 s.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout
            .as_secs()
            .saturating_add(u64::from(timeout.subsec_nanos() > 0));
        self
    }

    /// Sets the number of concurrent probes.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets whether environment proxy variables are honored.
    pub fn with_system_proxy(mut self, enabled: bool) -> Self {
        self.system_proxy = enabled;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Rejects settings that would hang or never run a probe.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                setting: "timeout_secs",
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidSetting {
                setting: "concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn env_number<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidSetting {
                setting: key,
                reason: format!("not a number: {raw}"),
            }),
        Err(_) => Ok(None),
    }
}
