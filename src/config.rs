//! Runtime configuration for the upload pipeline.
//!
//! Every setting has a default matching the backend's documented behavior and
//! can be tuned through `INTUNEWIN_*` environment variables.

use std::time::Duration;

use crate::error::ConfigError;
use crate::upload::PollSettings;

const MIB: usize = 1024 * 1024;

/// Default block size (100 MiB)
pub const DEFAULT_BLOCK_SIZE: usize = 100 * MIB;

/// Largest block blob storage accepts in one block (4000 MiB)
pub const MAX_BLOCK_SIZE: usize = 4000 * MIB;

/// Default base URL of the management API
pub const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/beta";

/// Settings for one upload session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Maximum bytes per block
    pub block_size: usize,

    /// Delay between content file refreshes while waiting on a state
    pub poll_interval: Duration,

    /// Wall-clock limit for each state wait
    pub poll_timeout: Duration,

    /// How often the storage URI is renewed while blocks are in flight
    pub renewal_interval: Duration,

    /// Blocks transferred at the same time
    pub max_concurrent_blocks: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            poll_interval: Duration::from_secs(5),
            poll_timeout: Duration::from_secs(60),
            renewal_interval: Duration::from_secs(12 * 60),
            max_concurrent_blocks: 8,
        }
    }
}

impl UploadConfig {
    /// Parse a numeric environment variable, clamped to `max`.
    ///
    /// Unset or unparsable values fall back to `default`.
    fn parse_env(var_name: &str, default: u64, max: u64) -> u64 {
        std::env::var(var_name)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(|v| v.min(max))
            .unwrap_or(default)
    }

    /// Create config from environment variables with fallback to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let block_mib = Self::parse_env(
            "INTUNEWIN_BLOCK_SIZE_MIB",
            (defaults.block_size / MIB) as u64,
            (MAX_BLOCK_SIZE / MIB) as u64,
        );
        Self {
            block_size: block_mib as usize * MIB,
            poll_interval: Duration::from_secs(Self::parse_env(
                "INTUNEWIN_POLL_INTERVAL_SECS",
                defaults.poll_interval.as_secs(),
                300,
            )),
            poll_timeout: Duration::from_secs(Self::parse_env(
                "INTUNEWIN_POLL_TIMEOUT_SECS",
                defaults.poll_timeout.as_secs(),
                3600,
            )),
            renewal_interval: Duration::from_secs(Self::parse_env(
                "INTUNEWIN_RENEWAL_INTERVAL_SECS",
                defaults.renewal_interval.as_secs(),
                3600,
            )),
            max_concurrent_blocks: Self::parse_env(
                "INTUNEWIN_MAX_CONCURRENT_BLOCKS",
                defaults.max_concurrent_blocks as u64,
                64,
            ) as usize,
        }
    }

    /// Validate settings are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::Invalid {
                setting: "block_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.block_size > MAX_BLOCK_SIZE {
            return Err(ConfigError::Invalid {
                setting: "block_size",
                reason: format!(
                    "{} bytes exceeds the storage maximum of {MAX_BLOCK_SIZE}",
                    self.block_size
                ),
            });
        }
        for (setting, value) in [
            ("poll_interval", self.poll_interval),
            ("poll_timeout", self.poll_timeout),
            ("renewal_interval", self.renewal_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Invalid {
                    setting,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        if self.max_concurrent_blocks == 0 {
            return Err(ConfigError::Invalid {
                setting: "max_concurrent_blocks",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Interval and timeout for state waits
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: self.poll_interval,
            timeout: self.poll_timeout,
        }
    }
}

/// Connection settings for the management API and blob storage
#[derive(Clone)]
pub struct GraphConfig {
    /// API base URL without trailing slash
    pub base_url: String,

    /// Bearer token; acquiring it is the caller's job
    pub token: String,

    /// Timeout for management API requests
    pub request_timeout: Duration,

    /// Timeout for a single block or block-list request
    pub transfer_timeout: Duration,
}

impl std::fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("transfer_timeout", &self.transfer_timeout)
            .finish()
    }
}

impl GraphConfig {
    /// Config for `base_url` with default timeouts.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            request_timeout: Duration::from_secs(60),
            transfer_timeout: Duration::from_secs(10 * 60),
        }
    }

    /// Read `INTUNEWIN_GRAPH_URL` and `INTUNEWIN_GRAPH_TOKEN`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = std::env::var("INTUNEWIN_GRAPH_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing {
                setting: "INTUNEWIN_GRAPH_TOKEN",
            })?;
        let base_url = std::env::var("INTUNEWIN_GRAPH_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GRAPH_URL.to_string());

        let config = Self::new(base_url, token);
        config.validate()?;
        Ok(config)
    }

    /// Validate the base URL parses
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.base_url).map_err(|e| ConfigError::Invalid {
            setting: "base_url",
            reason: e.to_string(),
        })?;
        if self.request_timeout.is_zero() || self.transfer_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                setting: "timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
