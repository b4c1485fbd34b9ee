//! Strongly-typed configuration for the uibot driver.
//!
//! Values can be constructed from defaults, loaded from environment
//! variables (with optional `.env` support), or merged with explicit
//! overrides. All wait and retry budgets used by the session sequencer live
//! here so scenarios share one tuning surface.

use std::env;
use std::num::ParseIntError;
use std::time::Duration;

use dotenvy::dotenv;
use serde::de::{Deserialize, Deserializer, Error as DeError};
use serde::ser::{Serialize, Serializer};
use serde::{Deserialize as DeriveDeserialize, Serialize as DeriveSerialize};
use thiserror::Error;

/// Default address of the remote UI-automation agent.
pub const DEFAULT_AGENT_URL: &str = "http://localhost:8082";

/// Default file name for component-hierarchy dumps.
pub const DEFAULT_HIERARCHY_DUMP_FILE: &str = "componentHierarchy.html";

/// Verbosity level for uibot logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Minimal,
    Medium,
    Detailed,
}

impl Verbosity {
    pub fn as_u8(self) -> u8 {
        match self {
            Verbosity::Minimal => 0,
            Verbosity::Medium => 1,
            Verbosity::Detailed => 2,
        }
    }

    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Verbosity::Minimal),
            1 => Some(Verbosity::Medium),
            2 => Some(Verbosity::Detailed),
            _ => None,
        }
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Medium
    }
}

impl Serialize for Verbosity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Verbosity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Verbosity::from_u8(value).ok_or_else(|| {
            DeError::custom(format!(
                "invalid verbosity value {value}; expected 0, 1, or 2"
            ))
        })
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {name} is not a valid integer: {source}")]
    InvalidNumber {
        name: &'static str,
        #[source]
        source: ParseIntError,
    },
    #[error("environment variable {name} has invalid value {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Configuration values for a uibot session.
#[derive(Debug, Clone, DeriveSerialize, DeriveDeserialize)]
#[serde(default)]
pub struct UiBotConfig {
    /// host:port base URL of the remote UI-automation agent.
    #[serde(alias = "agentUrl")]
    pub agent_url: String,
    pub verbose: Verbosity,
    /// Budget for resolving an element or waiting on its state.
    #[serde(alias = "findTimeoutMs")]
    pub find_timeout_ms: u64,
    #[serde(alias = "pollIntervalMs")]
    pub poll_interval_ms: u64,
    /// Budget for the agent itself to come up at suite start.
    #[serde(alias = "startupTimeoutMs")]
    pub startup_timeout_ms: u64,
    #[serde(alias = "startupPollIntervalMs")]
    pub startup_poll_interval_ms: u64,
    /// Retry budget for corrective UI actions.
    #[serde(alias = "actionAttempts")]
    pub action_attempts: u32,
    #[serde(alias = "actionRetryDelayMs")]
    pub action_retry_delay_ms: u64,
    /// Pause after confirming a project import, giving the application time
    /// to tear down the chooser dialog and start loading.
    #[serde(alias = "importSettleMs")]
    pub import_settle_ms: u64,
    /// Destination file for component-hierarchy dumps written to disk.
    #[serde(alias = "hierarchyDumpFile")]
    pub hierarchy_dump_file: String,
}

impl Default for UiBotConfig {
    fn default() -> Self {
        let agent_url =
            env::var("UIBOT_AGENT_URL").unwrap_or_else(|_| DEFAULT_AGENT_URL.to_string());
        UiBotConfig {
            agent_url,
            verbose: Verbosity::default(),
            find_timeout_ms: 10_000,
            poll_interval_ms: 1_000,
            startup_timeout_ms: 240_000,
            startup_poll_interval_ms: 5_000,
            action_attempts: 3,
            action_retry_delay_ms: 1_000,
            import_settle_ms: 5_000,
            hierarchy_dump_file: DEFAULT_HIERARCHY_DUMP_FILE.to_string(),
        }
    }
}

impl UiBotConfig {
    /// Load configuration from the environment, reading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv();

        let mut config = UiBotConfig::default();
        if let Some(verbose) = read_u64("UIBOT_VERBOSE")? {
            config.verbose = u8::try_from(verbose)
                .ok()
                .and_then(Verbosity::from_u8)
                .ok_or_else(|| ConfigError::InvalidValue {
                    name: "UIBOT_VERBOSE",
                    value: verbose.to_string(),
                })?;
        }
        if let Some(value) = read_u64("UIBOT_FIND_TIMEOUT_MS")? {
            config.find_timeout_ms = value;
        }
        if let Some(value) = read_u64("UIBOT_POLL_INTERVAL_MS")? {
            config.poll_interval_ms = value;
        }
        if let Some(value) = read_u64("UIBOT_STARTUP_TIMEOUT_MS")? {
            config.startup_timeout_ms = value;
        }
        if let Some(value) = read_u64("UIBOT_STARTUP_POLL_INTERVAL_MS")? {
            config.startup_poll_interval_ms = value;
        }
        if let Some(value) = read_u64("UIBOT_ACTION_ATTEMPTS")? {
            config.action_attempts =
                u32::try_from(value).map_err(|_| ConfigError::InvalidValue {
                    name: "UIBOT_ACTION_ATTEMPTS",
                    value: value.to_string(),
                })?;
        }
        if let Some(value) = read_u64("UIBOT_ACTION_RETRY_DELAY_MS")? {
            config.action_retry_delay_ms = value;
        }
        if let Some(value) = read_u64("UIBOT_IMPORT_SETTLE_MS")? {
            config.import_settle_ms = value;
        }
        if let Ok(path) = env::var("UIBOT_HIERARCHY_DUMP_FILE") {
            if !path.trim().is_empty() {
                config.hierarchy_dump_file = path;
            }
        }
        Ok(config)
    }

    /// Apply explicit overrides on top of this configuration.
    pub fn with_overrides(mut self, overrides: UiBotConfigOverrides) -> Self {
        if let Some(agent_url) = overrides.agent_url {
            self.agent_url = agent_url;
        }
        if let Some(verbose) = overrides.verbose {
            self.verbose = verbose;
        }
        if let Some(value) = overrides.find_timeout_ms {
            self.find_timeout_ms = value;
        }
        if let Some(value) = overrides.poll_interval_ms {
            self.poll_interval_ms = value;
        }
        if let Some(value) = overrides.startup_timeout_ms {
            self.startup_timeout_ms = value;
        }
        if let Some(value) = overrides.startup_poll_interval_ms {
            self.startup_poll_interval_ms = value;
        }
        if let Some(value) = overrides.action_attempts {
            self.action_attempts = value;
        }
        if let Some(value) = overrides.action_retry_delay_ms {
            self.action_retry_delay_ms = value;
        }
        if let Some(value) = overrides.import_settle_ms {
            self.import_settle_ms = value;
        }
        if let Some(value) = overrides.hierarchy_dump_file {
            self.hierarchy_dump_file = value;
        }
        self
    }

    pub fn find_timeout(&self) -> Duration {
        Duration::from_millis(self.find_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn startup_poll_interval(&self) -> Duration {
        Duration::from_millis(self.startup_poll_interval_ms)
    }

    pub fn action_retry_delay(&self) -> Duration {
        Duration::from_millis(self.action_retry_delay_ms)
    }

    pub fn import_settle(&self) -> Duration {
        Duration::from_millis(self.import_settle_ms)
    }
}

/// Optional field-by-field overrides for [`UiBotConfig`].
#[derive(Debug, Clone, Default, DeriveSerialize, DeriveDeserialize)]
#[serde(default)]
pub struct UiBotConfigOverrides {
    #[serde(alias = "agentUrl")]
    pub agent_url: Option<String>,
    pub verbose: Option<Verbosity>,
    #[serde(alias = "findTimeoutMs")]
    pub find_timeout_ms: Option<u64>,
    #[serde(alias = "pollIntervalMs")]
    pub poll_interval_ms: Option<u64>,
    #[serde(alias = "startupTimeoutMs")]
    pub startup_timeout_ms: Option<u64>,
    #[serde(alias = "startupPollIntervalMs")]
    pub startup_poll_interval_ms: Option<u64>,
    #[serde(alias = "actionAttempts")]
    pub action_attempts: Option<u32>,
    #[serde(alias = "actionRetryDelayMs")]
    pub action_retry_delay_ms: Option<u64>,
    #[serde(alias = "importSettleMs")]
    pub import_settle_ms: Option<u64>,
    #[serde(alias = "hierarchyDumpFile")]
    pub hierarchy_dump_file: Option<String>,
}

fn read_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|source| ConfigError::InvalidNumber { name, source }),
        _ => Ok(None),
    }
}
