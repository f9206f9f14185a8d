//! # Configuration
//!
//! Runtime settings for the workflow engine. Values come from, in increasing priority:
//! built-in defaults, an optional TOML/YAML/JSON file, and `CASETRACK__SECTION__KEY`
//! environment variables.
//!
//! ```rust,no_run
//! use casetrack_core::config::CaseTrackConfig;
//!
//! # fn main() -> casetrack_core::Result<()> {
//! let config = CaseTrackConfig::load(Some(std::path::Path::new("config/casetrack.toml")))?;
//! let mode = config.write.mode();
//! # Ok(())
//! # }
//! ```

use crate::constants::system::{
    DEFAULT_EVENT_CHANNEL_CAPACITY, DEFAULT_MAX_CONFLICT_RETRIES, DEFAULT_NOTICE_HISTORY,
};
use crate::error::{CaseTrackError, Result};
use crate::store::WriteMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "CASETRACK";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseTrackConfig {
    pub write: WriteConfig,
    pub audit: AuditConfig,
    pub events: EventConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// Tag write strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteConfig {
    /// Use versioned writes with retry instead of last-write-wins
    pub compare_and_swap: bool,
    pub max_conflict_retries: u32,
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            compare_and_swap: false,
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }
}

impl WriteConfig {
    pub fn mode(&self) -> WriteMode {
        if self.compare_and_swap {
            WriteMode::CompareAndSwap {
                max_retries: self.max_conflict_retries,
            }
        } else {
            WriteMode::LastWriteWins
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Write an audit entry for each case touched by a batch reset
    pub record_batch_resets: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            record_batch_resets: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub channel_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Number of update notices retained
    pub notice_history: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            notice_history: DEFAULT_NOTICE_HISTORY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive; environment-based default when unset
    pub level: Option<String>,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl CaseTrackConfig {
    /// Load from an optional file plus environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.events.channel_capacity == 0 {
            return Err(CaseTrackError::Configuration(
                "events.channel_capacity must be greater than zero".to_string(),
            ));
        }
        if self.sync.notice_history == 0 {
            return Err(CaseTrackError::Configuration(
                "sync.notice_history must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reproduce_last_write_wins() {
        let config = CaseTrackConfig::default();
        assert_eq!(config.write.mode(), WriteMode::LastWriteWins);
        assert!(config.audit.record_batch_resets);
        assert_eq!(config.events.channel_capacity, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_compare_and_swap_mode() {
        let write = WriteConfig {
            compare_and_swap: true,
            max_conflict_retries: 5,
        };
        assert_eq!(write.mode(), WriteMode::CompareAndSwap { max_retries: 5 });
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let mut config = CaseTrackConfig::default();
        config.events.channel_capacity = 0;
        assert!(matches!(config.validate(), Err(CaseTrackError::Configuration(_))));
    }
}
