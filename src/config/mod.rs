//! # Batch Configuration System
//!
//! Layered configuration for the launcher, the execution engine, the event
//! channel and the trigger scheduler.
//!
//! ## Sources (later wins)
//!
//! 1. Compiled defaults (`BatchConfig::default()`)
//! 2. `config/batch.yaml` (optional)
//! 3. `config/batch.<environment>.yaml` (optional)
//! 4. Environment variables prefixed `BATCH__`, nested with `__`
//!    (for example `BATCH__LAUNCHER__ASYNCHRONOUS=true`)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tasker_batch::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let chunk_size = manager.config().execution.default_chunk_size;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::scheduler::trigger::{OverlapPolicy, TriggerConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring batch.yaml
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Job launcher behaviour
    pub launcher: LauncherConfig,

    /// Step and chunk execution limits
    pub execution: ExecutionConfig,

    /// Lifecycle event channel
    pub events: EventsConfig,

    /// Trigger scheduler
    pub scheduler: SchedulerConfig,
}

impl BatchConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.execution.tasklet_max_iterations == 0 {
            return Err(ConfigurationError::invalid_value(
                "execution.tasklet_max_iterations",
                0,
                "must be at least 1",
            ));
        }
        if self.execution.default_chunk_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "execution.default_chunk_size",
                0,
                "must be at least 1",
            ));
        }
        if self.execution.random_chunk_max == 0 {
            return Err(ConfigurationError::invalid_value(
                "execution.random_chunk_max",
                0,
                "must be at least 1",
            ));
        }
        if self.events.channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "events.channel_capacity",
                0,
                "must be at least 1",
            ));
        }
        for trigger in &self.scheduler.triggers {
            if trigger.job_name.trim().is_empty() {
                return Err(ConfigurationError::MissingRequiredField {
                    field: "job_name".to_string(),
                    context: format!("scheduler trigger '{}'", trigger.name),
                });
            }
            trigger.trigger().validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// When true `launch` returns once the execution is dispatched
    pub asynchronous: bool,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self { asynchronous: false }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Upper bound on tasklet invocations returning CONTINUE
    pub tasklet_max_iterations: u64,
    pub default_chunk_size: usize,
    /// Upper bound for randomly sized chunks
    pub random_chunk_max: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            tasklet_max_iterations: 10_000,
            default_chunk_size: 1000,
            random_chunk_max: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub shutdown_timeout_seconds: u64,
    pub triggers: Vec<ScheduledTriggerConfig>,
}

impl SchedulerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_seconds: 30,
            triggers: Vec::new(),
        }
    }
}

/// One configured job + trigger pair
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScheduledTriggerConfig {
    pub job_name: String,
    #[serde(default = "default_trigger_name")]
    pub name: String,
    #[serde(alias = "intervalSeconds", alias = "intervalseconds")]
    pub interval_seconds: u64,
    #[serde(default, alias = "repeatCount", alias = "repeatcount")]
    pub repeat_count: u64,
    #[serde(default, alias = "overlapPolicy", alias = "overlappolicy")]
    pub overlap_policy: OverlapPolicy,
    /// Base launch parameters in `key` / `key(type)` form
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

fn default_trigger_name() -> String {
    "default".to_string()
}

impl ScheduledTriggerConfig {
    pub fn trigger(&self) -> TriggerConfig {
        TriggerConfig {
            interval_seconds: self.interval_seconds,
            repeat_count: self.repeat_count,
            overlap_policy: self.overlap_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = BatchConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.launcher.asynchronous);
        assert_eq!(config.execution.tasklet_max_iterations, 10_000);
        assert_eq!(config.scheduler.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = BatchConfig::default();
        config.scheduler.triggers.push(ScheduledTriggerConfig {
            job_name: "job".to_string(),
            name: "every-five".to_string(),
            interval_seconds: 0,
            repeat_count: 4,
            overlap_policy: OverlapPolicy::Skip,
            parameters: BTreeMap::new(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_trigger_accepts_camel_case_keys() {
        let json = serde_json::json!({
            "job_name": "job",
            "intervalSeconds": 5,
            "repeatCount": 4,
            "overlapPolicy": "skip"
        });
        let trigger: ScheduledTriggerConfig = serde_json::from_value(json).unwrap();
        assert_eq!(trigger.name, "default");
        assert_eq!(trigger.trigger().interval_seconds, 5);
        assert_eq!(trigger.trigger().repeat_count, 4);
    }
}
