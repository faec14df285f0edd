//! Fixed-interval trigger definition.
//!
//! A trigger fires once immediately and then `repeat_count` more times, one
//! interval apart. `repeat_count == 0` means the trigger repeats until the
//! scheduler shuts down.

use crate::config::{ConfigResult, ConfigurationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// What to do with a tick that arrives while the previous fire still runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Drop the tick and log a warning
    #[default]
    Skip,
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    pub interval_seconds: u64,
    /// Repeats after the initial fire; 0 = unbounded
    pub repeat_count: u64,
    pub overlap_policy: OverlapPolicy,
}

impl TriggerConfig {
    pub fn new(interval_seconds: u64, repeat_count: u64) -> Self {
        Self {
            interval_seconds,
            repeat_count,
            overlap_policy: OverlapPolicy::Skip,
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.interval_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "interval_seconds",
                self.interval_seconds,
                "trigger interval must be at least one second",
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// Total ticks the trigger produces, `None` when unbounded
    pub fn total_ticks(&self) -> Option<u64> {
        if self.repeat_count == 0 {
            None
        } else {
            Some(self.repeat_count + 1)
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.repeat_count == 0
    }
}
