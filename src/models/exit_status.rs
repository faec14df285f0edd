//! # Exit Status
//!
//! String outcome code produced by every flow node. Transitions are keyed on
//! this code rather than on the coarse `BatchStatus`, so business logic can
//! return custom codes (for example `"COMPLETED WITH SKIPS"`) and route on them.

use crate::state_machine::BatchStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const COMPLETED: &str = "COMPLETED";
pub const FAILED: &str = "FAILED";
pub const STOPPED: &str = "STOPPED";
pub const UNKNOWN: &str = "UNKNOWN";

/// Wildcard pattern matching any exit status
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExitStatus(String);

impl ExitStatus {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn completed() -> Self {
        Self::new(COMPLETED)
    }

    pub fn failed() -> Self {
        Self::new(FAILED)
    }

    pub fn stopped() -> Self {
        Self::new(STOPPED)
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN)
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn is_completed(&self) -> bool {
        self.0 == COMPLETED
    }

    pub fn is_failed(&self) -> bool {
        self.0 == FAILED
    }

    pub fn is_stopped(&self) -> bool {
        self.0 == STOPPED
    }

    /// Coarse status a graph ends with when this code reaches an implicit end
    pub fn terminal_status(&self) -> BatchStatus {
        if self.is_failed() {
            BatchStatus::Failed
        } else if self.is_stopped() {
            BatchStatus::Stopped
        } else {
            BatchStatus::Completed
        }
    }
}

impl Default for ExitStatus {
    fn default() -> Self {
        Self::unknown()
    }
}

impl From<BatchStatus> for ExitStatus {
    fn from(status: BatchStatus) -> Self {
        match status {
            BatchStatus::Completed => Self::completed(),
            BatchStatus::Failed => Self::failed(),
            BatchStatus::Stopped => Self::stopped(),
            BatchStatus::Starting | BatchStatus::Started | BatchStatus::Abandoned => {
                Self::unknown()
            }
        }
    }
}

impl From<&str> for ExitStatus {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_status_mapping() {
        assert_eq!(ExitStatus::completed().terminal_status(), BatchStatus::Completed);
        assert_eq!(ExitStatus::failed().terminal_status(), BatchStatus::Failed);
        assert_eq!(ExitStatus::stopped().terminal_status(), BatchStatus::Stopped);
        assert_eq!(
            ExitStatus::new("COMPLETED WITH SKIPS").terminal_status(),
            BatchStatus::Completed
        );
    }

    #[test]
    fn test_from_batch_status() {
        assert_eq!(ExitStatus::from(BatchStatus::Failed), ExitStatus::failed());
        assert_eq!(ExitStatus::from(BatchStatus::Started), ExitStatus::unknown());
    }

    #[test]
    fn test_serde_is_plain_string() {
        let json = serde_json::to_string(&ExitStatus::new("CUSTOM")).unwrap();
        assert_eq!(json, "\"CUSTOM\"");
    }
}
