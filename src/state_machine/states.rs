use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse status of a job or step execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    /// Execution record created, flow not yet entered
    Starting,
    /// Flow graph is executing
    Started,
    /// Finished successfully
    Completed,
    /// Finished with an unrecovered error
    Failed,
    /// Halted by a stop transition or a stop request
    Stopped,
    /// Operator gave up on a failed or stopped execution
    Abandoned,
}

impl BatchStatus {
    /// Check if this is a terminal state (status is frozen)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Stopped | Self::Abandoned
        )
    }

    /// Check if an execution in this state counts as running
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Starting | Self::Started)
    }

    /// Check if an instance whose last execution ended here may be relaunched
    pub fn is_restartable(&self) -> bool {
        matches!(self, Self::Failed | Self::Stopped)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "STARTING"),
            Self::Started => write!(f, "STARTED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Stopped => write!(f, "STOPPED"),
            Self::Abandoned => write!(f, "ABANDONED"),
        }
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STARTING" => Ok(Self::Starting),
            "STARTED" => Ok(Self::Started),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "STOPPED" => Ok(Self::Stopped),
            "ABANDONED" => Ok(Self::Abandoned),
            _ => Err(format!("Invalid batch status: {s}")),
        }
    }
}

/// Default status for new executions
impl Default for BatchStatus {
    fn default() -> Self {
        Self::Starting
    }
}

/// Per-node state while a flow graph runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeState {
    Pending,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl NodeState {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }
}

impl Default for NodeState {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Stopped => write!(f, "STOPPED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_status_terminal_check() {
        assert!(BatchStatus::Completed.is_terminal());
        assert!(BatchStatus::Failed.is_terminal());
        assert!(BatchStatus::Stopped.is_terminal());
        assert!(BatchStatus::Abandoned.is_terminal());
        assert!(!BatchStatus::Starting.is_terminal());
        assert!(!BatchStatus::Started.is_terminal());
    }

    #[test]
    fn test_running_and_restartable() {
        assert!(BatchStatus::Starting.is_running());
        assert!(BatchStatus::Started.is_running());
        assert!(!BatchStatus::Completed.is_running());

        assert!(BatchStatus::Failed.is_restartable());
        assert!(BatchStatus::Stopped.is_restartable());
        assert!(!BatchStatus::Completed.is_restartable());
        assert!(!BatchStatus::Abandoned.is_restartable());
    }

    #[test]
    fn test_state_string_conversion() {
        assert_eq!(BatchStatus::Started.to_string(), "STARTED");
        assert_eq!(
            "COMPLETED".parse::<BatchStatus>().unwrap(),
            BatchStatus::Completed
        );
        assert!("complete".parse::<BatchStatus>().is_err());
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&BatchStatus::Stopped).unwrap();
        assert_eq!(json, "\"STOPPED\"");

        let parsed: NodeState = serde_json::from_str("\"RUNNING\"").unwrap();
        assert_eq!(parsed, NodeState::Running);
    }
}
