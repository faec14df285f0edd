use serde::{Deserialize, Serialize};

/// Events that can trigger job execution status transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum JobEvent {
    /// Flow graph entered
    Start,
    /// Flow graph reached a successful terminal node
    Complete,
    /// Flow graph failed with a cause
    Fail(String),
    /// Stop transition taken or stop request observed
    Stop,
    /// Give up on a failed or stopped execution
    Abandon,
}

impl JobEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Fail(_) => "fail",
            Self::Stop => "stop",
            Self::Abandon => "abandon",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }

    /// Create a failure event with the given error message
    pub fn fail_with_error(error: impl Into<String>) -> Self {
        Self::Fail(error.into())
    }
}
