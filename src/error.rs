//! Error types for the batch engine.
//!
//! `BatchError` is the crate-wide error. The parameter contract and the
//! launch-time uniqueness check have their own enums so callers can match on
//! the exact rejection reason without string inspection.

use crate::config::ConfigurationError;
use crate::state_machine::StateMachineError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BatchError {
    #[error("Validation error: {0}")]
    Validation(#[from] ParameterValidationError),
    #[error("Duplicate instance: {0}")]
    DuplicateInstance(#[from] DuplicateInstanceError),
    #[error("Step {step} failed: {reason}")]
    StepFailure { step: String, reason: String },
    #[error("Writer failed in step {step}: {reason}")]
    WriterFailure { step: String, reason: String },
    #[error("Flow configuration error: {0}")]
    FlowConfiguration(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Repository error: {0}")]
    Repository(String),
    #[error("Scheduler error: {0}")]
    Scheduler(String),
    #[error("State machine error: {0}")]
    StateMachine(String),
    #[error("Timeout error: {0}")]
    Timeout(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BatchError {
    /// Convenience constructor used by tasklets and item collaborators
    pub fn step_failure(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StepFailure {
            step: step.into(),
            reason: reason.into(),
        }
    }

    /// True for the errors that are rejected before any execution exists
    pub fn is_launch_rejection(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::DuplicateInstance(_))
    }
}

/// Reasons a parameter set is refused by a validator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterValidationError {
    #[error("The JobParameters do not contain required keys: {0:?}")]
    MissingKeys(Vec<String>),
    #[error("The JobParameters contain keys that are not explicitly optional or required: {0:?}")]
    UnrecognizedKeys(Vec<String>),
    #[error("Parameter {key} is invalid: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Reasons a launch is refused because of the instance identity rule
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DuplicateInstanceError {
    #[error("A job execution for job {job_name} with parameters [{parameters}] is already running")]
    ConcurrentExecution { job_name: String, parameters: String },
    #[error("A job instance already exists and is complete for job {job_name} with parameters [{parameters}]")]
    AlreadyComplete { job_name: String, parameters: String },
    #[error("Job {job_name} is not restartable and an instance with parameters [{parameters}] already ran")]
    NotRestartable { job_name: String, parameters: String },
}

impl From<StateMachineError> for BatchError {
    fn from(error: StateMachineError) -> Self {
        BatchError::StateMachine(error.to_string())
    }
}

impl From<ConfigurationError> for BatchError {
    fn from(error: ConfigurationError) -> Self {
        BatchError::Configuration(error.to_string())
    }
}

impl From<serde_json::Error> for BatchError {
    fn from(error: serde_json::Error) -> Self {
        BatchError::Internal(format!("JSON serialization error: {error}"))
    }
}

pub type Result<T> = std::result::Result<T, BatchError>;
