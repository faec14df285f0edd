//! # Batch Data Model
//!
//! Identity and execution records: parameters, instances, job and step
//! executions, and the exit status codes used for flow routing.

pub mod exit_status;
pub mod job_execution;
pub mod job_instance;
pub mod job_parameters;
pub mod step_execution;

// Re-export core models for easy access
pub use exit_status::ExitStatus;
pub use job_execution::JobExecution;
pub use job_instance::{JobInstance, JobInstanceKey};
pub use job_parameters::{JobParameter, JobParameters, JobParametersBuilder};
pub use step_execution::StepExecution;
