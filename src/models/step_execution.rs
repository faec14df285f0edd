//! # Step Execution
//!
//! One attempt to run a step inside a job execution. Owned by its
//! `JobExecution`; the flow executor creates it when a node begins and
//! finalizes it when the node finishes.

use super::exit_status::ExitStatus;
use crate::state_machine::BatchStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepExecution {
    pub step_execution_id: Uuid,
    pub job_execution_id: Uuid,
    pub step_name: String,
    pub status: BatchStatus,
    pub exit_status: ExitStatus,
    pub read_count: u64,
    pub write_count: u64,
    pub filter_count: u64,
    pub commit_count: u64,
    pub failure_cause: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Inner step executions when this step runs an embedded flow
    #[serde(default)]
    pub nested: Vec<StepExecution>,
    /// Inner node a restart of the embedded flow resumes at
    #[serde(default)]
    pub resume_from: Option<String>,
}

impl StepExecution {
    pub fn new(step_name: impl Into<String>, job_execution_id: Uuid) -> Self {
        Self {
            step_execution_id: Uuid::new_v4(),
            job_execution_id,
            step_name: step_name.into(),
            status: BatchStatus::Starting,
            exit_status: ExitStatus::unknown(),
            read_count: 0,
            write_count: 0,
            filter_count: 0,
            commit_count: 0,
            failure_cause: None,
            start_time: None,
            end_time: None,
            nested: Vec::new(),
            resume_from: None,
        }
    }

    pub fn mark_started(&mut self) {
        self.status = BatchStatus::Started;
        self.start_time = Some(Utc::now());
    }

    /// Finalize with the given exit status; the coarse status follows it
    pub fn finish(&mut self, exit_status: ExitStatus) {
        self.status = exit_status.terminal_status();
        self.exit_status = exit_status;
        self.end_time = Some(Utc::now());
    }

    pub fn fail(&mut self, cause: impl Into<String>) {
        self.failure_cause = Some(cause.into());
        self.finish(ExitStatus::failed());
    }

    pub fn is_failed(&self) -> bool {
        self.status == BatchStatus::Failed
    }

    pub fn duration_ms(&self) -> Option<i64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_records_cause_and_status() {
        let mut execution = StepExecution::new("load", Uuid::new_v4());
        execution.mark_started();
        execution.fail("writer exploded");

        assert_eq!(execution.status, BatchStatus::Failed);
        assert!(execution.exit_status.is_failed());
        assert_eq!(execution.failure_cause.as_deref(), Some("writer exploded"));
        assert!(execution.duration_ms().is_some());
    }

    #[test]
    fn test_custom_exit_code_completes() {
        let mut execution = StepExecution::new("load", Uuid::new_v4());
        execution.finish(ExitStatus::new("COMPLETED WITH SKIPS"));
        assert_eq!(execution.status, BatchStatus::Completed);
        assert_eq!(execution.exit_status.code(), "COMPLETED WITH SKIPS");
    }
}
