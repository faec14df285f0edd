//! # Job Execution
//!
//! One attempt to run a `JobInstance`. Status changes go through
//! `JobStateMachine`; once a terminal status is reached the execution is
//! frozen and only an `Abandon` event may still move it.

use super::exit_status::ExitStatus;
use super::job_instance::{JobInstance, JobInstanceKey};
use super::job_parameters::JobParameters;
use super::step_execution::StepExecution;
use crate::state_machine::{BatchStatus, JobEvent, JobStateMachine, StateMachineResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobExecution {
    pub execution_id: Uuid,
    pub instance_id: Uuid,
    pub job_name: String,
    pub parameters: JobParameters,
    pub status: BatchStatus,
    pub exit_status: ExitStatus,
    pub created_at: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub step_executions: Vec<StepExecution>,
    pub failure_causes: Vec<String>,
    /// Node a relaunch of this instance resumes at (set on STOPPED/FAILED)
    pub resume_from: Option<String>,
    /// Node this execution was told to start at, when it is a restart
    pub restart_from: Option<String>,
    /// Inner resume nodes of embedded flows keyed by flow step name,
    /// carried over from the execution being restarted
    #[serde(default)]
    pub nested_restart_points: HashMap<String, String>,
}

impl JobExecution {
    pub fn new(instance: &JobInstance) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            instance_id: instance.instance_id,
            job_name: instance.job_name.clone(),
            parameters: instance.parameters.clone(),
            status: BatchStatus::Starting,
            exit_status: ExitStatus::unknown(),
            created_at: Utc::now(),
            start_time: None,
            end_time: None,
            step_executions: Vec::new(),
            failure_causes: Vec::new(),
            resume_from: None,
            restart_from: None,
            nested_restart_points: HashMap::new(),
        }
    }

    /// Working record for a flow embedded in a step of execution
    /// `execution_id`; collects the inner step executions
    pub fn for_nested_flow(
        execution_id: Uuid,
        job_name: impl Into<String>,
        parameters: JobParameters,
    ) -> Self {
        Self {
            execution_id,
            instance_id: Uuid::nil(),
            job_name: job_name.into(),
            parameters,
            status: BatchStatus::Started,
            exit_status: ExitStatus::unknown(),
            created_at: Utc::now(),
            start_time: Some(Utc::now()),
            end_time: None,
            step_executions: Vec::new(),
            failure_causes: Vec::new(),
            resume_from: None,
            restart_from: None,
            nested_restart_points: HashMap::new(),
        }
    }

    pub fn instance_key(&self) -> JobInstanceKey {
        JobInstanceKey::new(self.job_name.clone(), &self.parameters)
    }

    /// Apply a lifecycle event through the job state machine
    pub fn transition(&mut self, event: JobEvent) -> StateMachineResult<BatchStatus> {
        JobStateMachine::transition(self, event)
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    pub fn last_step_execution(&self) -> Option<&StepExecution> {
        self.step_executions.last()
    }

    pub fn step_execution(&self, step_name: &str) -> Option<&StepExecution> {
        self.step_executions
            .iter()
            .rev()
            .find(|step| step.step_name == step_name)
    }

    /// Embedded flows that ended short of completion, mapped to the inner
    /// node each one resumes at
    pub fn nested_resume_points(&self) -> HashMap<String, String> {
        fn collect(steps: &[StepExecution], points: &mut HashMap<String, String>) {
            for step in steps {
                if let Some(node) = &step.resume_from {
                    points.insert(step.step_name.clone(), node.clone());
                }
                collect(&step.nested, points);
            }
        }
        let mut points = HashMap::new();
        collect(&self.step_executions, &mut points);
        points
    }

    /// Human-readable failure cause, joined when several were recorded
    pub fn failure_cause(&self) -> Option<String> {
        if self.failure_causes.is_empty() {
            None
        } else {
            Some(self.failure_causes.join("; "))
        }
    }

    pub fn total_read_count(&self) -> u64 {
        self.step_executions.iter().map(|s| s.read_count).sum()
    }

    pub fn total_write_count(&self) -> u64 {
        self.step_executions.iter().map(|s| s.write_count).sum()
    }
}
