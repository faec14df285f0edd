use super::{
    errors::{StateMachineError, StateMachineResult},
    events::JobEvent,
    states::BatchStatus,
};
use crate::models::JobExecution;
use chrono::Utc;
use tracing::debug;

/// Transition table for `JobExecution` status
pub struct JobStateMachine;

impl JobStateMachine {
    /// Apply `event` to `execution`, stamping start/end times and failure causes
    pub fn transition(
        execution: &mut JobExecution,
        event: JobEvent,
    ) -> StateMachineResult<BatchStatus> {
        let current_state = execution.status;
        let target_state = Self::determine_target_state(current_state, &event)?;

        match target_state {
            BatchStatus::Started => execution.start_time = Some(Utc::now()),
            BatchStatus::Completed | BatchStatus::Failed | BatchStatus::Stopped => {
                execution.end_time = Some(Utc::now())
            }
            _ => {}
        }
        if let Some(message) = event.error_message() {
            execution.failure_causes.push(message.to_string());
        }
        execution.status = target_state;

        debug!(
            execution_id = %execution.execution_id,
            job_name = %execution.job_name,
            from = %current_state,
            to = %target_state,
            event = event.event_type(),
            "Job execution transitioned"
        );

        Ok(target_state)
    }

    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: BatchStatus,
        event: &JobEvent,
    ) -> StateMachineResult<BatchStatus> {
        let target = match (current_state, event) {
            (BatchStatus::Starting, JobEvent::Start) => BatchStatus::Started,

            (BatchStatus::Started, JobEvent::Complete) => BatchStatus::Completed,

            (BatchStatus::Starting, JobEvent::Fail(_)) => BatchStatus::Failed,
            (BatchStatus::Started, JobEvent::Fail(_)) => BatchStatus::Failed,

            (BatchStatus::Starting, JobEvent::Stop) => BatchStatus::Stopped,
            (BatchStatus::Started, JobEvent::Stop) => BatchStatus::Stopped,

            (BatchStatus::Failed, JobEvent::Abandon) => BatchStatus::Abandoned,
            (BatchStatus::Stopped, JobEvent::Abandon) => BatchStatus::Abandoned,

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobInstance, JobParameters};

    fn execution() -> JobExecution {
        JobExecution::new(&JobInstance::new("basicJob", JobParameters::new()))
    }

    #[test]
    fn test_state_transitions() {
        assert_eq!(
            JobStateMachine::determine_target_state(BatchStatus::Starting, &JobEvent::Start)
                .unwrap(),
            BatchStatus::Started
        );
        assert_eq!(
            JobStateMachine::determine_target_state(BatchStatus::Started, &JobEvent::Complete)
                .unwrap(),
            BatchStatus::Completed
        );
        assert_eq!(
            JobStateMachine::determine_target_state(
                BatchStatus::Started,
                &JobEvent::Fail("error".to_string())
            )
            .unwrap(),
            BatchStatus::Failed
        );
        assert_eq!(
            JobStateMachine::determine_target_state(BatchStatus::Stopped, &JobEvent::Abandon)
                .unwrap(),
            BatchStatus::Abandoned
        );
    }

    #[test]
    fn test_invalid_transitions() {
        // Completed executions are frozen
        assert!(
            JobStateMachine::determine_target_state(BatchStatus::Completed, &JobEvent::Start)
                .is_err()
        );
        assert!(
            JobStateMachine::determine_target_state(BatchStatus::Completed, &JobEvent::Abandon)
                .is_err()
        );
        // Cannot complete before starting
        assert!(
            JobStateMachine::determine_target_state(BatchStatus::Starting, &JobEvent::Complete)
                .is_err()
        );
    }

    #[test]
    fn test_transition_stamps_times_and_cause() {
        let mut execution = execution();
        execution.transition(JobEvent::Start).unwrap();
        assert!(execution.start_time.is_some());
        assert!(execution.is_running());

        execution
            .transition(JobEvent::fail_with_error("step load failed"))
            .unwrap();
        assert_eq!(execution.status, BatchStatus::Failed);
        assert!(execution.end_time.is_some());
        assert_eq!(execution.failure_cause().as_deref(), Some("step load failed"));
    }
}
