//! # Steps
//!
//! A step is the unit of work inside a flow. Three kinds ship with the crate:
//!
//! - [`TaskletStep`]: repeatedly invokes a [`Tasklet`] until it reports
//!   [`RepeatStatus::Finished`]
//! - [`ChunkStep`]: read → process → write cycles bounded by a
//!   [`CompletionPolicy`]
//! - [`FlowStep`]: runs an embedded flow and reports its aggregate status as a
//!   single step
//!
//! Every step produces exactly one `ExitStatus`. [`execute_step`] wraps a step
//! run: it creates the `StepExecution`, maps an error to `FAILED` with the
//! error as failure cause, defaults a silent success to `COMPLETED` and lets
//! step listeners override the final code.

pub mod chunk;
pub mod completion_policy;
pub mod flow_step;
pub mod item;
pub mod listener;
pub mod tasklet;

pub use chunk::ChunkStep;
pub use completion_policy::{
    CompletionPolicy, CompositeCompletionPolicy, RandomChunkSizePolicy, RepeatContext,
    SimpleCompletionPolicy, TimeoutTerminationPolicy,
};
pub use flow_step::FlowStep;
pub use item::{
    FnItemWriter, ItemProcessor, ItemReader, ItemWriter, ListItemReader, PassThroughItemProcessor,
    ReaderFactory, WriterFactory,
};
pub use listener::StepExecutionListener;
pub use tasklet::{FnTasklet, StepContribution, Tasklet, TaskletStep};

use crate::config::ExecutionConfig;
use crate::constants::events;
use crate::error::Result;
use crate::events::EventPublisher;
use crate::logging::log_step_operation;
use crate::models::{ExitStatus, JobParameters, StepExecution};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Result of one tasklet invocation, or of one item read for completion
/// policies (`Finished` = end of input)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatStatus {
    Continuable,
    Finished,
}

impl RepeatStatus {
    pub fn is_continuable(&self) -> bool {
        matches!(self, Self::Continuable)
    }
}

/// Execution-scoped values bound at launch time and handed to every step,
/// tasklet and reader/writer factory.
#[derive(Debug, Clone)]
pub struct StepContext {
    job_name: String,
    execution_id: Uuid,
    parameters: Arc<JobParameters>,
    execution_context: Arc<Mutex<HashMap<String, Value>>>,
    /// Inner resume nodes of embedded flows, consumed on first use
    restart_points: Arc<Mutex<HashMap<String, String>>>,
    stop_requested: Arc<AtomicBool>,
    events: EventPublisher,
    limits: ExecutionConfig,
}

impl StepContext {
    pub fn new(job_name: impl Into<String>, execution_id: Uuid, parameters: JobParameters) -> Self {
        Self {
            job_name: job_name.into(),
            execution_id,
            parameters: Arc::new(parameters),
            execution_context: Arc::new(Mutex::new(HashMap::new())),
            restart_points: Arc::new(Mutex::new(HashMap::new())),
            stop_requested: Arc::new(AtomicBool::new(false)),
            events: EventPublisher::default(),
            limits: ExecutionConfig::default(),
        }
    }

    pub fn with_stop_flag(mut self, stop_requested: Arc<AtomicBool>) -> Self {
        self.stop_requested = stop_requested;
        self
    }

    pub fn with_restart_points(self, points: HashMap<String, String>) -> Self {
        *self.restart_points.lock() = points;
        self
    }

    pub fn with_events(mut self, events: EventPublisher) -> Self {
        self.events = events;
        self
    }

    pub fn with_limits(mut self, limits: ExecutionConfig) -> Self {
        self.limits = limits;
        self
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    pub fn parameters(&self) -> &JobParameters {
        &self.parameters
    }

    /// Store a value shared by all steps of this execution
    pub fn put(&self, key: impl Into<String>, value: Value) {
        self.execution_context.lock().insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.execution_context.lock().get(key).cloned()
    }

    /// Inner node the embedded flow `step_name` resumes at. Only the first
    /// run of that step in this execution resumes.
    pub fn take_restart_point(&self, step_name: &str) -> Option<String> {
        self.restart_points.lock().remove(step_name)
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    pub fn limits(&self) -> &ExecutionConfig {
        &self.limits
    }
}

/// Unit of work inside a flow
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    /// Run the step, accumulating counts on `execution`. A step may set a
    /// custom `exit_status`; returning an error fails the step.
    async fn execute(&self, execution: &mut StepExecution, context: &StepContext) -> Result<()>;

    fn listeners(&self) -> &[Arc<dyn StepExecutionListener>] {
        &[]
    }
}

/// Run `step` inside a fresh `StepExecution` and finalize it
#[instrument(skip(step, context), fields(step = %step.name(), execution_id = %context.execution_id()))]
pub async fn execute_step(step: &dyn Step, context: &StepContext) -> StepExecution {
    let mut execution = StepExecution::new(step.name(), context.execution_id());
    execution.mark_started();

    for listener in step.listeners() {
        listener.before_step(&execution).await;
    }

    match step.execute(&mut execution, context).await {
        Ok(()) => {
            let exit_status = if execution.exit_status == ExitStatus::unknown() {
                ExitStatus::completed()
            } else {
                execution.exit_status.clone()
            };
            execution.finish(exit_status);
        }
        Err(error) => execution.fail(error.to_string()),
    }

    for listener in step.listeners() {
        if let Some(exit_status) = listener.after_step(&execution).await {
            debug!(exit_status = %exit_status, "Step listener replaced exit status");
            execution.finish(exit_status);
        }
    }

    let event = if execution.is_failed() {
        events::STEP_FAILED
    } else {
        events::STEP_COMPLETED
    };
    context.events().publish(
        event,
        json!({
            "job_name": context.job_name(),
            "execution_id": context.execution_id(),
            "step_name": execution.step_name,
            "exit_status": execution.exit_status,
            "read_count": execution.read_count,
            "write_count": execution.write_count,
        }),
    );
    log_step_operation(
        "execute",
        context.execution_id(),
        &execution.step_name,
        execution.exit_status.code(),
        execution.failure_cause.as_deref(),
    );

    execution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BatchError;
    use crate::state_machine::BatchStatus;

    struct FixedStep {
        outcome: Option<&'static str>,
        fail: bool,
    }

    #[async_trait]
    impl Step for FixedStep {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn execute(&self, execution: &mut StepExecution, _: &StepContext) -> Result<()> {
            if self.fail {
                return Err(BatchError::step_failure("fixed", "boom"));
            }
            if let Some(code) = self.outcome {
                execution.exit_status = ExitStatus::new(code);
            }
            Ok(())
        }
    }

    fn context() -> StepContext {
        StepContext::new("job", Uuid::new_v4(), JobParameters::new())
    }

    #[tokio::test]
    async fn test_silent_success_is_completed() {
        let step = FixedStep { outcome: None, fail: false };
        let execution = execute_step(&step, &context()).await;
        assert_eq!(execution.exit_status, ExitStatus::completed());
        assert_eq!(execution.status, BatchStatus::Completed);
    }

    #[tokio::test]
    async fn test_custom_code_is_kept() {
        let step = FixedStep { outcome: Some("COMPLETED WITH SKIPS"), fail: false };
        let execution = execute_step(&step, &context()).await;
        assert_eq!(execution.exit_status.code(), "COMPLETED WITH SKIPS");
    }

    #[tokio::test]
    async fn test_error_becomes_failed_with_cause() {
        let step = FixedStep { outcome: None, fail: true };
        let execution = execute_step(&step, &context()).await;
        assert!(execution.exit_status.is_failed());
        assert_eq!(execution.failure_cause.as_deref(), Some("Step fixed failed: boom"));
    }

    #[test]
    fn test_context_values_are_shared_between_clones() {
        let context = context();
        let clone = context.clone();
        context.put("count", json!(3));
        assert_eq!(clone.get("count"), Some(json!(3)));
    }
}
