use super::decider::JobExecutionDecider;
use crate::error::Result;
use crate::models::{ExitStatus, JobExecution};
use crate::step::{execute_step, Step, StepContext};
use async_trait::async_trait;
use std::sync::Arc;

/// A node of a flow graph. The executor depends only on this capability:
/// run the node, produce an exit status.
#[async_trait]
pub trait FlowState: Send + Sync {
    fn name(&self) -> &str;

    /// Handle the node. Step executions produced here are appended to
    /// `execution`. An error is fatal for the whole flow.
    async fn handle(&self, execution: &mut JobExecution, context: &StepContext)
        -> Result<ExitStatus>;
}

/// Runs a step and records its execution
pub struct StepState {
    step: Arc<dyn Step>,
}

#[async_trait]
impl FlowState for StepState {
    fn name(&self) -> &str {
        self.step.name()
    }

    async fn handle(
        &self,
        execution: &mut JobExecution,
        context: &StepContext,
    ) -> Result<ExitStatus> {
        let step_execution = execute_step(self.step.as_ref(), context).await;
        let exit_status = step_execution.exit_status.clone();
        execution.step_executions.push(step_execution);
        Ok(exit_status)
    }
}

/// Asks a decider for the routing status
pub struct DecisionState {
    name: String,
    decider: Arc<dyn JobExecutionDecider>,
}

#[async_trait]
impl FlowState for DecisionState {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, execution: &mut JobExecution, _: &StepContext) -> Result<ExitStatus> {
        let view: &JobExecution = execution;
        Ok(self.decider.decide(view, view.last_step_execution()))
    }
}

/// Wrap a step as a flow node
pub fn step(step: Arc<dyn Step>) -> Arc<dyn FlowState> {
    Arc::new(StepState { step })
}

/// Wrap a decider as a named flow node
pub fn decision(name: impl Into<String>, decider: Arc<dyn JobExecutionDecider>) -> Arc<dyn FlowState> {
    Arc::new(DecisionState {
        name: name.into(),
        decider,
    })
}
