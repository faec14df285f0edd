//! A flow embedded as a single step.
//!
//! The outer graph sees one step whose exit status is the inner flow's
//! aggregate status. Inner step executions are kept under
//! `StepExecution::nested` and their counts are summed onto the outer step.
//! When the inner flow fails or stops, the inner node it would resume at is
//! kept on the outer step execution so a restart continues inside the flow.

use super::{Step, StepContext, StepExecutionListener};
use crate::error::Result;
use crate::flow::{Flow, FlowExecutor};
use crate::models::{JobExecution, StepExecution};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct FlowStep {
    name: String,
    flow: Arc<Flow>,
    listeners: Vec<Arc<dyn StepExecutionListener>>,
}

impl FlowStep {
    pub fn new(name: impl Into<String>, flow: Arc<Flow>) -> Self {
        Self {
            name: name.into(),
            flow,
            listeners: Vec::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn StepExecutionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }
}

#[async_trait]
impl Step for FlowStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, execution: &mut StepExecution, context: &StepContext) -> Result<()> {
        let mut inner = JobExecution::for_nested_flow(
            execution.job_execution_id,
            context.job_name(),
            context.parameters().clone(),
        );
        let start_at = context.take_restart_point(&self.name);
        if let Some(node) = &start_at {
            debug!(step = %self.name, node = %node, "Resuming embedded flow");
        }
        let outcome = FlowExecutor::new()
            .execute(&self.flow, start_at.as_deref(), &mut inner, context)
            .await?;

        debug!(
            step = %self.name,
            flow = %self.flow.name(),
            status = %outcome.status,
            exit_status = %outcome.exit_status,
            "Embedded flow finished"
        );

        for nested in &inner.step_executions {
            execution.read_count += nested.read_count;
            execution.write_count += nested.write_count;
            execution.filter_count += nested.filter_count;
            execution.commit_count += nested.commit_count;
        }
        execution.nested = inner.step_executions;
        execution.exit_status = outcome.exit_status;
        execution.failure_cause = outcome.failure_cause;
        execution.resume_from = outcome.resume_from;
        Ok(())
    }

    fn listeners(&self) -> &[Arc<dyn StepExecutionListener>] {
        &self.listeners
    }
}
