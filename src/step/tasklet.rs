//! Tasklet steps: a single action invoked until it reports `Finished`.

use super::{RepeatStatus, Step, StepContext, StepExecutionListener};
use crate::error::{BatchError, Result};
use crate::models::{ExitStatus, StepExecution};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Counters and exit status a tasklet accumulates over its invocations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepContribution {
    pub read_count: u64,
    pub write_count: u64,
    pub filter_count: u64,
    exit_status: Option<ExitStatus>,
}

impl StepContribution {
    pub fn increment_read_count(&mut self, count: u64) {
        self.read_count += count;
    }

    pub fn increment_write_count(&mut self, count: u64) {
        self.write_count += count;
    }

    pub fn increment_filter_count(&mut self, count: u64) {
        self.filter_count += count;
    }

    /// Route on a custom code instead of `COMPLETED`
    pub fn set_exit_status(&mut self, exit_status: impl Into<ExitStatus>) {
        self.exit_status = Some(exit_status.into());
    }

    pub fn exit_status(&self) -> Option<&ExitStatus> {
        self.exit_status.as_ref()
    }

    fn apply_to(&self, execution: &mut StepExecution) {
        execution.read_count += self.read_count;
        execution.write_count += self.write_count;
        execution.filter_count += self.filter_count;
        if let Some(exit_status) = &self.exit_status {
            execution.exit_status = exit_status.clone();
        }
    }
}

#[async_trait]
pub trait Tasklet: Send + Sync {
    async fn execute(
        &self,
        contribution: &mut StepContribution,
        context: &StepContext,
    ) -> Result<RepeatStatus>;
}

/// Adapter turning a synchronous closure into a [`Tasklet`]
pub struct FnTasklet<F> {
    body: F,
}

impl<F> FnTasklet<F>
where
    F: Fn(&mut StepContribution, &StepContext) -> Result<RepeatStatus> + Send + Sync,
{
    pub fn new(body: F) -> Self {
        Self { body }
    }
}

#[async_trait]
impl<F> Tasklet for FnTasklet<F>
where
    F: Fn(&mut StepContribution, &StepContext) -> Result<RepeatStatus> + Send + Sync,
{
    async fn execute(
        &self,
        contribution: &mut StepContribution,
        context: &StepContext,
    ) -> Result<RepeatStatus> {
        (self.body)(contribution, context)
    }
}

pub struct TaskletStep {
    name: String,
    tasklet: Arc<dyn Tasklet>,
    listeners: Vec<Arc<dyn StepExecutionListener>>,
}

impl TaskletStep {
    pub fn new(name: impl Into<String>, tasklet: Arc<dyn Tasklet>) -> Self {
        Self {
            name: name.into(),
            tasklet,
            listeners: Vec::new(),
        }
    }

    /// Shorthand for a closure-backed tasklet step
    pub fn from_fn<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut StepContribution, &StepContext) -> Result<RepeatStatus> + Send + Sync + 'static,
    {
        Self::new(name, Arc::new(FnTasklet::new(body)))
    }

    pub fn with_listener(mut self, listener: Arc<dyn StepExecutionListener>) -> Self {
        self.listeners.push(listener);
        self
    }
}

impl fmt::Debug for TaskletStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskletStep")
            .field("name", &self.name)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[async_trait]
impl Step for TaskletStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, execution: &mut StepExecution, context: &StepContext) -> Result<()> {
        let max_iterations = context.limits().tasklet_max_iterations;
        let mut contribution = StepContribution::default();
        let mut iterations = 0u64;

        let outcome = loop {
            iterations += 1;
            match self.tasklet.execute(&mut contribution, context).await {
                Ok(RepeatStatus::Finished) => break Ok(()),
                Ok(RepeatStatus::Continuable) if iterations >= max_iterations => {
                    break Err(BatchError::step_failure(
                        &self.name,
                        format!("tasklet still continuable after {max_iterations} iterations"),
                    ))
                }
                Ok(RepeatStatus::Continuable) => continue,
                Err(error) => break Err(error),
            }
        };

        debug!(step = %self.name, iterations, "Tasklet finished invoking");
        contribution.apply_to(execution);
        outcome
    }

    fn listeners(&self) -> &[Arc<dyn StepExecutionListener>] {
        &self.listeners
    }
}
