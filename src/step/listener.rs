use crate::models::{ExitStatus, StepExecution};
use async_trait::async_trait;

/// Hooks around a single step run.
///
/// `after_step` may return a replacement exit status, which is how business
/// logic assigns a custom code to a chunk or tasklet step.
#[async_trait]
pub trait StepExecutionListener: Send + Sync {
    async fn before_step(&self, _execution: &StepExecution) {}

    async fn after_step(&self, _execution: &StepExecution) -> Option<ExitStatus> {
        None
    }
}
