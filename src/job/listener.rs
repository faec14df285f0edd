use crate::models::JobExecution;
use async_trait::async_trait;
use tracing::info;

/// Hooks invoked by the launcher around the flow of every started execution.
/// They run even when the job fails; a rejected launch never reaches them.
#[async_trait]
pub trait JobExecutionListener: Send + Sync {
    async fn before_job(&self, _execution: &JobExecution) {}

    async fn after_job(&self, _execution: &JobExecution) {}
}

/// Logs the start and final status of each execution
#[derive(Debug, Clone, Default)]
pub struct JobLoggerListener;

#[async_trait]
impl JobExecutionListener for JobLoggerListener {
    async fn before_job(&self, execution: &JobExecution) {
        info!(
            execution_id = %execution.execution_id,
            "{} is beginning execution",
            execution.job_name
        );
    }

    async fn after_job(&self, execution: &JobExecution) {
        info!(
            execution_id = %execution.execution_id,
            "{} has completed with the status {}",
            execution.job_name,
            execution.status
        );
    }
}
