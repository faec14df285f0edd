//! # Job Repository
//!
//! Persistence seam for instances and executions. The launcher relies on
//! [`JobRepository::create_execution`] being atomic: the running check, the
//! restartability check and the insert happen under one lock, so a manual
//! launch racing a scheduler fire cannot both succeed.

pub mod in_memory;

pub use in_memory::InMemoryJobRepository;

use crate::error::Result;
use crate::models::{JobExecution, JobInstanceKey, JobParameters, StepExecution};
use crate::state_machine::BatchStatus;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Resolve (or create) the instance for `job_name` + `parameters` and
    /// persist a new STARTING execution for it.
    ///
    /// Rejected with a `DuplicateInstanceError` when an execution of the
    /// instance is running, when the instance already completed, or when the
    /// job is not restartable and the instance has already run. A restart
    /// carries the previous execution's resume node in `restart_from`.
    async fn create_execution(
        &self,
        job_name: &str,
        parameters: &JobParameters,
        restartable: bool,
    ) -> Result<JobExecution>;

    /// Replace the stored snapshot of `execution`
    async fn update_execution(&self, execution: &JobExecution) -> Result<()>;

    async fn update_status(&self, execution_id: Uuid, status: BatchStatus) -> Result<()>;

    /// Upsert a finished step execution onto its job execution
    async fn record_step_execution(
        &self,
        execution_id: Uuid,
        step_execution: &StepExecution,
    ) -> Result<()>;

    async fn is_running(&self, key: &JobInstanceKey) -> Result<bool>;

    /// Parameters of the most recently created instance of `job_name`
    async fn last_parameters(&self, job_name: &str) -> Result<Option<JobParameters>>;

    async fn find_last_execution(&self, key: &JobInstanceKey) -> Result<Option<JobExecution>>;

    async fn get_execution(&self, execution_id: Uuid) -> Result<Option<JobExecution>>;
}
