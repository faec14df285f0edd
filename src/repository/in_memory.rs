use super::JobRepository;
use crate::error::{BatchError, DuplicateInstanceError, Result};
use crate::models::{JobExecution, JobInstance, JobInstanceKey, JobParameters, StepExecution};
use crate::state_machine::BatchStatus;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct RepositoryState {
    instances: HashMap<JobInstanceKey, JobInstance>,
    executions: HashMap<Uuid, JobExecution>,
    /// Execution ids per instance, oldest first
    by_instance: HashMap<JobInstanceKey, Vec<Uuid>>,
    last_instance_by_job: HashMap<String, JobInstanceKey>,
}

impl RepositoryState {
    fn last_execution(&self, key: &JobInstanceKey) -> Option<&JobExecution> {
        self.by_instance
            .get(key)
            .and_then(|ids| ids.last())
            .and_then(|id| self.executions.get(id))
    }

    fn execution_mut(&mut self, execution_id: Uuid) -> Result<&mut JobExecution> {
        self.executions
            .get_mut(&execution_id)
            .ok_or_else(|| BatchError::Repository(format!("unknown job execution {execution_id}")))
    }
}

/// Process-local repository; all state lives behind a single mutex
#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    state: Mutex<RepositoryState>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance_count(&self) -> usize {
        self.state.lock().instances.len()
    }

    pub fn execution_count(&self) -> usize {
        self.state.lock().executions.len()
    }

    /// All executions of one instance, oldest first
    pub fn executions_for(&self, key: &JobInstanceKey) -> Vec<JobExecution> {
        let state = self.state.lock();
        state
            .by_instance
            .get(key)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.executions.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create_execution(
        &self,
        job_name: &str,
        parameters: &JobParameters,
        restartable: bool,
    ) -> Result<JobExecution> {
        let key = JobInstanceKey::new(job_name, parameters);
        let mut state = self.state.lock();

        let mut restart_from = None;
        let mut nested_restart_points = HashMap::new();
        if let Some(last) = state.last_execution(&key) {
            let job_name = job_name.to_string();
            let parameters = key.parameters_key.clone();
            let rejection = match last.status {
                status if status.is_running() => Some(DuplicateInstanceError::ConcurrentExecution {
                    job_name,
                    parameters,
                }),
                BatchStatus::Completed => Some(DuplicateInstanceError::AlreadyComplete {
                    job_name,
                    parameters,
                }),
                status if !restartable || !status.is_restartable() => {
                    Some(DuplicateInstanceError::NotRestartable {
                        job_name,
                        parameters,
                    })
                }
                _ => None,
            };
            if let Some(rejection) = rejection {
                return Err(rejection.into());
            }
            restart_from = last.resume_from.clone();
            if restart_from.is_some() {
                nested_restart_points = last.nested_resume_points();
            }
        }

        let is_new_instance = !state.instances.contains_key(&key);
        let instance = state
            .instances
            .entry(key.clone())
            .or_insert_with(|| JobInstance::new(job_name, parameters.clone()))
            .clone();
        let mut execution = JobExecution::new(&instance);
        execution.restart_from = restart_from;
        execution.nested_restart_points = nested_restart_points;

        state
            .by_instance
            .entry(key.clone())
            .or_default()
            .push(execution.execution_id);
        // a restart of an older instance must not rewind the incrementer
        if is_new_instance {
            state
                .last_instance_by_job
                .insert(job_name.to_string(), key);
        }
        state
            .executions
            .insert(execution.execution_id, execution.clone());

        debug!(
            execution_id = %execution.execution_id,
            instance_id = %instance.instance_id,
            job_name = %job_name,
            restart_from = ?execution.restart_from,
            "Created job execution"
        );
        Ok(execution)
    }

    async fn update_execution(&self, execution: &JobExecution) -> Result<()> {
        let mut state = self.state.lock();
        let stored = state.execution_mut(execution.execution_id)?;
        *stored = execution.clone();
        Ok(())
    }

    async fn update_status(&self, execution_id: Uuid, status: BatchStatus) -> Result<()> {
        let mut state = self.state.lock();
        state.execution_mut(execution_id)?.status = status;
        Ok(())
    }

    async fn record_step_execution(
        &self,
        execution_id: Uuid,
        step_execution: &StepExecution,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let execution = state.execution_mut(execution_id)?;
        match execution
            .step_executions
            .iter_mut()
            .find(|existing| existing.step_execution_id == step_execution.step_execution_id)
        {
            Some(existing) => *existing = step_execution.clone(),
            None => execution.step_executions.push(step_execution.clone()),
        }
        Ok(())
    }

    async fn is_running(&self, key: &JobInstanceKey) -> Result<bool> {
        let state = self.state.lock();
        Ok(state
            .last_execution(key)
            .is_some_and(JobExecution::is_running))
    }

    async fn last_parameters(&self, job_name: &str) -> Result<Option<JobParameters>> {
        let state = self.state.lock();
        Ok(state
            .last_instance_by_job
            .get(job_name)
            .and_then(|key| state.instances.get(key))
            .map(|instance| instance.parameters.clone()))
    }

    async fn find_last_execution(&self, key: &JobInstanceKey) -> Result<Option<JobExecution>> {
        Ok(self.state.lock().last_execution(key).cloned())
    }

    async fn get_execution(&self, execution_id: Uuid) -> Result<Option<JobExecution>> {
        Ok(self.state.lock().executions.get(&execution_id).cloned())
    }
}
