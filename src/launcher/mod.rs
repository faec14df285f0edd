//! # Job Launcher
//!
//! Turns a job plus supplied parameters into a running execution.
//!
//! ## Launch sequence
//!
//! 1. Apply the job's incrementer when the supplied parameters omit its key
//! 2. Run the validator chain (a failure never creates an execution)
//! 3. Ask the repository for a new execution; the running/complete checks
//!    and the insert are one atomic operation
//! 4. Hand the execution to a dedicated tokio worker that runs the flow,
//!    invokes job listeners and persists the final status
//!
//! In synchronous mode `launch` waits for the worker; in asynchronous mode it
//! returns the STARTING snapshot and the final state is read back from the
//! repository.

use crate::config::{BatchConfig, ExecutionConfig};
use crate::constants::events;
use crate::error::{BatchError, Result};
use crate::events::EventPublisher;
use crate::flow::{FlowExecutor, FlowOutcome};
use crate::job::Job;
use crate::logging::{log_error, log_job_operation};
use crate::models::{ExitStatus, JobExecution, JobInstanceKey, JobParameters};
use crate::repository::JobRepository;
use crate::state_machine::{BatchStatus, JobEvent};
use crate::step::StepContext;
use dashmap::DashMap;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub struct JobLauncher {
    repository: Arc<dyn JobRepository>,
    asynchronous: bool,
    limits: ExecutionConfig,
    events: EventPublisher,
    /// Stop flags of executions whose worker is still alive
    running: Arc<DashMap<Uuid, Arc<AtomicBool>>>,
}

impl JobLauncher {
    pub fn new(repository: Arc<dyn JobRepository>) -> Self {
        Self {
            repository,
            asynchronous: false,
            limits: ExecutionConfig::default(),
            events: EventPublisher::default(),
            running: Arc::new(DashMap::new()),
        }
    }

    pub fn from_config(repository: Arc<dyn JobRepository>, config: &BatchConfig) -> Self {
        Self {
            repository,
            asynchronous: config.launcher.asynchronous,
            limits: config.execution.clone(),
            events: EventPublisher::new(config.events.channel_capacity),
            running: Arc::new(DashMap::new()),
        }
    }

    pub fn asynchronous(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
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

    pub fn is_asynchronous(&self) -> bool {
        self.asynchronous
    }

    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    pub fn repository(&self) -> &Arc<dyn JobRepository> {
        &self.repository
    }

    /// Launch `job`. Returns the final execution in synchronous mode and the
    /// STARTING snapshot in asynchronous mode.
    pub async fn launch(&self, job: Arc<Job>, parameters: JobParameters) -> Result<JobExecution> {
        let (snapshot, handle) = self.launch_with_handle(job, parameters).await?;
        if self.asynchronous {
            return Ok(snapshot);
        }
        handle
            .await
            .map_err(|error| BatchError::Internal(format!("job worker did not finish: {error}")))
    }

    /// Launch `job` and return the STARTING snapshot together with the
    /// worker handle resolving to the final execution
    #[instrument(skip(self, job, parameters), fields(job_name = %job.name()))]
    pub async fn launch_with_handle(
        &self,
        job: Arc<Job>,
        parameters: JobParameters,
    ) -> Result<(JobExecution, JoinHandle<JobExecution>)> {
        let parameters = self.prepare_parameters(&job, parameters).await?;

        if let Err(error) = job.validate(&parameters) {
            log_job_operation("launch", None, job.name(), "REJECTED", Some(&error.to_string()));
            return Err(error);
        }

        let execution = self
            .repository
            .create_execution(job.name(), &parameters, job.is_restartable())
            .await
            .inspect_err(|error| {
                log_job_operation("launch", None, job.name(), "REJECTED", Some(&error.to_string()));
            })?;

        let stop_flag = Arc::new(AtomicBool::new(false));
        self.running
            .insert(execution.execution_id, Arc::clone(&stop_flag));

        info!(
            execution_id = %execution.execution_id,
            parameters = %execution.parameters,
            restart_from = ?execution.restart_from,
            "🚀 Launching job"
        );

        let worker = JobWorker {
            job,
            repository: Arc::clone(&self.repository),
            events: self.events.clone(),
            limits: self.limits.clone(),
            running: Arc::clone(&self.running),
            stop_flag,
        };
        let snapshot = execution.clone();
        let handle = tokio::spawn(worker.run(execution));
        Ok((snapshot, handle))
    }

    /// Fill in the incrementer's parameters unless the caller supplied the
    /// discriminating key; supplied values win over incremented ones
    pub async fn prepare_parameters(
        &self,
        job: &Job,
        supplied: JobParameters,
    ) -> Result<JobParameters> {
        match job.incrementer() {
            Some(incrementer) if !supplied.contains_key(incrementer.key()) => {
                let previous = self.repository.last_parameters(job.name()).await?;
                Ok(incrementer.next(previous.as_ref()).merged_with(&supplied))
            }
            _ => Ok(supplied),
        }
    }

    /// Request a stop; the flow observes it at the next node boundary
    pub fn stop(&self, execution_id: Uuid) -> Result<()> {
        let flag = self.running.get(&execution_id).ok_or_else(|| {
            BatchError::StateMachine(format!("job execution {execution_id} is not running"))
        })?;
        flag.store(true, Ordering::Release);
        info!(execution_id = %execution_id, "Stop requested");
        Ok(())
    }

    /// Mark the last FAILED or STOPPED execution of an instance ABANDONED so
    /// that later launches with the same parameters are refused
    pub async fn abandon(&self, job_name: &str, parameters: &JobParameters) -> Result<JobExecution> {
        let key = JobInstanceKey::new(job_name, parameters);
        let mut execution = self
            .repository
            .find_last_execution(&key)
            .await?
            .ok_or_else(|| BatchError::Repository(format!("no execution recorded for {key}")))?;

        execution.transition(JobEvent::Abandon)?;
        self.repository
            .update_status(execution.execution_id, execution.status)
            .await?;

        log_job_operation(
            "abandon",
            Some(execution.execution_id),
            job_name,
            &execution.status.to_string(),
            None,
        );
        Ok(execution)
    }

    pub fn running_executions(&self) -> Vec<Uuid> {
        self.running.iter().map(|entry| *entry.key()).collect()
    }
}

struct JobWorker {
    job: Arc<Job>,
    repository: Arc<dyn JobRepository>,
    events: EventPublisher,
    limits: ExecutionConfig,
    running: Arc<DashMap<Uuid, Arc<AtomicBool>>>,
    stop_flag: Arc<AtomicBool>,
}

impl JobWorker {
    #[instrument(skip_all, fields(job_name = %self.job.name(), execution_id = %execution.execution_id))]
    async fn run(self, mut execution: JobExecution) -> JobExecution {
        let execution_id = execution.execution_id;

        if let Err(error) = execution.transition(JobEvent::Start) {
            log_error("launcher", "start", &error.to_string(), Some(self.job.name()));
        }
        self.persist(&execution).await;
        self.events.publish(
            events::JOB_STARTED,
            json!({
                "job_name": self.job.name(),
                "execution_id": execution_id,
                "restart_from": execution.restart_from,
            }),
        );
        log_job_operation(
            "start",
            Some(execution_id),
            self.job.name(),
            "STARTED",
            execution.restart_from.as_deref(),
        );

        for listener in self.job.listeners() {
            listener.before_job(&execution).await;
        }

        let context = StepContext::new(self.job.name(), execution_id, execution.parameters.clone())
            .with_stop_flag(Arc::clone(&self.stop_flag))
            .with_events(self.events.clone())
            .with_limits(self.limits.clone())
            .with_restart_points(execution.nested_restart_points.clone());
        let (returned, outcome) = self.run_flow(execution, context).await;
        execution = returned;

        let event = match outcome {
            Ok(outcome) => {
                execution.exit_status = outcome.exit_status;
                execution.resume_from = outcome.resume_from;
                match outcome.status {
                    BatchStatus::Completed => JobEvent::Complete,
                    BatchStatus::Stopped => JobEvent::Stop,
                    _ => JobEvent::fail_with_error(outcome.failure_cause.unwrap_or_else(|| {
                        format!("job {} failed", self.job.name())
                    })),
                }
            }
            Err(error) => {
                warn!(error = %error, "Flow aborted");
                execution.exit_status = ExitStatus::failed();
                JobEvent::fail_with_error(error.to_string())
            }
        };
        if let Err(error) = execution.transition(event) {
            log_error("launcher", "finish", &error.to_string(), Some(self.job.name()));
        }

        for listener in self.job.listeners() {
            listener.after_job(&execution).await;
        }
        self.persist(&execution).await;

        let event_name = match execution.status {
            BatchStatus::Completed => events::JOB_COMPLETED,
            BatchStatus::Stopped => events::JOB_STOPPED,
            _ => events::JOB_FAILED,
        };
        self.events.publish(
            event_name,
            json!({
                "job_name": self.job.name(),
                "execution_id": execution_id,
                "status": execution.status,
                "exit_status": execution.exit_status,
                "failure_cause": execution.failure_cause(),
                "resume_from": execution.resume_from,
            }),
        );
        log_job_operation(
            "finish",
            Some(execution_id),
            self.job.name(),
            &execution.status.to_string(),
            execution.failure_cause().as_deref(),
        );

        self.running.remove(&execution_id);
        execution
    }

    /// Run the flow on its own task. A panicking step aborts only that task;
    /// the execution is then rebuilt from what the repository recorded.
    async fn run_flow(
        &self,
        mut execution: JobExecution,
        context: StepContext,
    ) -> (JobExecution, Result<FlowOutcome>) {
        let execution_id = execution.execution_id;
        let snapshot = execution.clone();
        let job = Arc::clone(&self.job);
        let repository = Arc::clone(&self.repository);

        let flow_task = tokio::spawn(async move {
            let restart_from = execution.restart_from.clone();
            let outcome = FlowExecutor::with_repository(repository)
                .execute(job.flow(), restart_from.as_deref(), &mut execution, &context)
                .await;
            (execution, outcome)
        });

        match flow_task.await {
            Ok(finished) => finished,
            Err(join_error) => {
                let recorded = match self.repository.get_execution(execution_id).await {
                    Ok(Some(recorded)) => recorded,
                    _ => snapshot,
                };
                (
                    recorded,
                    Err(BatchError::Internal(format!("flow task aborted: {join_error}"))),
                )
            }
        }
    }

    async fn persist(&self, execution: &JobExecution) {
        if let Err(error) = self.repository.update_execution(execution).await {
            log_error(
                "launcher",
                "update_execution",
                &error.to_string(),
                Some(&execution.execution_id.to_string()),
            );
        }
    }
}
