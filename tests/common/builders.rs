//! Job and step fixtures shared by the integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tasker_batch::flow::{step, FlowState};
use tasker_batch::job::RunIdIncrementer;
use tasker_batch::step::{RepeatStatus, StepContext, StepContribution, Tasklet, TaskletStep};
use tasker_batch::{BatchError, Flow, InMemoryJobRepository, Job, JobLauncher, Result};
use tokio::sync::Notify;

/// Names of the steps that ran, in order
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog(Arc<Mutex<Vec<String>>>);

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str) {
        self.0.lock().push(name.to_string());
    }

    pub fn names(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Step that records itself and finishes with COMPLETED
pub fn recording(name: &str, log: &ExecutionLog) -> Arc<dyn FlowState> {
    let log = log.clone();
    let owned = name.to_string();
    step(Arc::new(TaskletStep::from_fn(name, move |_, _| {
        log.record(&owned);
        Ok(RepeatStatus::Finished)
    })))
}

/// Step that records itself and fails with `reason`
pub fn failing(name: &str, reason: &str, log: &ExecutionLog) -> Arc<dyn FlowState> {
    let log = log.clone();
    let owned = name.to_string();
    let reason = reason.to_string();
    step(Arc::new(TaskletStep::from_fn(name, move |_, _| {
        log.record(&owned);
        Err(BatchError::step_failure(owned.clone(), reason.clone()))
    })))
}

/// Step that records itself and finishes with a custom exit code
pub fn exiting_with(name: &str, code: &str, log: &ExecutionLog) -> Arc<dyn FlowState> {
    let log = log.clone();
    let owned = name.to_string();
    let code = code.to_string();
    step(Arc::new(TaskletStep::from_fn(name, move |contribution, _| {
        log.record(&owned);
        contribution.set_exit_status(code.as_str());
        Ok(RepeatStatus::Finished)
    })))
}

/// Tasklet that sleeps on the tokio clock
#[derive(Debug, Clone)]
pub struct SleepingTasklet {
    pub duration: Duration,
}

#[async_trait]
impl Tasklet for SleepingTasklet {
    async fn execute(
        &self,
        _contribution: &mut StepContribution,
        _context: &StepContext,
    ) -> Result<RepeatStatus> {
        tokio::time::sleep(self.duration).await;
        Ok(RepeatStatus::Finished)
    }
}

pub fn sleeping(name: &str, duration: Duration) -> Arc<dyn FlowState> {
    step(Arc::new(TaskletStep::new(
        name,
        Arc::new(SleepingTasklet { duration }),
    )))
}

/// Tasklet that signals `started` and then blocks until `release` fires
#[derive(Debug, Clone, Default)]
pub struct Gate {
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[async_trait]
impl Tasklet for Gate {
    async fn execute(
        &self,
        _contribution: &mut StepContribution,
        _context: &StepContext,
    ) -> Result<RepeatStatus> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(RepeatStatus::Finished)
    }
}

pub fn gated(name: &str, gate: &Gate) -> Arc<dyn FlowState> {
    step(Arc::new(TaskletStep::new(name, Arc::new(gate.clone()))))
}

pub fn job(name: &str, flow: Flow) -> Arc<Job> {
    Arc::new(Job::builder(name).flow(flow).build().unwrap())
}

/// Job whose every launch gets a fresh `run.id`
pub fn repeatable_job(name: &str, flow: Flow) -> Arc<Job> {
    Arc::new(
        Job::builder(name)
            .flow(flow)
            .incrementer(Arc::new(RunIdIncrementer::new()))
            .build()
            .unwrap(),
    )
}

pub fn launcher() -> (Arc<InMemoryJobRepository>, JobLauncher) {
    let repository = Arc::new(InMemoryJobRepository::new());
    let launcher = JobLauncher::new(repository.clone());
    (repository, launcher)
}
