use super::trigger::TriggerConfig;
use crate::config::{ScheduledTriggerConfig, SchedulerConfig};
use crate::constants::events;
use crate::error::{BatchError, Result};
use crate::job::Job;
use crate::launcher::JobLauncher;
use crate::models::JobParameters;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Counters for one job + trigger schedule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleStats {
    pub ticks: u64,
    pub dispatched: u64,
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct ScheduleState {
    /// Set while a fire of this schedule is executing
    running: AtomicBool,
    ticks: AtomicU64,
    dispatched: AtomicU64,
    skipped: AtomicU64,
    finished: AtomicBool,
    finished_notify: Notify,
}

impl ScheduleState {
    fn stats(&self) -> ScheduleStats {
        ScheduleStats {
            ticks: self.ticks.load(Ordering::Acquire),
            dispatched: self.dispatched.load(Ordering::Acquire),
            skipped: self.skipped.load(Ordering::Acquire),
        }
    }

    fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
        self.finished_notify.notify_waiters();
    }
}

/// Handle to one registered schedule
#[derive(Debug, Clone)]
pub struct ScheduleHandle {
    job_name: String,
    trigger_name: String,
    state: Arc<ScheduleState>,
}

impl ScheduleHandle {
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn trigger_name(&self) -> &str {
        &self.trigger_name
    }

    pub fn stats(&self) -> ScheduleStats {
        self.state.stats()
    }

    pub fn is_finished(&self) -> bool {
        self.state.finished.load(Ordering::Acquire)
    }

    /// Resolves once the trigger has run out (or the scheduler shut down)
    /// and its last fire has finished. Never resolves for an unbounded
    /// trigger until shutdown.
    pub async fn wait(&self) {
        loop {
            let notified = self.state.finished_notify.notified();
            if self.is_finished() {
                return;
            }
            notified.await;
        }
    }
}

pub struct JobScheduler {
    launcher: Arc<JobLauncher>,
    registrations: DashMap<(String, String), Arc<ScheduleState>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_timeout: Duration,
}

impl JobScheduler {
    pub fn new(launcher: Arc<JobLauncher>) -> Self {
        Self::from_config(launcher, &SchedulerConfig::default())
    }

    pub fn from_config(launcher: Arc<JobLauncher>, config: &SchedulerConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            launcher,
            registrations: DashMap::new(),
            tasks: Mutex::new(Vec::new()),
            shutdown_tx,
            shutdown_timeout: config.shutdown_timeout(),
        }
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn launcher(&self) -> &Arc<JobLauncher> {
        &self.launcher
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Register a trigger for `job`. The first fire happens immediately.
    ///
    /// Every fire launches `job` with `parameters`; jobs meant to fire more
    /// than once need an incrementer so each fire is a new instance.
    pub fn schedule(
        &self,
        job: Arc<Job>,
        trigger_name: impl Into<String>,
        trigger: TriggerConfig,
        parameters: JobParameters,
    ) -> Result<ScheduleHandle> {
        if self.is_shutting_down() {
            return Err(BatchError::Scheduler(
                "scheduler is shutting down; no new triggers accepted".to_string(),
            ));
        }
        trigger.validate()?;

        let trigger_name = trigger_name.into();
        let key = (job.name().to_string(), trigger_name.clone());
        let state = Arc::new(ScheduleState::default());
        match self.registrations.entry(key) {
            Entry::Occupied(_) => {
                return Err(BatchError::Scheduler(format!(
                    "job '{}' is already scheduled with trigger '{trigger_name}'",
                    job.name()
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&state));
            }
        }

        info!(
            job_name = %job.name(),
            trigger = %trigger_name,
            interval_seconds = trigger.interval_seconds,
            repeat_count = trigger.repeat_count,
            overlap_policy = %trigger.overlap_policy,
            "⏰ Trigger scheduled"
        );

        let handle = ScheduleHandle {
            job_name: job.name().to_string(),
            trigger_name: trigger_name.clone(),
            state: Arc::clone(&state),
        };
        let trigger_loop = TriggerLoop {
            launcher: Arc::clone(&self.launcher),
            job,
            trigger_name,
            trigger,
            parameters,
            state,
            shutdown: self.shutdown_tx.subscribe(),
        };
        self.tasks.lock().push(tokio::spawn(trigger_loop.run()));
        Ok(handle)
    }

    /// Register every configured trigger against the named jobs
    pub fn schedule_all(
        &self,
        jobs: &HashMap<String, Arc<Job>>,
        triggers: &[ScheduledTriggerConfig],
    ) -> Result<Vec<ScheduleHandle>> {
        triggers
            .iter()
            .map(|configured| {
                let job = jobs.get(&configured.job_name).ok_or_else(|| {
                    BatchError::Configuration(format!(
                        "trigger '{}' names unknown job '{}'",
                        configured.name, configured.job_name
                    ))
                })?;
                let parameters = JobParameters::from_pairs(&configured.parameters)?;
                self.schedule(
                    Arc::clone(job),
                    configured.name.clone(),
                    configured.trigger(),
                    parameters,
                )
            })
            .collect()
    }

    pub fn stats(&self, job_name: &str, trigger_name: &str) -> Option<ScheduleStats> {
        self.registrations
            .get(&(job_name.to_string(), trigger_name.to_string()))
            .map(|state| state.stats())
    }

    pub fn schedule_count(&self) -> usize {
        self.registrations.len()
    }

    /// Stop firing and wait for in-flight executions, bounded by the
    /// configured shutdown timeout
    pub async fn shutdown(&self) -> Result<()> {
        info!(schedules = self.registrations.len(), "🛑 Scheduler shutting down");
        self.shutdown_tx.send_replace(true);

        let tasks = std::mem::take(&mut *self.tasks.lock());
        match tokio::time::timeout(self.shutdown_timeout, join_all(tasks)).await {
            Ok(_) => {
                info!("Scheduler shut down cleanly");
                Ok(())
            }
            Err(_) => Err(BatchError::Timeout(format!(
                "in-flight executions still running after {}s",
                self.shutdown_timeout.as_secs()
            ))),
        }
    }
}

struct TriggerLoop {
    launcher: Arc<JobLauncher>,
    job: Arc<Job>,
    trigger_name: String,
    trigger: TriggerConfig,
    parameters: JobParameters,
    state: Arc<ScheduleState>,
    shutdown: watch::Receiver<bool>,
}

impl TriggerLoop {
    async fn run(mut self) {
        let mut interval = tokio::time::interval(self.trigger.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let total_ticks = self.trigger.total_ticks();
        let mut in_flight: Vec<JoinHandle<()>> = Vec::new();
        let mut ticks = 0u64;

        loop {
            if total_ticks.is_some_and(|total| ticks >= total) || *self.shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                _ = interval.tick() => {}
            }

            ticks += 1;
            self.state.ticks.fetch_add(1, Ordering::AcqRel);
            in_flight.retain(|task| !task.is_finished());

            if self
                .state
                .running
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                self.state.skipped.fetch_add(1, Ordering::AcqRel);
                warn!(
                    job_name = %self.job.name(),
                    trigger = %self.trigger_name,
                    tick = ticks,
                    "Previous fire still running; skipping tick"
                );
                self.publish(events::TRIGGER_SKIPPED, ticks);
                continue;
            }

            self.state.dispatched.fetch_add(1, Ordering::AcqRel);
            debug!(job_name = %self.job.name(), trigger = %self.trigger_name, tick = ticks, "Trigger fired");
            self.publish(events::TRIGGER_FIRED, ticks);
            in_flight.push(tokio::spawn(fire(
                Arc::clone(&self.launcher),
                Arc::clone(&self.job),
                self.parameters.clone(),
                Arc::clone(&self.state),
            )));
        }

        join_all(in_flight).await;
        info!(
            job_name = %self.job.name(),
            trigger = %self.trigger_name,
            ticks = ticks,
            "Trigger finished"
        );
        self.state.mark_finished();
    }

    fn publish(&self, event: &str, tick: u64) {
        self.launcher.events().publish(
            event,
            json!({
                "job_name": self.job.name(),
                "trigger": self.trigger_name,
                "tick": tick,
            }),
        );
    }
}

/// One dispatched fire; clears the schedule's running flag when the
/// execution is over or the launch was rejected
async fn fire(
    launcher: Arc<JobLauncher>,
    job: Arc<Job>,
    parameters: JobParameters,
    state: Arc<ScheduleState>,
) {
    match launcher.launch_with_handle(Arc::clone(&job), parameters).await {
        Ok((execution, handle)) => match handle.await {
            Ok(finished) => debug!(
                execution_id = %execution.execution_id,
                status = %finished.status,
                "Scheduled execution finished"
            ),
            Err(error) => warn!(
                execution_id = %execution.execution_id,
                error = %error,
                "Scheduled execution worker did not finish"
            ),
        },
        Err(error) => warn!(job_name = %job.name(), error = %error, "Scheduled launch rejected"),
    }
    state.running.store(false, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{step, FlowBuilder};
    use crate::job::RunIdIncrementer;
    use crate::repository::InMemoryJobRepository;
    use crate::step::{RepeatStatus, TaskletStep};

    fn job(name: &str) -> Arc<Job> {
        let flow = FlowBuilder::new(name)
            .start(step(Arc::new(TaskletStep::from_fn("tick", |_, _| {
                Ok(RepeatStatus::Finished)
            }))))
            .build()
            .unwrap();
        Arc::new(
            Job::builder(name)
                .flow(flow)
                .incrementer(Arc::new(RunIdIncrementer::new()))
                .build()
                .unwrap(),
        )
    }

    fn scheduler() -> JobScheduler {
        let launcher = JobLauncher::new(Arc::new(InMemoryJobRepository::new()));
        JobScheduler::new(Arc::new(launcher))
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_registration_rejected() {
        let scheduler = scheduler();
        let trigger = TriggerConfig::new(5, 1);
        scheduler
            .schedule(job("pollJob"), "poll", trigger, JobParameters::new())
            .unwrap();
        let duplicate = scheduler.schedule(job("pollJob"), "poll", trigger, JobParameters::new());
        assert!(matches!(duplicate, Err(BatchError::Scheduler(_))));

        scheduler
            .schedule(job("pollJob"), "other", trigger, JobParameters::new())
            .unwrap();
        assert_eq!(scheduler.schedule_count(), 2);
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_rejected() {
        let result = scheduler().schedule(
            job("pollJob"),
            "broken",
            TriggerConfig::new(0, 1),
            JobParameters::new(),
        );
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_schedules_after_shutdown() {
        let scheduler = scheduler();
        scheduler.shutdown().await.unwrap();
        let result = scheduler.schedule(
            job("pollJob"),
            "late",
            TriggerConfig::new(5, 1),
            JobParameters::new(),
        );
        assert!(matches!(result, Err(BatchError::Scheduler(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_trigger_finishes() {
        let scheduler = scheduler();
        let handle = scheduler
            .schedule(job("pollJob"), "poll", TriggerConfig::new(5, 2), JobParameters::new())
            .unwrap();
        handle.wait().await;

        assert!(handle.is_finished());
        assert_eq!(
            handle.stats(),
            ScheduleStats {
                ticks: 3,
                dispatched: 3,
                skipped: 0
            }
        );
        assert_eq!(scheduler.stats("pollJob", "poll"), Some(handle.stats()));
        assert_eq!(scheduler.stats("pollJob", "missing"), None);
    }
}
