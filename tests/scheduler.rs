mod common;

use common::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tasker_batch::config::{SchedulerConfig, ScheduledTriggerConfig};
use tasker_batch::constants::events;
use tasker_batch::flow::FlowBuilder;
use tasker_batch::scheduler::{OverlapPolicy, ScheduleStats};
use tasker_batch::{BatchError, BatchStatus, JobParameters, JobScheduler, TriggerConfig};
use tokio::time::Instant;

fn quick_job(name: &str, log: &ExecutionLog) -> Arc<tasker_batch::Job> {
    let flow = FlowBuilder::new(name)
        .start(recording("tick", log))
        .build()
        .unwrap();
    repeatable_job(name, flow)
}

fn slow_job(name: &str, duration: Duration) -> Arc<tasker_batch::Job> {
    let flow = FlowBuilder::new(name)
        .start(sleeping("work", duration))
        .build()
        .unwrap();
    repeatable_job(name, flow)
}

#[tokio::test(start_paused = true)]
async fn test_trigger_fires_initially_then_repeats() {
    let log = ExecutionLog::new();
    let (repository, launcher) = launcher();
    let scheduler = JobScheduler::new(Arc::new(launcher));
    let started = Instant::now();

    let handle = scheduler
        .schedule(
            quick_job("pollJob", &log),
            "every5s",
            TriggerConfig::new(5, 4),
            JobParameters::new(),
        )
        .unwrap();
    handle.wait().await;

    assert_eq!(
        handle.stats(),
        ScheduleStats {
            ticks: 5,
            dispatched: 5,
            skipped: 0
        }
    );
    assert_eq!(log.names().len(), 5);
    assert_eq!(repository.execution_count(), 5);
    assert_eq!(repository.instance_count(), 5);

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(20), "finished too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(21), "finished too late: {elapsed:?}");
    scheduler.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_ticks_are_skipped() {
    let (repository, launcher) = launcher();
    let launcher = Arc::new(launcher);
    let mut receiver = launcher.events().subscribe();
    let scheduler = JobScheduler::new(Arc::clone(&launcher));

    // fires at 0s and 15s; the ticks at 5s, 10s and 20s find a fire in progress
    let handle = scheduler
        .schedule(
            slow_job("slowJob", Duration::from_secs(12)),
            "every5s",
            TriggerConfig::new(5, 4),
            JobParameters::new(),
        )
        .unwrap();
    handle.wait().await;

    assert_eq!(
        handle.stats(),
        ScheduleStats {
            ticks: 5,
            dispatched: 2,
            skipped: 3
        }
    );
    assert_eq!(repository.execution_count(), 2);

    let mut fired = 0;
    let mut skipped = 0;
    let mut completed = 0;
    while let Ok(event) = receiver.try_recv() {
        match event.name.as_str() {
            events::TRIGGER_FIRED => fired += 1,
            events::TRIGGER_SKIPPED => skipped += 1,
            events::JOB_COMPLETED => completed += 1,
            _ => {}
        }
    }
    assert_eq!((fired, skipped, completed), (2, 3, 2));
    scheduler.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_trigger_runs_until_shutdown() {
    let log = ExecutionLog::new();
    let (_, launcher) = launcher();
    let scheduler = JobScheduler::new(Arc::new(launcher));

    let handle = scheduler
        .schedule(
            quick_job("heartbeatJob", &log),
            "forever",
            TriggerConfig::new(5, 0),
            JobParameters::new(),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_secs(12)).await;
    assert!(!handle.is_finished());
    scheduler.shutdown().await.unwrap();
    handle.wait().await;

    assert_eq!(handle.stats().ticks, 3);
    assert_eq!(log.names().len(), 3);
    assert!(scheduler.is_shutting_down());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_in_flight_fire() {
    let (repository, launcher) = launcher();
    let scheduler = JobScheduler::new(Arc::new(launcher));

    let handle = scheduler
        .schedule(
            slow_job("nightlyJob", Duration::from_secs(8)),
            "nightly",
            TriggerConfig::new(60, 0),
            JobParameters::new(),
        )
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    scheduler.shutdown().await.unwrap();

    assert!(handle.is_finished());
    let history = repository.executions_for(
        &tasker_batch::models::JobInstanceKey::new(
            "nightlyJob",
            &JobParameters::from_args(["run.id(long)=1"]).unwrap(),
        ),
    );
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, BatchStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_timeout_reports_stuck_fire() {
    let (_, launcher) = launcher();
    let scheduler = JobScheduler::new(Arc::new(launcher))
        .with_shutdown_timeout(Duration::from_secs(2));

    scheduler
        .schedule(
            slow_job("stuckJob", Duration::from_secs(3600)),
            "hourly",
            TriggerConfig::new(60, 0),
            JobParameters::new(),
        )
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let result = scheduler.shutdown().await;
    assert!(matches!(result, Err(BatchError::Timeout(_))));
}

#[tokio::test(start_paused = true)]
async fn test_schedule_all_from_configuration() {
    let log = ExecutionLog::new();
    let (_, launcher) = launcher();
    let scheduler = JobScheduler::from_config(Arc::new(launcher), &SchedulerConfig::default());
    let mut jobs = HashMap::new();
    jobs.insert("pollJob".to_string(), quick_job("pollJob", &log));

    let configured = ScheduledTriggerConfig {
        job_name: "pollJob".to_string(),
        name: "configured".to_string(),
        interval_seconds: 2,
        repeat_count: 1,
        overlap_policy: OverlapPolicy::Skip,
        parameters: [("region".to_string(), "eu".to_string())].into_iter().collect(),
    };
    let handles = scheduler.schedule_all(&jobs, &[configured.clone()]).unwrap();
    assert_eq!(handles.len(), 1);
    handles[0].wait().await;
    assert_eq!(handles[0].stats().dispatched, 2);

    let unknown = ScheduledTriggerConfig {
        job_name: "missingJob".to_string(),
        ..configured
    };
    assert!(matches!(
        scheduler.schedule_all(&jobs, &[unknown]),
        Err(BatchError::Configuration(_))
    ));
    scheduler.shutdown().await.unwrap();
}
