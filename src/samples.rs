//! # Sample Jobs
//!
//! The jobs bundled with `batch-runner`. They double as end-to-end fixtures
//! for the integration tests.
//!
//! | Job | Shows |
//! |-----|-------|
//! | `basicJob` | validator chain, timestamp incrementer, job listener, late-bound parameters |
//! | `chunkBasedJob` | chunk engine with a random chunk size policy |
//! | `conditionalJob` | exit-status routing and stop-and-restart |
//! | `conditionalDeciderJob` | routing through a decider node |
//! | `conditionalStepLogicJob` | an embedded flow run as one step |

use crate::config::ExecutionConfig;
use crate::constants::jobs::{
    BASIC_JOB, CHUNK_BASED_JOB, CONDITIONAL_DECIDER_JOB, CONDITIONAL_JOB,
    CONDITIONAL_STEP_LOGIC_JOB,
};
use crate::constants::parameters::{CURRENT_DATE, FILE_NAME, NAME};
use crate::error::{BatchError, Result};
use crate::flow::{decision, step, FlowBuilder, FlowState, RandomDecider};
use crate::job::{
    CompositeJobParametersValidator, DailyJobTimestamper, DefaultJobParametersValidator,
    FileExtensionValidator, Job, JobLoggerListener, RequiredKeyValidator, RunIdIncrementer,
};
use crate::step::{
    ChunkStep, FlowStep, FnItemWriter, ItemReader, ItemWriter, ListItemReader,
    RandomChunkSizePolicy, ReaderFactory, RepeatStatus, StepContext, TaskletStep, WriterFactory,
};
use crate::utils::RandomSource;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Number of generated items when `itemCount` is not supplied
pub const DEFAULT_ITEM_COUNT: i64 = 100_000;

/// Parameter that makes `conditionalJob`'s first step fail
pub const FORCE_FAILURE: &str = "forceFailure";

/// Parameter sizing the `chunkBasedJob` input
pub const ITEM_COUNT: &str = "itemCount";

fn tasklet<F>(name: &str, body: F) -> Arc<dyn FlowState>
where
    F: Fn() + Send + Sync + 'static,
{
    step(Arc::new(TaskletStep::from_fn(name, move |_, _| {
        body();
        Ok(RepeatStatus::Finished)
    })))
}

/// `fileName` must be present and a `.csv`; only `name` and `currentDate`
/// may accompany it
pub fn basic_job() -> Result<Job> {
    let hello = step(Arc::new(TaskletStep::from_fn("step1", |_, context| {
        let parameters = context.parameters();
        info!("Hello, {}!", parameters.get_string(NAME).unwrap_or("world"));
        info!("file name = {}", parameters.get_string(FILE_NAME).unwrap_or_default());
        Ok(RepeatStatus::Finished)
    })));

    let validator = CompositeJobParametersValidator::new(vec![
        Arc::new(RequiredKeyValidator::new(FILE_NAME)),
        Arc::new(FileExtensionValidator::new(FILE_NAME, "csv")),
        Arc::new(DefaultJobParametersValidator::new([FILE_NAME], [NAME, CURRENT_DATE])),
    ]);

    Job::builder(BASIC_JOB)
        .flow(FlowBuilder::new(BASIC_JOB).start(hello).build()?)
        .validator(Arc::new(validator))
        .incrementer(Arc::new(DailyJobTimestamper::new()))
        .listener(Arc::new(JobLoggerListener))
        .build()
}

/// Writes `itemCount` random UUIDs in randomly sized chunks of 1..=`max_chunk`
pub fn chunk_based_job(max_chunk: usize, random: Arc<dyn RandomSource>) -> Result<Job> {
    let reader: ReaderFactory<String> = Arc::new(
        |context: &StepContext| -> Result<Box<dyn ItemReader<String>>> {
            let count = context
                .parameters()
                .get_long(ITEM_COUNT)
                .unwrap_or(DEFAULT_ITEM_COUNT);
            let count = usize::try_from(count).map_err(|_| {
                BatchError::step_failure("chunkStep", format!("{ITEM_COUNT} must not be negative"))
            })?;
            let items: Vec<String> = (0..count).map(|_| Uuid::new_v4().to_string()).collect();
            Ok(Box::new(ListItemReader::new(items)))
        },
    );
    let writer: WriterFactory<String> = Arc::new(
        |_: &StepContext| -> Result<Box<dyn ItemWriter<String>>> {
            Ok(Box::new(FnItemWriter::new(|items: Vec<String>| -> Result<()> {
                for item in &items {
                    debug!(">> current item = {item}");
                }
                Ok(())
            })))
        },
    );

    let chunk_step = ChunkStep::new(
        "chunkStep",
        Arc::new(RandomChunkSizePolicy::new(max_chunk, random)),
        reader,
        writer,
    );

    Job::builder(CHUNK_BASED_JOB)
        .flow(
            FlowBuilder::new(CHUNK_BASED_JOB)
                .start(step(Arc::new(chunk_step)))
                .build()?,
        )
        .incrementer(Arc::new(RunIdIncrementer::new()))
        .build()
}

/// `firstStep` fails when `forceFailure=true`. A failure runs `failureStep`
/// and stops the job so a relaunch of the same instance resumes at
/// `successStep`; anything else goes straight to `successStep`.
pub fn conditional_job() -> Result<Job> {
    let first = step(Arc::new(TaskletStep::from_fn("firstStep", |_, context| {
        if context.parameters().get_boolean(FORCE_FAILURE).unwrap_or(false) {
            return Err(BatchError::step_failure("firstStep", "failure forced by parameter"));
        }
        Ok(RepeatStatus::Finished)
    })));
    let failure = tasklet("failureStep", || info!("Failure!"));
    let success = tasklet("successStep", || info!("Success!"));

    let flow = FlowBuilder::new(CONDITIONAL_JOB)
        .start(first)
        .on("FAILED")
        .to(failure)
        .on("*")
        .stop_and_restart(Arc::clone(&success))
        .from("firstStep")
        .on("*")
        .to(success)
        .build()?;

    Job::builder(CONDITIONAL_JOB)
        .flow(flow)
        .incrementer(Arc::new(RunIdIncrementer::new()))
        .build()
}

/// `firstStep` then a random decision between `failureStep` and `successStep`
pub fn conditional_decider_job(random: Arc<dyn RandomSource>) -> Result<Job> {
    let flow = FlowBuilder::new(CONDITIONAL_DECIDER_JOB)
        .start(tasklet("firstStep", || {}))
        .next(decision("decider", Arc::new(RandomDecider::new(random))))
        .on("FAILED")
        .to(tasklet("failureStep", || info!("Failure!")))
        .from("decider")
        .on("*")
        .to(tasklet("successStep", || info!("Success!")))
        .build()?;

    Job::builder(CONDITIONAL_DECIDER_JOB)
        .flow(flow)
        .incrementer(Arc::new(RunIdIncrementer::new()))
        .build()
}

/// `initializeBatch` wraps the three-step `preProcessingFlow`, then `runBatch`
pub fn conditional_step_logic_job() -> Result<Job> {
    let pre_processing = FlowBuilder::new("preProcessingFlow")
        .start(tasklet("loadFileStep", || info!("The stock file has been loaded")))
        .next(tasklet("loadCustomerStep", || info!("The customer file has been loaded")))
        .next(tasklet("updateStartStep", || info!("The start has been updated")))
        .build()?;

    let flow = FlowBuilder::new(CONDITIONAL_STEP_LOGIC_JOB)
        .start(step(Arc::new(FlowStep::new(
            "initializeBatch",
            Arc::new(pre_processing),
        ))))
        .next(tasklet("runBatch", || info!("The batch has run")))
        .build()?;

    Job::builder(CONDITIONAL_STEP_LOGIC_JOB)
        .flow(flow)
        .incrementer(Arc::new(RunIdIncrementer::new()))
        .build()
}

/// Every sample job keyed by name
pub fn sample_jobs(
    random: Arc<dyn RandomSource>,
    limits: &ExecutionConfig,
) -> Result<HashMap<String, Arc<Job>>> {
    let jobs = [
        basic_job()?,
        chunk_based_job(limits.random_chunk_max, Arc::clone(&random))?,
        conditional_job()?,
        conditional_decider_job(random)?,
        conditional_step_logic_job()?,
    ];
    Ok(jobs
        .into_iter()
        .map(|job| (job.name().to_string(), Arc::new(job)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::jobs::ALL;
    use crate::utils::SeededRandomSource;

    #[test]
    fn test_all_sample_jobs_build() {
        let jobs = sample_jobs(Arc::new(SeededRandomSource::new(7)), &ExecutionConfig::default())
            .unwrap();
        assert_eq!(jobs.len(), ALL.len());
        for name in ALL {
            assert!(jobs.contains_key(name), "missing sample job {name}");
        }
    }

    #[test]
    fn test_conditional_job_graph() {
        let job = conditional_job().unwrap();
        let flow = job.flow();
        assert_eq!(flow.start_node(), "firstStep");
        for node in ["firstStep", "failureStep", "successStep"] {
            assert!(flow.contains(node));
        }
        assert_eq!(flow.transitions("firstStep").len(), 2);
    }
}
