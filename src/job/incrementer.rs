//! Parameter incrementers produce a fresh, unique parameter set from the
//! parameters of the job's most recent instance.

use crate::constants::parameters::{CURRENT_DATE, RUN_ID};
use crate::models::{JobParameters, JobParametersBuilder};
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;

pub trait JobParametersIncrementer: Send + Sync {
    /// Discriminating key; supplying it explicitly skips the incrementer
    fn key(&self) -> &str;

    fn next(&self, previous: Option<&JobParameters>) -> JobParameters;
}

fn builder_from(previous: Option<&JobParameters>) -> JobParametersBuilder {
    previous
        .map(JobParametersBuilder::from_parameters)
        .unwrap_or_default()
}

/// Monotonic `run.id` counter starting at 1
#[derive(Debug, Clone)]
pub struct RunIdIncrementer {
    key: String,
}

impl RunIdIncrementer {
    pub fn new() -> Self {
        Self {
            key: RUN_ID.to_string(),
        }
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Default for RunIdIncrementer {
    fn default() -> Self {
        Self::new()
    }
}

impl JobParametersIncrementer for RunIdIncrementer {
    fn key(&self) -> &str {
        &self.key
    }

    fn next(&self, previous: Option<&JobParameters>) -> JobParameters {
        let run_id = previous
            .and_then(|params| params.get_long(&self.key))
            .unwrap_or(0)
            + 1;
        builder_from(previous)
            .add_long(self.key.clone(), run_id)
            .to_job_parameters()
    }
}

/// Stamps `currentDate` with the clock's current time, moved 1 ms past the
/// previous stamp when the clock has not advanced
pub struct DailyJobTimestamper {
    clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl DailyJobTimestamper {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(Utc::now))
    }

    pub fn with_clock(clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>) -> Self {
        Self { clock }
    }
}

impl Default for DailyJobTimestamper {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DailyJobTimestamper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DailyJobTimestamper").finish_non_exhaustive()
    }
}

impl JobParametersIncrementer for DailyJobTimestamper {
    fn key(&self) -> &str {
        CURRENT_DATE
    }

    fn next(&self, previous: Option<&JobParameters>) -> JobParameters {
        let mut stamp = (self.clock)();
        if let Some(last) = previous.and_then(|params| params.get_date(CURRENT_DATE)) {
            if stamp <= last {
                stamp = last + Duration::milliseconds(1);
            }
        }
        builder_from(previous)
            .add_date(CURRENT_DATE, stamp)
            .to_job_parameters()
    }
}
