//! Routing-only flow nodes.
//!
//! A decider reads execution metadata and returns an exit status used to pick
//! the next transition. It never touches the item stream.

use crate::models::{ExitStatus, JobExecution, StepExecution};
use crate::utils::RandomSource;
use std::fmt;
use std::sync::Arc;

pub trait JobExecutionDecider: Send + Sync {
    fn decide(&self, job_execution: &JobExecution, step_execution: Option<&StepExecution>)
        -> ExitStatus;
}

impl<F> JobExecutionDecider for F
where
    F: Fn(&JobExecution, Option<&StepExecution>) -> ExitStatus + Send + Sync,
{
    fn decide(
        &self,
        job_execution: &JobExecution,
        step_execution: Option<&StepExecution>,
    ) -> ExitStatus {
        self(job_execution, step_execution)
    }
}

/// Picks COMPLETED or FAILED from an injected random source
pub struct RandomDecider {
    source: Arc<dyn RandomSource>,
}

impl RandomDecider {
    pub fn new(source: Arc<dyn RandomSource>) -> Self {
        Self { source }
    }
}

impl fmt::Debug for RandomDecider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomDecider")
            .field("source", &self.source)
            .finish()
    }
}

impl JobExecutionDecider for RandomDecider {
    fn decide(&self, _: &JobExecution, _: Option<&StepExecution>) -> ExitStatus {
        if self.source.next_bool() {
            ExitStatus::completed()
        } else {
            ExitStatus::failed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobInstance, JobParameters};
    use crate::utils::ScriptedRandomSource;

    #[test]
    fn test_random_decider_follows_source() {
        let decider = RandomDecider::new(Arc::new(ScriptedRandomSource::from_bools(&[
            true, false,
        ])));
        let execution = JobExecution::new(&JobInstance::new("job", JobParameters::new()));
        assert_eq!(decider.decide(&execution, None), ExitStatus::completed());
        assert_eq!(decider.decide(&execution, None), ExitStatus::failed());
    }

    #[test]
    fn test_closure_decider_reads_last_step() {
        let decider = |_: &JobExecution, step: Option<&StepExecution>| match step {
            Some(step) if step.read_count > 0 => ExitStatus::new("HAS DATA"),
            _ => ExitStatus::new("EMPTY"),
        };
        let execution = JobExecution::new(&JobInstance::new("job", JobParameters::new()));
        assert_eq!(decider.decide(&execution, None).code(), "EMPTY");
    }
}
