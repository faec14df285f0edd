//! # Jobs
//!
//! A job is a named flow plus its parameter contract (validator and
//! incrementer) and lifecycle listeners. Jobs are assembled once with
//! [`JobBuilder`] and shared as `Arc<Job>` between launches.

pub mod incrementer;
pub mod listener;
pub mod validator;

pub use incrementer::{DailyJobTimestamper, JobParametersIncrementer, RunIdIncrementer};
pub use listener::{JobExecutionListener, JobLoggerListener};
pub use validator::{
    CompositeJobParametersValidator, DefaultJobParametersValidator, FileExtensionValidator,
    JobParametersValidator, RequiredKeyValidator,
};

use crate::error::{BatchError, Result};
use crate::flow::Flow;
use crate::models::JobParameters;
use std::fmt;
use std::sync::Arc;

pub struct Job {
    name: String,
    flow: Arc<Flow>,
    validator: Option<Arc<dyn JobParametersValidator>>,
    incrementer: Option<Arc<dyn JobParametersIncrementer>>,
    listeners: Vec<Arc<dyn JobExecutionListener>>,
    restartable: bool,
}

impl Job {
    pub fn builder(name: impl Into<String>) -> JobBuilder {
        JobBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    pub fn incrementer(&self) -> Option<&Arc<dyn JobParametersIncrementer>> {
        self.incrementer.as_ref()
    }

    pub fn listeners(&self) -> &[Arc<dyn JobExecutionListener>] {
        &self.listeners
    }

    /// Whether a FAILED or STOPPED instance may be launched again
    pub fn is_restartable(&self) -> bool {
        self.restartable
    }

    pub fn validate(&self, parameters: &JobParameters) -> Result<()> {
        match &self.validator {
            Some(validator) => validator.validate(parameters).map_err(BatchError::from),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("flow", &self.flow.name())
            .field("has_validator", &self.validator.is_some())
            .field("incrementer_key", &self.incrementer.as_ref().map(|i| i.key().to_string()))
            .field("listeners", &self.listeners.len())
            .field("restartable", &self.restartable)
            .finish()
    }
}

pub struct JobBuilder {
    name: String,
    flow: Option<Arc<Flow>>,
    validators: Vec<Arc<dyn JobParametersValidator>>,
    incrementer: Option<Arc<dyn JobParametersIncrementer>>,
    listeners: Vec<Arc<dyn JobExecutionListener>>,
    restartable: bool,
}

impl JobBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flow: None,
            validators: Vec::new(),
            incrementer: None,
            listeners: Vec::new(),
            restartable: true,
        }
    }

    pub fn flow(mut self, flow: Flow) -> Self {
        self.flow = Some(Arc::new(flow));
        self
    }

    /// Validators run in registration order and stop at the first failure
    pub fn validator(mut self, validator: Arc<dyn JobParametersValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn incrementer(mut self, incrementer: Arc<dyn JobParametersIncrementer>) -> Self {
        self.incrementer = Some(incrementer);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn JobExecutionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn prevent_restart(mut self) -> Self {
        self.restartable = false;
        self
    }

    pub fn build(self) -> Result<Job> {
        let flow = self.flow.ok_or_else(|| {
            BatchError::FlowConfiguration(format!("job '{}' has no flow", self.name))
        })?;
        let validator: Option<Arc<dyn JobParametersValidator>> = match self.validators.len() {
            0 => None,
            1 => self.validators.into_iter().next(),
            _ => Some(Arc::new(CompositeJobParametersValidator::new(self.validators))),
        };
        Ok(Job {
            name: self.name,
            flow,
            validator,
            incrementer: self.incrementer,
            listeners: self.listeners,
            restartable: self.restartable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParameterValidationError;
    use crate::flow::{step, FlowBuilder};
    use crate::step::{RepeatStatus, TaskletStep};

    fn flow() -> Flow {
        FlowBuilder::new("f")
            .start(step(Arc::new(TaskletStep::from_fn("only", |_, _| {
                Ok(RepeatStatus::Finished)
            }))))
            .build()
            .unwrap()
    }

    #[test]
    fn test_job_requires_flow() {
        assert!(Job::builder("empty").build().is_err());
    }

    #[test]
    fn test_validators_chain_fail_fast() {
        let job = Job::builder("basicJob")
            .flow(flow())
            .validator(Arc::new(RequiredKeyValidator::new("fileName")))
            .validator(Arc::new(FileExtensionValidator::new("fileName", "csv")))
            .build()
            .unwrap();

        assert_eq!(
            job.validate(&JobParameters::new()),
            Err(BatchError::Validation(ParameterValidationError::MissingKeys(vec![
                "fileName".to_string()
            ])))
        );
        let good = JobParameters::from_args(["fileName=data.csv"]).unwrap();
        assert!(job.validate(&good).is_ok());
    }

    #[test]
    fn test_restartable_by_default() {
        let job = Job::builder("j").flow(flow()).build().unwrap();
        assert!(job.is_restartable());
        let job = Job::builder("j").flow(flow()).prevent_restart().build().unwrap();
        assert!(!job.is_restartable());
    }
}
