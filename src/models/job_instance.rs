use super::job_parameters::JobParameters;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of a job instance: job name plus canonical parameter string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobInstanceKey {
    pub job_name: String,
    pub parameters_key: String,
}

impl JobInstanceKey {
    pub fn new(job_name: impl Into<String>, parameters: &JobParameters) -> Self {
        Self {
            job_name: job_name.into(),
            parameters_key: parameters.identity_key(),
        }
    }
}

impl fmt::Display for JobInstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.job_name, self.parameters_key)
    }
}

/// A job identity; owns every execution launched with the same parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInstance {
    pub instance_id: Uuid,
    pub job_name: String,
    pub parameters: JobParameters,
    pub created_at: DateTime<Utc>,
}

impl JobInstance {
    pub fn new(job_name: impl Into<String>, parameters: JobParameters) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            job_name: job_name.into(),
            parameters,
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> JobInstanceKey {
        JobInstanceKey::new(self.job_name.clone(), &self.parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_matches_for_identical_parameters() {
        let params = JobParameters::from_args(["fileName=a.csv"]).unwrap();
        let first = JobInstance::new("basicJob", params.clone());
        let second = JobInstance::new("basicJob", params);
        assert_ne!(first.instance_id, second.instance_id);
        assert_eq!(first.key(), second.key());
    }

    #[test]
    fn test_key_differs_by_job_name() {
        let params = JobParameters::new();
        assert_ne!(
            JobInstanceKey::new("a", &params),
            JobInstanceKey::new("b", &params)
        );
    }
}
