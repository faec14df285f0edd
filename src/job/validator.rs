//! # Parameter Validators
//!
//! Validators guard the launch: any failure blocks the launch before an
//! execution exists. [`CompositeJobParametersValidator`] runs its chain in
//! order and stops at the first failure.

use crate::error::ParameterValidationError;
use crate::models::{JobParameter, JobParameters};
use std::collections::BTreeSet;
use std::sync::Arc;

pub type ValidationResult = std::result::Result<(), ParameterValidationError>;

pub trait JobParametersValidator: Send + Sync {
    fn validate(&self, parameters: &JobParameters) -> ValidationResult;
}

/// Required keys must be present; when optional keys are declared, nothing
/// outside required ∪ optional is accepted
#[derive(Debug, Clone, Default)]
pub struct DefaultJobParametersValidator {
    required_keys: BTreeSet<String>,
    optional_keys: BTreeSet<String>,
}

impl DefaultJobParametersValidator {
    pub fn new<R, O>(required_keys: R, optional_keys: O) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            required_keys: required_keys.into_iter().map(Into::into).collect(),
            optional_keys: optional_keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl JobParametersValidator for DefaultJobParametersValidator {
    fn validate(&self, parameters: &JobParameters) -> ValidationResult {
        let missing: Vec<String> = self
            .required_keys
            .iter()
            .filter(|key| !parameters.contains_key(key))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ParameterValidationError::MissingKeys(missing));
        }

        if !self.optional_keys.is_empty() {
            let unrecognized: Vec<String> = parameters
                .keys()
                .filter(|key| !self.required_keys.contains(*key) && !self.optional_keys.contains(*key))
                .map(str::to_string)
                .collect();
            if !unrecognized.is_empty() {
                return Err(ParameterValidationError::UnrecognizedKeys(unrecognized));
            }
        }
        Ok(())
    }
}

/// Fails when `key` is absent or holds an empty string
#[derive(Debug, Clone)]
pub struct RequiredKeyValidator {
    key: String,
}

impl RequiredKeyValidator {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl JobParametersValidator for RequiredKeyValidator {
    fn validate(&self, parameters: &JobParameters) -> ValidationResult {
        match parameters.get(&self.key) {
            None => Err(ParameterValidationError::MissingKeys(vec![self.key.clone()])),
            Some(JobParameter::String(value)) if value.trim().is_empty() => {
                Err(ParameterValidationError::MissingKeys(vec![self.key.clone()]))
            }
            Some(_) => Ok(()),
        }
    }
}

/// String parameter `key` must end with `extension`, ignoring case
#[derive(Debug, Clone)]
pub struct FileExtensionValidator {
    key: String,
    extension: String,
}

impl FileExtensionValidator {
    pub fn new(key: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            extension: extension.into().trim_start_matches('.').to_ascii_lowercase(),
        }
    }
}

impl JobParametersValidator for FileExtensionValidator {
    fn validate(&self, parameters: &JobParameters) -> ValidationResult {
        let Some(value) = parameters.get_string(&self.key) else {
            return Err(ParameterValidationError::MissingKeys(vec![self.key.clone()]));
        };
        if value.to_ascii_lowercase().ends_with(&self.extension) {
            Ok(())
        } else {
            Err(ParameterValidationError::InvalidValue {
                key: self.key.clone(),
                reason: format!("'{value}' does not use the {} file extension", self.extension),
            })
        }
    }
}

/// Fail-fast chain of validators
#[derive(Clone, Default)]
pub struct CompositeJobParametersValidator {
    validators: Vec<Arc<dyn JobParametersValidator>>,
}

impl CompositeJobParametersValidator {
    pub fn new(validators: Vec<Arc<dyn JobParametersValidator>>) -> Self {
        Self { validators }
    }

    pub fn with(mut self, validator: Arc<dyn JobParametersValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl JobParametersValidator for CompositeJobParametersValidator {
    fn validate(&self, parameters: &JobParameters) -> ValidationResult {
        self.validators
            .iter()
            .try_for_each(|validator| validator.validate(parameters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> CompositeJobParametersValidator {
        CompositeJobParametersValidator::new(vec![
            Arc::new(RequiredKeyValidator::new("fileName")),
            Arc::new(FileExtensionValidator::new("fileName", "csv")),
        ])
    }

    #[test]
    fn test_chain_rejects_missing_key() {
        let result = chain().validate(&JobParameters::new());
        assert_eq!(
            result,
            Err(ParameterValidationError::MissingKeys(vec!["fileName".to_string()]))
        );
    }

    #[test]
    fn test_chain_rejects_wrong_extension() {
        let params = JobParameters::from_args(["fileName=data.txt"]).unwrap();
        assert!(matches!(
            chain().validate(&params),
            Err(ParameterValidationError::InvalidValue { ref key, .. }) if key == "fileName"
        ));
    }

    #[test]
    fn test_chain_accepts_csv_case_insensitively() {
        for name in ["fileName=data.csv", "fileName=DATA.CSV"] {
            let params = JobParameters::from_args([name]).unwrap();
            assert!(chain().validate(&params).is_ok());
        }
    }

    #[test]
    fn test_default_validator_optional_keys() {
        let validator = DefaultJobParametersValidator::new(["fileName"], ["name", "currentDate"]);

        let ok = JobParameters::from_args(["fileName=a.csv", "name=batch"]).unwrap();
        assert!(validator.validate(&ok).is_ok());

        let extra = JobParameters::from_args(["fileName=a.csv", "color=red"]).unwrap();
        assert_eq!(
            validator.validate(&extra),
            Err(ParameterValidationError::UnrecognizedKeys(vec!["color".to_string()]))
        );
    }

    #[test]
    fn test_default_validator_without_optional_accepts_extras() {
        let validator = DefaultJobParametersValidator::new(["fileName"], Vec::<String>::new());
        let params = JobParameters::from_args(["fileName=a.csv", "color=red"]).unwrap();
        assert!(validator.validate(&params).is_ok());
    }
}
