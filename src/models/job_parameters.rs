//! # Job Parameters
//!
//! Immutable, typed parameter sets. Together with the job name a parameter set
//! identifies a `JobInstance`, so equality and the canonical identity string
//! both cover every entry.
//!
//! ## Command line form
//!
//! Parameters arrive from the command line or trigger configuration as
//! `key=value` pairs. A type hint in parentheses selects the value type:
//!
//! ```text
//! fileName=data.csv           string
//! run.id(long)=7              long
//! ratio(double)=0.25          double
//! currentDate(date)=2024-01-31  date (or RFC 3339)
//! dryRun(boolean)=true        boolean
//! ```

use crate::error::{BatchError, ParameterValidationError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single typed parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum JobParameter {
    String(String),
    Long(i64),
    Double(f64),
    Date(DateTime<Utc>),
    Boolean(bool),
}

impl JobParameter {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Long(_) => "long",
            Self::Double(_) => "double",
            Self::Date(_) => "date",
            Self::Boolean(_) => "boolean",
        }
    }

    /// Parse a raw value using a type hint from the `key(type)=value` form
    pub fn parse(type_hint: Option<&str>, raw: &str) -> std::result::Result<Self, String> {
        match type_hint.map(str::to_ascii_lowercase).as_deref() {
            None | Some("string") => Ok(Self::String(raw.to_string())),
            Some("long") => raw
                .parse::<i64>()
                .map(Self::Long)
                .map_err(|e| format!("'{raw}' is not a long: {e}")),
            Some("double") => raw
                .parse::<f64>()
                .map(Self::Double)
                .map_err(|e| format!("'{raw}' is not a double: {e}")),
            Some("boolean") => raw
                .parse::<bool>()
                .map(Self::Boolean)
                .map_err(|e| format!("'{raw}' is not a boolean: {e}")),
            Some("date") => parse_date(raw).map(Self::Date),
            Some(other) => Err(format!("unknown parameter type '{other}'")),
        }
    }
}

fn parse_date(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| format!("'{raw}' is not a date: {e}"))
        .and_then(|date| {
            date.and_hms_opt(0, 0, 0)
                .map(|naive| naive.and_utc())
                .ok_or_else(|| format!("'{raw}' is not a date"))
        })
}

impl fmt::Display for JobParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => write!(f, "{value}"),
            Self::Long(value) => write!(f, "{value}"),
            Self::Double(value) => write!(f, "{value}"),
            Self::Date(value) => write!(f, "{}", value.to_rfc3339()),
            Self::Boolean(value) => write!(f, "{value}"),
        }
    }
}

/// Immutable mapping from parameter name to typed value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobParameters {
    parameters: BTreeMap<String, JobParameter>,
}

impl JobParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> JobParametersBuilder {
        JobParametersBuilder::default()
    }

    /// Parse `key=value` / `key(type)=value` arguments
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = JobParametersBuilder::default();
        for arg in args {
            let arg = arg.as_ref();
            let (key, value) = arg.split_once('=').ok_or_else(|| {
                BatchError::Validation(ParameterValidationError::InvalidValue {
                    key: arg.to_string(),
                    reason: "expected key=value".to_string(),
                })
            })?;
            builder = builder.add_parsed(key, value)?;
        }
        Ok(builder.to_job_parameters())
    }

    /// Parse configured `(key, value)` pairs using the same type-hint syntax
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut builder = JobParametersBuilder::default();
        for (key, value) in pairs {
            builder = builder.add_parsed(key, value)?;
        }
        Ok(builder.to_job_parameters())
    }

    pub fn get(&self, key: &str) -> Option<&JobParameter> {
        self.parameters.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.parameters.contains_key(key)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.parameters.get(key) {
            Some(JobParameter::String(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn get_long(&self, key: &str) -> Option<i64> {
        match self.parameters.get(key) {
            Some(JobParameter::Long(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_double(&self, key: &str) -> Option<f64> {
        match self.parameters.get(key) {
            Some(JobParameter::Double(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_date(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.parameters.get(key) {
            Some(JobParameter::Date(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_boolean(&self, key: &str) -> Option<bool> {
        match self.parameters.get(key) {
            Some(JobParameter::Boolean(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JobParameter)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Entries of `overrides` replace entries of `self`
    pub fn merged_with(&self, overrides: &JobParameters) -> JobParameters {
        let mut parameters = self.parameters.clone();
        for (key, value) in &overrides.parameters {
            parameters.insert(key.clone(), value.clone());
        }
        JobParameters { parameters }
    }

    /// Canonical identity string: sorted keys with typed values. Delimiters
    /// inside keys and values are escaped so distinct sets never collide.
    pub fn identity_key(&self) -> String {
        self.parameters
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}:{}",
                    escape_identity(key),
                    value.type_name(),
                    escape_identity(&value.to_string())
                )
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for JobParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .parameters
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&rendered)
    }
}

/// Builder seeded from nothing or from an existing parameter set
#[derive(Debug, Clone, Default)]
pub struct JobParametersBuilder {
    parameters: BTreeMap<String, JobParameter>,
}

impl JobParametersBuilder {
    pub fn from_parameters(parameters: &JobParameters) -> Self {
        Self {
            parameters: parameters.parameters.clone(),
        }
    }

    pub fn add(mut self, key: impl Into<String>, value: JobParameter) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn add_string(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add(key, JobParameter::String(value.into()))
    }

    pub fn add_long(self, key: impl Into<String>, value: i64) -> Self {
        self.add(key, JobParameter::Long(value))
    }

    pub fn add_double(self, key: impl Into<String>, value: f64) -> Self {
        self.add(key, JobParameter::Double(value))
    }

    pub fn add_date(self, key: impl Into<String>, value: DateTime<Utc>) -> Self {
        self.add(key, JobParameter::Date(value))
    }

    pub fn add_boolean(self, key: impl Into<String>, value: bool) -> Self {
        self.add(key, JobParameter::Boolean(value))
    }

    fn add_parsed(self, key: &str, raw: &str) -> Result<Self> {
        let (name, type_hint) = split_type_hint(key);
        if name.is_empty() {
            return Err(ParameterValidationError::InvalidValue {
                key: key.to_string(),
                reason: "parameter name is empty".to_string(),
            }
            .into());
        }
        let value = JobParameter::parse(type_hint, raw).map_err(|reason| {
            ParameterValidationError::InvalidValue {
                key: name.to_string(),
                reason,
            }
        })?;
        Ok(self.add(name, value))
    }

    pub fn to_job_parameters(self) -> JobParameters {
        JobParameters {
            parameters: self.parameters,
        }
    }
}

fn escape_identity(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | ',' | '=' | ':') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `name(type)` -> (`name`, Some(`type`)); `name` -> (`name`, None)
fn split_type_hint(key: &str) -> (&str, Option<&str>) {
    let key = key.trim();
    match (key.find('('), key.strip_suffix(')')) {
        (Some(open), Some(without_close)) => (&key[..open], Some(&without_close[open + 1..])),
        _ => (key, None),
    }
}
