#![allow(clippy::doc_markdown)] // Allow technical terms like ExitStatus, JobExecution in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Tasker Batch
//!
//! Batch job execution engine: chunk-oriented and tasklet steps, conditional
//! flow graphs routed by exit status, a parameter contract that decides job
//! identity, a launcher with restart semantics and a fixed-interval trigger
//! scheduler.
//!
//! ## Architecture
//!
//! A [`job::Job`] owns a [`flow::Flow`]: a graph of nodes (steps or deciders)
//! connected by transitions keyed on exit status patterns. The
//! [`launcher::JobLauncher`] turns a job plus parameters into a
//! `JobExecution`, checking the identity rule against a
//! [`repository::JobRepository`], and runs the flow on a dedicated tokio
//! worker. The [`scheduler::JobScheduler`] fires launches on intervals and
//! never overlaps two fires of the same schedule.
//!
//! ## Module Organization
//!
//! - [`models`] - parameters, instances, job and step executions, exit status
//! - [`state_machine`] - JobExecution status transitions
//! - [`step`] - tasklet, chunk and flow steps plus completion policies
//! - [`flow`] - flow graph builder, transitions, deciders and executor
//! - [`job`] - jobs, validators, incrementers and listeners
//! - [`repository`] - persistence seam with an in-memory implementation
//! - [`launcher`] - launch sequence, stop requests
//! - [`scheduler`] - fixed-interval triggers
//! - [`config`] - layered configuration
//! - [`events`] - lifecycle event channel
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tasker_batch::flow::{step, FlowBuilder};
//! use tasker_batch::job::Job;
//! use tasker_batch::launcher::JobLauncher;
//! use tasker_batch::models::JobParameters;
//! use tasker_batch::repository::InMemoryJobRepository;
//! use tasker_batch::step::{RepeatStatus, TaskletStep};
//!
//! # async fn example() -> tasker_batch::Result<()> {
//! let flow = FlowBuilder::new("helloFlow")
//!     .start(step(Arc::new(TaskletStep::from_fn("hello", |_, _| {
//!         println!("Hello, batch!");
//!         Ok(RepeatStatus::Finished)
//!     }))))
//!     .build()?;
//! let job = Arc::new(Job::builder("helloJob").flow(flow).build()?);
//!
//! let launcher = JobLauncher::new(Arc::new(InMemoryJobRepository::new()));
//! let execution = launcher.launch(job, JobParameters::new()).await?;
//! println!("{} finished with {}", execution.job_name, execution.status);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod flow;
pub mod job;
pub mod launcher;
pub mod logging;
pub mod models;
pub mod repository;
pub mod samples;
pub mod scheduler;
pub mod state_machine;
pub mod step;
pub mod utils;

pub use config::{BatchConfig, ConfigManager};
pub use error::{BatchError, DuplicateInstanceError, ParameterValidationError, Result};
pub use events::{EventPublisher, PublishedEvent};
pub use flow::{Flow, FlowBuilder, FlowExecutor, FlowOutcome};
pub use job::{Job, JobBuilder};
pub use launcher::JobLauncher;
pub use models::{ExitStatus, JobExecution, JobInstance, JobParameters, StepExecution};
pub use repository::{InMemoryJobRepository, JobRepository};
pub use scheduler::{JobScheduler, ScheduleHandle, TriggerConfig};
pub use state_machine::{BatchStatus, JobEvent, NodeState};
