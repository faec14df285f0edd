//! # Trigger Scheduler
//!
//! Fires the job launcher on fixed-interval triggers. One schedule exists per
//! job + trigger pair. A tick that arrives while the previous fire of the
//! same schedule is still running is skipped with a warning, never queued.

pub mod job_scheduler;
pub mod trigger;

pub use job_scheduler::{JobScheduler, ScheduleHandle, ScheduleStats};
pub use trigger::{OverlapPolicy, TriggerConfig};
