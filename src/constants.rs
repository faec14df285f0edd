//! # System Constants
//!
//! Event names published on the lifecycle channel and well-known parameter
//! keys used by the standard incrementers and sample jobs.

/// Lifecycle events published through `EventPublisher`
pub mod events {
    // Job lifecycle events
    pub const JOB_STARTED: &str = "job.started";
    pub const JOB_COMPLETED: &str = "job.completed";
    pub const JOB_FAILED: &str = "job.failed";
    pub const JOB_STOPPED: &str = "job.stopped";

    // Step lifecycle events
    pub const STEP_COMPLETED: &str = "step.completed";
    pub const STEP_FAILED: &str = "step.failed";

    // Chunk engine events
    pub const CHUNK_COMMITTED: &str = "chunk.committed";

    // Scheduler events
    pub const TRIGGER_FIRED: &str = "trigger.fired";
    pub const TRIGGER_SKIPPED: &str = "trigger.skipped";
}

/// Parameter keys with meaning to the engine
pub mod parameters {
    pub const RUN_ID: &str = "run.id";
    pub const CURRENT_DATE: &str = "currentDate";
    pub const FILE_NAME: &str = "fileName";
    pub const NAME: &str = "name";
}

/// Sample job names shipped with `batch-runner`
pub mod jobs {
    pub const BASIC_JOB: &str = "basicJob";
    pub const CHUNK_BASED_JOB: &str = "chunkBasedJob";
    pub const CONDITIONAL_JOB: &str = "conditionalJob";
    pub const CONDITIONAL_DECIDER_JOB: &str = "conditionalDeciderJob";
    pub const CONDITIONAL_STEP_LOGIC_JOB: &str = "conditionalStepLogicJob";

    pub const ALL: [&str; 5] = [
        BASIC_JOB,
        CHUNK_BASED_JOB,
        CONDITIONAL_JOB,
        CONDITIONAL_DECIDER_JOB,
        CONDITIONAL_STEP_LOGIC_JOB,
    ];
}
