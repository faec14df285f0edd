// State machine module for job execution lifecycle
//
// JobExecution status changes go through `JobStateMachine` so every status
// freeze happens through one transition table.

pub mod errors;
pub mod events;
pub mod job_state_machine;
pub mod states;

// Re-export main types for convenient access
pub use errors::{StateMachineError, StateMachineResult};
pub use events::JobEvent;
pub use job_state_machine::JobStateMachine;
pub use states::{BatchStatus, NodeState};
