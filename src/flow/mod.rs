//! # Flow Graphs
//!
//! A flow is a set of named nodes (steps and decisions) connected by
//! transitions keyed on exit status. Flows are built with [`FlowBuilder`],
//! which rejects statically detectable configuration errors, and run by
//! [`FlowExecutor`].
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tasker_batch::flow::{self, FlowBuilder};
//! use tasker_batch::step::{RepeatStatus, TaskletStep};
//!
//! # fn main() -> tasker_batch::Result<()> {
//! let first = flow::step(Arc::new(TaskletStep::from_fn("firstStep", |_, _| Ok(RepeatStatus::Finished))));
//! let failure = flow::step(Arc::new(TaskletStep::from_fn("failureStep", |_, _| Ok(RepeatStatus::Finished))));
//! let success = flow::step(Arc::new(TaskletStep::from_fn("successStep", |_, _| Ok(RepeatStatus::Finished))));
//!
//! let flow = FlowBuilder::new("conditionalJob")
//!     .start(first)
//!     .on("FAILED").to(failure)
//!     .from("firstStep")
//!     .on("*").to(success)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod decider;
pub mod executor;
pub mod state;
pub mod transition;

pub use builder::{FlowBuilder, TransitionBuilder};
pub use decider::{JobExecutionDecider, RandomDecider};
pub use executor::{FlowExecutor, FlowOutcome};
pub use state::{decision, step, DecisionState, FlowState, StepState};
pub use transition::{Transition, TransitionTarget};

use crate::models::ExitStatus;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A validated flow graph
pub struct Flow {
    name: String,
    start: String,
    states: HashMap<String, Arc<dyn FlowState>>,
    /// Node names in registration order
    order: Vec<String>,
    transitions: HashMap<String, Vec<Transition>>,
}

impl Flow {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_node(&self) -> &str {
        &self.start
    }

    pub fn contains(&self, node: &str) -> bool {
        self.states.contains_key(node)
    }

    pub fn state(&self, node: &str) -> Option<&Arc<dyn FlowState>> {
        self.states.get(node)
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn transitions(&self, node: &str) -> &[Transition] {
        self.transitions.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Transition taken when `node` finishes with `exit_status`
    pub fn resolve(&self, node: &str, exit_status: &ExitStatus) -> Option<&Transition> {
        transition::resolve(self.transitions(node), exit_status)
    }
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("name", &self.name)
            .field("start", &self.start)
            .field("nodes", &self.order)
            .field("transitions", &self.transitions)
            .finish()
    }
}
