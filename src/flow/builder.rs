//! Fluent construction of flow graphs.
//!
//! `start` and `next` register nodes and advance the cursor; `from` moves the
//! cursor to an already registered node; `on(pattern)` opens a transition
//! from the cursor which `to`, `end`, `end_with`, `fail`, `stop` or
//! `stop_and_restart` closes. `to` and `stop_and_restart` move the cursor to
//! their target. Registering a node whose name is already known reuses the
//! first registration.
//!
//! `build` rejects: a missing start node, transitions naming unknown nodes,
//! a duplicate pattern on one node, any pattern declared after a bare `*` on
//! the same node, and nodes unreachable from the start node.

use super::state::FlowState;
use super::transition::{Transition, TransitionTarget};
use super::Flow;
use crate::error::{BatchError, Result};
use crate::models::exit_status::{COMPLETED, WILDCARD};
use crate::models::ExitStatus;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

pub struct FlowBuilder {
    name: String,
    start: Option<String>,
    states: HashMap<String, Arc<dyn FlowState>>,
    order: Vec<String>,
    transitions: HashMap<String, Vec<Transition>>,
    cursor: Option<String>,
    errors: Vec<String>,
}

impl FlowBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: None,
            states: HashMap::new(),
            order: Vec::new(),
            transitions: HashMap::new(),
            cursor: None,
            errors: Vec::new(),
        }
    }

    pub fn start(mut self, state: Arc<dyn FlowState>) -> Self {
        let name = self.register(state);
        if let Some(existing) = &self.start {
            if existing != &name {
                self.errors
                    .push(format!("start node already set to '{existing}'"));
            }
        }
        self.start = Some(name.clone());
        self.cursor = Some(name);
        self
    }

    /// Route `COMPLETED` from the cursor to `state`
    pub fn next(mut self, state: Arc<dyn FlowState>) -> Self {
        let name = self.register(state);
        match self.cursor.clone() {
            Some(from) => self.add_transition(&from, COMPLETED, TransitionTarget::Node(name.clone())),
            None => self
                .errors
                .push(format!("next('{name}') called before start")),
        }
        self.cursor = Some(name);
        self
    }

    /// Move the cursor to a registered node
    pub fn from(mut self, node: &str) -> Self {
        self.cursor = Some(node.to_string());
        self
    }

    pub fn on(self, pattern: impl Into<String>) -> TransitionBuilder {
        TransitionBuilder {
            builder: self,
            pattern: pattern.into(),
        }
    }

    pub fn build(self) -> Result<Flow> {
        let FlowBuilder {
            name,
            start,
            states,
            order,
            transitions,
            mut errors,
            ..
        } = self;

        let Some(start) = start else {
            return Err(BatchError::FlowConfiguration(format!(
                "flow '{name}' has no start node"
            )));
        };

        for (node, rules) in &transitions {
            if !states.contains_key(node) {
                errors.push(format!("transitions declared from unknown node '{node}'"));
            }
            for rule in rules {
                if let Some(target) = rule.target.node() {
                    if !states.contains_key(target) {
                        errors.push(format!(
                            "transition '{}' from '{node}' targets unknown node '{target}'",
                            rule.pattern
                        ));
                    }
                }
            }
        }

        let reachable = reachable_from(&start, &transitions);
        for node in &order {
            if !reachable.contains(node.as_str()) {
                errors.push(format!("node '{node}' is unreachable from '{start}'"));
            }
        }

        if !errors.is_empty() {
            return Err(BatchError::FlowConfiguration(format!(
                "flow '{name}': {}",
                errors.join("; ")
            )));
        }

        Ok(Flow {
            name,
            start,
            states,
            order,
            transitions,
        })
    }

    fn register(&mut self, state: Arc<dyn FlowState>) -> String {
        let name = state.name().to_string();
        if !self.states.contains_key(&name) {
            self.order.push(name.clone());
            self.states.insert(name.clone(), state);
        }
        name
    }

    fn add_transition(&mut self, from: &str, pattern: &str, target: TransitionTarget) {
        let rules = self.transitions.entry(from.to_string()).or_default();
        if rules.iter().any(|rule| rule.pattern == pattern) {
            self.errors.push(format!(
                "duplicate transition '{pattern}' on node '{from}'"
            ));
            return;
        }
        if rules.iter().any(|rule| rule.pattern == WILDCARD) {
            self.errors.push(format!(
                "transition '{pattern}' on node '{from}' is declared after '*' and would be masked"
            ));
            return;
        }
        rules.push(Transition::new(pattern, target));
    }
}

/// Pending transition opened by [`FlowBuilder::on`]
pub struct TransitionBuilder {
    builder: FlowBuilder,
    pattern: String,
}

impl TransitionBuilder {
    pub fn to(self, state: Arc<dyn FlowState>) -> FlowBuilder {
        let Self {
            mut builder,
            pattern,
        } = self;
        let name = builder.register(state);
        builder.close(&pattern, TransitionTarget::Node(name.clone()));
        builder.cursor = Some(name);
        builder
    }

    /// End the flow as COMPLETED
    pub fn end(self) -> FlowBuilder {
        self.end_with(ExitStatus::completed())
    }

    /// End the flow as COMPLETED with a custom exit status
    pub fn end_with(self, exit_status: impl Into<ExitStatus>) -> FlowBuilder {
        let Self {
            mut builder,
            pattern,
        } = self;
        builder.close(&pattern, TransitionTarget::End(exit_status.into()));
        builder
    }

    pub fn fail(self) -> FlowBuilder {
        let Self {
            mut builder,
            pattern,
        } = self;
        builder.close(&pattern, TransitionTarget::Fail);
        builder
    }

    pub fn stop(self) -> FlowBuilder {
        let Self {
            mut builder,
            pattern,
        } = self;
        builder.close(&pattern, TransitionTarget::Stop);
        builder
    }

    /// Stop the flow; the next launch of the same instance resumes at `state`
    pub fn stop_and_restart(self, state: Arc<dyn FlowState>) -> FlowBuilder {
        let Self {
            mut builder,
            pattern,
        } = self;
        let name = builder.register(state);
        builder.close(&pattern, TransitionTarget::StopAndRestart(name.clone()));
        builder.cursor = Some(name);
        builder
    }
}

impl FlowBuilder {
    fn close(&mut self, pattern: &str, target: TransitionTarget) {
        match self.cursor.clone() {
            Some(from) => self.add_transition(&from, pattern, target),
            None => self
                .errors
                .push(format!("on('{pattern}') called before start")),
        }
    }
}

fn reachable_from<'a>(
    start: &'a str,
    transitions: &'a HashMap<String, Vec<Transition>>,
) -> HashSet<&'a str> {
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        let targets = transitions
            .get(node)
            .into_iter()
            .flatten()
            .filter_map(|rule| rule.target.node());
        for target in targets {
            if seen.insert(target) {
                queue.push_back(target);
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::state::step;
    use crate::step::{RepeatStatus, TaskletStep};

    fn node(name: &str) -> Arc<dyn FlowState> {
        step(Arc::new(TaskletStep::from_fn(name, |_, _| {
            Ok(RepeatStatus::Finished)
        })))
    }

    #[test]
    fn test_sequential_flow() {
        let flow = FlowBuilder::new("seq")
            .start(node("a"))
            .next(node("b"))
            .next(node("c"))
            .build()
            .unwrap();

        assert_eq!(flow.start_node(), "a");
        assert_eq!(flow.node_names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        let rule = flow.resolve("a", &ExitStatus::completed()).unwrap();
        assert_eq!(rule.target, TransitionTarget::Node("b".to_string()));
        assert!(flow.resolve("a", &ExitStatus::failed()).is_none());
        assert!(flow.transitions("c").is_empty());
    }

    #[test]
    fn test_missing_start_rejected() {
        let result = FlowBuilder::new("empty").build();
        assert!(matches!(result, Err(BatchError::FlowConfiguration(_))));
    }

    #[test]
    fn test_duplicate_pattern_rejected() {
        let result = FlowBuilder::new("dup")
            .start(node("first"))
            .on("FAILED")
            .to(node("failure"))
            .from("first")
            .on("FAILED")
            .fail()
            .build();
        let message = result.unwrap_err().to_string();
        assert!(message.contains("duplicate transition 'FAILED'"));
    }

    #[test]
    fn test_pattern_after_wildcard_rejected() {
        let result = FlowBuilder::new("masked")
            .start(node("first"))
            .on("*")
            .to(node("success"))
            .from("first")
            .on("FAILED")
            .to(node("failure"))
            .build();
        let message = result.unwrap_err().to_string();
        assert!(message.contains("declared after '*'"));
    }

    #[test]
    fn test_unknown_target_rejected() {
        let result = FlowBuilder::new("unknown")
            .start(node("first"))
            .from("ghost")
            .on("*")
            .end()
            .build();
        assert!(result.unwrap_err().to_string().contains("unknown node 'ghost'"));
    }

    #[test]
    fn test_unreachable_node_rejected() {
        let result = FlowBuilder::new("island")
            .start(node("first"))
            .on("*")
            .end()
            .from("ghost")
            .on("*")
            .to(node("lonely"))
            .build();
        let message = result.unwrap_err().to_string();
        assert!(message.contains("node 'lonely' is unreachable from 'first'"));
    }

    #[test]
    fn test_terminal_targets() {
        let flow = FlowBuilder::new("terminals")
            .start(node("first"))
            .on("COMPLETED")
            .end()
            .from("first")
            .on("FAILED")
            .fail()
            .from("first")
            .on("SKIPPED")
            .end_with("DONE")
            .from("first")
            .on("*")
            .stop()
            .build()
            .unwrap();

        let target = |code: &str| flow.resolve("first", &ExitStatus::new(code)).unwrap().target.clone();
        assert_eq!(target("COMPLETED"), TransitionTarget::End(ExitStatus::completed()));
        assert_eq!(target("FAILED"), TransitionTarget::Fail);
        assert_eq!(target("SKIPPED"), TransitionTarget::End(ExitStatus::new("DONE")));
        assert_eq!(target("ANYTHING"), TransitionTarget::Stop);
    }

    #[test]
    fn test_stop_and_restart_target_is_reachable() {
        let flow = FlowBuilder::new("restartable")
            .start(node("a"))
            .on("*")
            .stop_and_restart(node("b"))
            .build()
            .unwrap();
        assert!(flow.contains("b"));
    }
}
