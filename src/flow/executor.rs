//! # Flow Execution
//!
//! Walks a [`Flow`] one node at a time. Nodes never run concurrently: each
//! node's exit status picks the next transition.
//!
//! Terminal handling:
//! - an explicit `end`, `fail`, `stop` or `stop_and_restart` transition ends
//!   the flow with the matching status
//! - a node without transitions ends the flow with its own exit status
//!   (custom codes end as COMPLETED)
//! - a node with transitions but no match escalates FAILED and STOPPED exit
//!   statuses to the flow; any other unmatched code is a configuration error
//!
//! A stop request is observed at node boundaries. The outcome records the
//! node a restart should resume from.

use super::transition::TransitionTarget;
use super::Flow;
use crate::error::{BatchError, Result};
use crate::models::{ExitStatus, JobExecution};
use crate::repository::JobRepository;
use crate::state_machine::{BatchStatus, NodeState};
use crate::step::StepContext;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Aggregate result of running a flow
#[derive(Debug, Clone, PartialEq)]
pub struct FlowOutcome {
    /// COMPLETED, FAILED or STOPPED
    pub status: BatchStatus,
    pub exit_status: ExitStatus,
    /// Node a relaunch resumes at; set for FAILED and STOPPED outcomes
    pub resume_from: Option<String>,
    pub failure_cause: Option<String>,
    pub node_states: HashMap<String, NodeState>,
}

impl FlowOutcome {
    fn finished(
        status: BatchStatus,
        exit_status: ExitStatus,
        resume_from: Option<String>,
        node_states: HashMap<String, NodeState>,
    ) -> Self {
        Self {
            status,
            exit_status,
            resume_from,
            failure_cause: None,
            node_states,
        }
    }

    fn with_failure_cause(mut self, cause: impl Into<String>) -> Self {
        self.failure_cause = Some(cause.into());
        self
    }
}

#[derive(Default)]
pub struct FlowExecutor {
    repository: Option<Arc<dyn JobRepository>>,
}

impl FlowExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every step execution to `repository` as soon as it finishes
    pub fn with_repository(repository: Arc<dyn JobRepository>) -> Self {
        Self {
            repository: Some(repository),
        }
    }

    /// Run `flow` from `start_at` (or its start node) until a terminal outcome
    #[instrument(skip(self, flow, execution, context), fields(flow = %flow.name(), execution_id = %execution.execution_id))]
    pub async fn execute(
        &self,
        flow: &Flow,
        start_at: Option<&str>,
        execution: &mut JobExecution,
        context: &StepContext,
    ) -> Result<FlowOutcome> {
        let mut current = start_at.unwrap_or(flow.start_node()).to_string();
        if !flow.contains(&current) {
            return Err(BatchError::FlowConfiguration(format!(
                "flow '{}' has no node '{current}' to start from",
                flow.name()
            )));
        }
        if start_at.is_some() {
            info!(node = %current, "Resuming flow from recorded node");
        }

        let mut node_states: HashMap<String, NodeState> = flow
            .node_names()
            .map(|name| (name.to_string(), NodeState::Pending))
            .collect();

        loop {
            if context.is_stop_requested() {
                info!(node = %current, "Stop requested; flow stopping at node boundary");
                return Ok(FlowOutcome::finished(
                    BatchStatus::Stopped,
                    ExitStatus::stopped(),
                    Some(current),
                    node_states,
                ));
            }

            let state = flow.state(&current).ok_or_else(|| {
                BatchError::FlowConfiguration(format!(
                    "flow '{}' has no node '{current}'",
                    flow.name()
                ))
            })?;

            node_states.insert(current.clone(), NodeState::Running);
            let recorded = execution.step_executions.len();
            let exit_status = state.handle(execution, context).await?;
            self.record_steps(execution, recorded).await;

            node_states.insert(current.clone(), node_state_for(&exit_status));
            debug!(node = %current, exit_status = %exit_status, "Flow node finished");

            let Some(transition) = flow.resolve(&current, &exit_status) else {
                return Self::unmatched(flow, current, exit_status, execution, node_states);
            };

            match &transition.target {
                TransitionTarget::Node(next) => {
                    debug!(from = %current, to = %next, pattern = %transition.pattern, "Following transition");
                    current = next.clone();
                }
                TransitionTarget::End(end_status) => {
                    return Ok(FlowOutcome::finished(
                        BatchStatus::Completed,
                        end_status.clone(),
                        None,
                        node_states,
                    ));
                }
                TransitionTarget::Fail => {
                    let cause = last_failure_cause(execution).unwrap_or_else(|| {
                        format!("flow failed at node '{current}' with exit status {exit_status}")
                    });
                    return Ok(FlowOutcome::finished(
                        BatchStatus::Failed,
                        ExitStatus::failed(),
                        Some(current),
                        node_states,
                    )
                    .with_failure_cause(cause));
                }
                TransitionTarget::Stop => {
                    return Ok(FlowOutcome::finished(
                        BatchStatus::Stopped,
                        ExitStatus::stopped(),
                        Some(current),
                        node_states,
                    ));
                }
                TransitionTarget::StopAndRestart(restart) => {
                    return Ok(FlowOutcome::finished(
                        BatchStatus::Stopped,
                        ExitStatus::stopped(),
                        Some(restart.clone()),
                        node_states,
                    ));
                }
            }
        }
    }

    fn unmatched(
        flow: &Flow,
        current: String,
        exit_status: ExitStatus,
        execution: &JobExecution,
        node_states: HashMap<String, NodeState>,
    ) -> Result<FlowOutcome> {
        let implicit_end = flow.transitions(&current).is_empty();
        match exit_status.terminal_status() {
            BatchStatus::Failed => {
                let cause = last_failure_cause(execution).unwrap_or_else(|| {
                    format!("node '{current}' finished with exit status {exit_status}")
                });
                if !implicit_end {
                    warn!(node = %current, "No transition for FAILED; escalating to flow");
                }
                Ok(
                    FlowOutcome::finished(BatchStatus::Failed, exit_status, Some(current), node_states)
                        .with_failure_cause(cause),
                )
            }
            BatchStatus::Stopped => Ok(FlowOutcome::finished(
                BatchStatus::Stopped,
                exit_status,
                Some(current),
                node_states,
            )),
            _ if implicit_end => Ok(FlowOutcome::finished(
                BatchStatus::Completed,
                exit_status,
                None,
                node_states,
            )),
            _ => Err(BatchError::FlowConfiguration(format!(
                "no transition from node '{current}' in flow '{}' matches exit status {exit_status}",
                flow.name()
            ))),
        }
    }

    async fn record_steps(&self, execution: &JobExecution, from: usize) {
        let Some(repository) = &self.repository else {
            return;
        };
        for step_execution in execution.step_executions.iter().skip(from) {
            if let Err(error) = repository
                .record_step_execution(execution.execution_id, step_execution)
                .await
            {
                warn!(step = %step_execution.step_name, error = %error, "Failed to record step execution");
            }
        }
    }
}

fn node_state_for(exit_status: &ExitStatus) -> NodeState {
    match exit_status.terminal_status() {
        BatchStatus::Failed => NodeState::Failed,
        BatchStatus::Stopped => NodeState::Stopped,
        _ => NodeState::Completed,
    }
}

fn last_failure_cause(execution: &JobExecution) -> Option<String> {
    execution
        .last_step_execution()
        .and_then(|step| step.failure_cause.clone())
}
