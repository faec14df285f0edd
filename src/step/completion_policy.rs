//! # Completion Policies
//!
//! A completion policy decides when the in-flight chunk is full. Each chunk
//! begins with [`CompletionPolicy::start`], which returns fresh per-chunk
//! state; the chunk engine calls [`CompletionPolicy::update`] once per item
//! and stops reading once [`CompletionPolicy::is_complete`] is true.
//!
//! Policies are pure decision logic and stay synchronous.

use super::RepeatStatus;
use crate::utils::RandomSource;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-chunk counters owned by the chunk engine for one chunk
#[derive(Debug, Clone)]
pub struct RepeatContext {
    pub processed: usize,
    pub started_at: Instant,
    /// Threshold chosen at `start`, for policies that have one
    pub threshold: Option<usize>,
    /// Sub-policy state for composites, index-aligned with the policies
    pub children: Vec<RepeatContext>,
}

impl RepeatContext {
    pub fn new(threshold: Option<usize>) -> Self {
        Self {
            processed: 0,
            started_at: Instant::now(),
            threshold,
            children: Vec::new(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

pub trait CompletionPolicy: Send + Sync + fmt::Debug {
    /// Fresh state for a new chunk
    fn start(&self) -> RepeatContext;

    /// Record one processed item
    fn update(&self, context: &mut RepeatContext) {
        context.processed += 1;
    }

    fn is_complete(&self, context: &RepeatContext) -> bool;

    /// Completion given the status of the last read; end of input always
    /// completes the chunk
    fn is_complete_with(&self, context: &RepeatContext, last: RepeatStatus) -> bool {
        !last.is_continuable() || self.is_complete(context)
    }
}

/// Complete after a fixed number of items
#[derive(Debug, Clone)]
pub struct SimpleCompletionPolicy {
    chunk_size: usize,
}

impl SimpleCompletionPolicy {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl CompletionPolicy for SimpleCompletionPolicy {
    fn start(&self) -> RepeatContext {
        RepeatContext::new(Some(self.chunk_size))
    }

    fn is_complete(&self, context: &RepeatContext) -> bool {
        context.processed >= self.chunk_size
    }
}

/// Complete once the chunk has been open for longer than `timeout`
#[derive(Debug, Clone)]
pub struct TimeoutTerminationPolicy {
    timeout: Duration,
}

impl TimeoutTerminationPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CompletionPolicy for TimeoutTerminationPolicy {
    fn start(&self) -> RepeatContext {
        RepeatContext::new(None)
    }

    fn is_complete(&self, context: &RepeatContext) -> bool {
        context.elapsed() >= self.timeout
    }
}

/// Chunk size drawn from `[1, max]` at the start of every chunk
pub struct RandomChunkSizePolicy {
    max: usize,
    source: Arc<dyn RandomSource>,
}

impl RandomChunkSizePolicy {
    pub fn new(max: usize, source: Arc<dyn RandomSource>) -> Self {
        Self {
            max: max.max(1),
            source,
        }
    }
}

impl fmt::Debug for RandomChunkSizePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomChunkSizePolicy")
            .field("max", &self.max)
            .finish()
    }
}

impl CompletionPolicy for RandomChunkSizePolicy {
    fn start(&self) -> RepeatContext {
        let threshold = self.source.next_in_range(1, self.max as u64) as usize;
        tracing::debug!(chunk_size = threshold, "Random chunk size chosen");
        RepeatContext::new(Some(threshold))
    }

    fn is_complete(&self, context: &RepeatContext) -> bool {
        context
            .threshold
            .is_some_and(|threshold| context.processed >= threshold)
    }
}

/// Complete as soon as any sub-policy completes; an empty composite completes
/// after every item
#[derive(Debug, Clone)]
pub struct CompositeCompletionPolicy {
    policies: Vec<Arc<dyn CompletionPolicy>>,
}

impl CompositeCompletionPolicy {
    pub fn new(policies: Vec<Arc<dyn CompletionPolicy>>) -> Self {
        Self { policies }
    }
}

impl CompletionPolicy for CompositeCompletionPolicy {
    fn start(&self) -> RepeatContext {
        let mut context = RepeatContext::new(None);
        context.children = self.policies.iter().map(|policy| policy.start()).collect();
        context
    }

    fn update(&self, context: &mut RepeatContext) {
        context.processed += 1;
        for (policy, child) in self.policies.iter().zip(context.children.iter_mut()) {
            policy.update(child);
        }
    }

    fn is_complete(&self, context: &RepeatContext) -> bool {
        // with nothing to consult every item closes its own chunk
        self.policies.is_empty()
            || self
                .policies
                .iter()
                .zip(context.children.iter())
                .any(|(policy, child)| policy.is_complete(child))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ScriptedRandomSource;

    fn run_items(policy: &dyn CompletionPolicy, items: usize) -> RepeatContext {
        let mut context = policy.start();
        for _ in 0..items {
            policy.update(&mut context);
        }
        context
    }

    #[test]
    fn test_simple_policy_threshold() {
        let policy = SimpleCompletionPolicy::new(3);
        assert!(!policy.is_complete(&run_items(&policy, 2)));
        assert!(policy.is_complete(&run_items(&policy, 3)));
    }

    #[test]
    fn test_end_of_input_forces_completion() {
        let policy = SimpleCompletionPolicy::new(100);
        let context = run_items(&policy, 1);
        assert!(!policy.is_complete_with(&context, RepeatStatus::Continuable));
        assert!(policy.is_complete_with(&context, RepeatStatus::Finished));
    }

    #[test]
    fn test_random_threshold_rerolled_each_start() {
        let source = Arc::new(ScriptedRandomSource::new(vec![2, 7]));
        let policy = RandomChunkSizePolicy::new(20, source);
        assert_eq!(policy.start().threshold, Some(2));
        assert_eq!(policy.start().threshold, Some(7));
        assert_eq!(policy.start().threshold, Some(2));
    }

    #[test]
    fn test_random_threshold_never_zero() {
        let source = Arc::new(ScriptedRandomSource::new(vec![0]));
        let policy = RandomChunkSizePolicy::new(20, source);
        let context = policy.start();
        assert_eq!(context.threshold, Some(1));
        assert!(!policy.is_complete(&context));
    }

    #[test]
    fn test_timeout_policy() {
        let expired = TimeoutTerminationPolicy::new(Duration::ZERO);
        assert!(expired.is_complete(&expired.start()));

        let long = TimeoutTerminationPolicy::new(Duration::from_secs(3600));
        assert!(!long.is_complete(&run_items(&long, 1000)));
    }

    #[test]
    fn test_composite_is_first_completes_wins() {
        let policy = CompositeCompletionPolicy::new(vec![
            Arc::new(TimeoutTerminationPolicy::new(Duration::from_secs(3600))),
            Arc::new(SimpleCompletionPolicy::new(5)),
        ]);
        assert!(!policy.is_complete(&run_items(&policy, 4)));
        assert!(policy.is_complete(&run_items(&policy, 5)));

        let timed_out = CompositeCompletionPolicy::new(vec![
            Arc::new(TimeoutTerminationPolicy::new(Duration::ZERO)),
            Arc::new(SimpleCompletionPolicy::new(5)),
        ]);
        assert!(timed_out.is_complete(&run_items(&timed_out, 1)));
    }

    #[test]
    fn test_empty_composite_closes_chunk_per_item() {
        let policy = CompositeCompletionPolicy::new(Vec::new());
        assert!(policy.is_complete(&run_items(&policy, 1)));
        assert!(policy.is_complete_with(&run_items(&policy, 1), RepeatStatus::Continuable));
    }
}
