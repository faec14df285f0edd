//! # Chunk Engine
//!
//! Drives read → process → write cycles. Each chunk starts a fresh
//! completion-policy context, reads until the policy reports the chunk full
//! or the reader is exhausted, and hands the buffered items to the writer in
//! a single call. A writer error rejects the whole chunk and fails the step.
//!
//! Every item the reader emits is either written exactly once or counted as
//! filtered by the processor.

use super::completion_policy::CompletionPolicy;
use super::item::{ItemProcessor, PassThroughItemProcessor, ReaderFactory, WriterFactory};
use super::{RepeatStatus, Step, StepContext, StepExecutionListener};
use crate::constants::events;
use crate::error::{BatchError, Result};
use crate::logging::log_chunk_operation;
use crate::models::StepExecution;
use async_trait::async_trait;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

pub struct ChunkStep<I, O = I> {
    name: String,
    policy: Arc<dyn CompletionPolicy>,
    reader_factory: ReaderFactory<I>,
    processor: Arc<dyn ItemProcessor<I, O>>,
    writer_factory: WriterFactory<O>,
    listeners: Vec<Arc<dyn StepExecutionListener>>,
}

impl<T: Send + 'static> ChunkStep<T, T> {
    /// Chunk step without a processor
    pub fn new(
        name: impl Into<String>,
        policy: Arc<dyn CompletionPolicy>,
        reader_factory: ReaderFactory<T>,
        writer_factory: WriterFactory<T>,
    ) -> Self {
        Self::with_processor(
            name,
            policy,
            reader_factory,
            Arc::new(PassThroughItemProcessor::new()),
            writer_factory,
        )
    }
}

impl<I: Send + 'static, O: Send + 'static> ChunkStep<I, O> {
    pub fn with_processor(
        name: impl Into<String>,
        policy: Arc<dyn CompletionPolicy>,
        reader_factory: ReaderFactory<I>,
        processor: Arc<dyn ItemProcessor<I, O>>,
        writer_factory: WriterFactory<O>,
    ) -> Self {
        Self {
            name: name.into(),
            policy,
            reader_factory,
            processor,
            writer_factory,
            listeners: Vec::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn StepExecutionListener>) -> Self {
        self.listeners.push(listener);
        self
    }
}

impl<I, O> fmt::Debug for ChunkStep<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkStep")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish()
    }
}

#[async_trait]
impl<I: Send + 'static, O: Send + 'static> Step for ChunkStep<I, O> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, execution: &mut StepExecution, context: &StepContext) -> Result<()> {
        let mut reader = (self.reader_factory)(context)?;
        let mut writer = (self.writer_factory)(context)?;

        loop {
            let mut policy_context = self.policy.start();
            let chunk_started = Instant::now();
            let mut buffer = Vec::new();
            let mut read_in_chunk = 0usize;
            let mut exhausted = false;

            loop {
                let Some(item) = reader.read().await? else {
                    exhausted = true;
                    break;
                };
                read_in_chunk += 1;
                execution.read_count += 1;

                match self.processor.process(item).await? {
                    Some(output) => buffer.push(output),
                    None => execution.filter_count += 1,
                }

                self.policy.update(&mut policy_context);
                if self
                    .policy
                    .is_complete_with(&policy_context, RepeatStatus::Continuable)
                {
                    break;
                }
            }

            if read_in_chunk > 0 {
                let chunk_size = buffer.len();
                if chunk_size > 0 {
                    writer
                        .write(buffer)
                        .await
                        .map_err(|error| BatchError::WriterFailure {
                            step: self.name.clone(),
                            reason: error.to_string(),
                        })?;
                }
                execution.write_count += chunk_size as u64;
                execution.commit_count += 1;

                let elapsed_ms = chunk_started.elapsed().as_millis();
                log_chunk_operation(&self.name, chunk_size, elapsed_ms, exhausted);
                context.events().publish(
                    events::CHUNK_COMMITTED,
                    json!({
                        "execution_id": context.execution_id(),
                        "step_name": self.name,
                        "chunk_size": chunk_size,
                        "elapsed_ms": elapsed_ms as u64,
                    }),
                );
            }

            if exhausted {
                return Ok(());
            }
        }
    }

    fn listeners(&self) -> &[Arc<dyn StepExecutionListener>] {
        &self.listeners
    }
}
