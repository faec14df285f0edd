//! Item collaborators consumed by the chunk engine.

use super::StepContext;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;

/// Lazy, finite item source. `Ok(None)` signals end of stream.
#[async_trait]
pub trait ItemReader<T: Send>: Send {
    async fn read(&mut self) -> Result<Option<T>>;
}

/// Transforms one item; `Ok(None)` filters the item out of the chunk
#[async_trait]
pub trait ItemProcessor<I: Send + 'static, O: Send + 'static>: Send + Sync {
    async fn process(&self, item: I) -> Result<Option<O>>;
}

/// Receives one whole chunk per call. An error rejects the whole chunk.
#[async_trait]
pub trait ItemWriter<T: Send + 'static>: Send {
    async fn write(&mut self, items: Vec<T>) -> Result<()>;
}

/// Builds a reader for one step run from the bound context
pub type ReaderFactory<T> =
    Arc<dyn Fn(&StepContext) -> Result<Box<dyn ItemReader<T>>> + Send + Sync>;

/// Builds a writer for one step run from the bound context
pub type WriterFactory<T> =
    Arc<dyn Fn(&StepContext) -> Result<Box<dyn ItemWriter<T>>> + Send + Sync>;

/// Reader draining an in-memory list
#[derive(Debug, Clone)]
pub struct ListItemReader<T> {
    items: VecDeque<T>,
}

impl<T> ListItemReader<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

#[async_trait]
impl<T: Send> ItemReader<T> for ListItemReader<T> {
    async fn read(&mut self) -> Result<Option<T>> {
        Ok(self.items.pop_front())
    }
}

/// Processor that forwards every item unchanged
#[derive(Debug)]
pub struct PassThroughItemProcessor<T> {
    _marker: PhantomData<fn(T) -> T>,
}

impl<T> PassThroughItemProcessor<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for PassThroughItemProcessor<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Send + 'static> ItemProcessor<T, T> for PassThroughItemProcessor<T> {
    async fn process(&self, item: T) -> Result<Option<T>> {
        Ok(Some(item))
    }
}

/// Adapter turning a synchronous closure into an [`ItemWriter`]
pub struct FnItemWriter<F> {
    body: F,
}

impl<F> FnItemWriter<F> {
    pub fn new(body: F) -> Self {
        Self { body }
    }
}

#[async_trait]
impl<T, F> ItemWriter<T> for FnItemWriter<F>
where
    T: Send + 'static,
    F: FnMut(Vec<T>) -> Result<()> + Send,
{
    async fn write(&mut self, items: Vec<T>) -> Result<()> {
        (self.body)(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_reader_drains_in_order() {
        let mut reader = ListItemReader::new(vec![1, 2]);
        assert_eq!(reader.read().await.unwrap(), Some(1));
        assert_eq!(reader.read().await.unwrap(), Some(2));
        assert_eq!(reader.read().await.unwrap(), None);
        assert_eq!(reader.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fn_writer_receives_batch() {
        let mut seen = Vec::new();
        {
            let mut writer = FnItemWriter::new(|items: Vec<u32>| {
                seen.extend(items);
                Ok(())
            });
            writer.write(vec![1, 2, 3]).await.unwrap();
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
