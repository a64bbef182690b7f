//! Stage definition for staged pipelines.
//!
//! A stage turns one input sequence into one output sequence. It owns the
//! producer side of its output and must close it (drop the sender) once it
//! stops producing. It may stop reading its input early; the relay in front
//! of it keeps the upstream producer from blocking forever.

use super::transform::{BoxedTransform, Transform};
use crate::sequence::{DEFAULT_CAPACITY, Sequence, sequence};
use futures::StreamExt;
use futures::stream::BoxStream;
use std::sync::Arc;
use tracing::Instrument;

/// A transformation from one sequence into another.
pub trait Stage<I, O>: Send + Sync {
    /// Start the stage over `input` and return its output.
    ///
    /// Called once per pipeline run, from within a tokio runtime. Work is
    /// expected to happen on spawned tasks; `run` itself should return
    /// promptly.
    fn run(&self, input: Sequence<I>) -> Sequence<O>;

    /// Human-readable name for logging and metrics.
    fn name(&self) -> &str;

    fn boxed(self) -> BoxedStage<I, O>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

pub type BoxedStage<I, O> = Box<dyn Stage<I, O>>;

impl<I, O> Stage<I, O> for BoxedStage<I, O> {
    fn run(&self, input: Sequence<I>) -> Sequence<O> {
        (**self).run(input)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Closure-backed stage, see [`stage_fn`].
pub struct FnStage<F> {
    name: String,
    f: F,
}

/// Build a stage from a closure over sequences.
///
/// ```ignore
/// let passthrough = stage_fn("passthrough", |mut input: Sequence<u32>| {
///     let (tx, out) = sequence(1);
///     tokio::spawn(async move {
///         while let Some(v) = input.recv().await {
///             if tx.send(v).await.is_err() {
///                 break;
///             }
///         }
///     });
///     out
/// });
/// ```
pub fn stage_fn<I, O, F>(name: impl Into<String>, f: F) -> FnStage<F>
where
    F: Fn(Sequence<I>) -> Sequence<O> + Send + Sync,
{
    FnStage {
        name: name.into(),
        f,
    }
}

impl<I, O, F> Stage<I, O> for FnStage<F>
where
    F: Fn(Sequence<I>) -> Sequence<O> + Send + Sync,
{
    fn run(&self, input: Sequence<I>) -> Sequence<O> {
        (self.f)(input)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// How a [`MapStage`] schedules its transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One item at a time, order preserved.
    Sequential,
    /// Up to `workers` items at once, emitted as they complete.
    Parallel,
    /// Up to `workers` items at once, emitted in input order.
    ParallelOrdered,
}

/// A stage applying a [`Transform`] to every item.
pub struct MapStage<I, O> {
    transform: BoxedTransform<I, O>,
    execution: ExecutionMode,
    workers: usize,
    capacity: usize,
}

impl<I, O> MapStage<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Create a stage that transforms items one at a time.
    pub fn sequential(transform: impl Transform<I, O> + 'static) -> Self {
        Self::with_mode(ExecutionMode::Sequential, 1, transform)
    }

    /// Create a stage running up to `workers` transforms concurrently,
    /// emitting results in completion order.
    pub fn parallel(workers: usize, transform: impl Transform<I, O> + 'static) -> Self {
        Self::with_mode(ExecutionMode::Parallel, workers, transform)
    }

    /// Like [`parallel`](Self::parallel) but emitting results in input order.
    pub fn parallel_ordered(workers: usize, transform: impl Transform<I, O> + 'static) -> Self {
        Self::with_mode(ExecutionMode::ParallelOrdered, workers, transform)
    }

    fn with_mode(
        execution: ExecutionMode,
        workers: usize,
        transform: impl Transform<I, O> + 'static,
    ) -> Self {
        Self {
            transform: Arc::new(transform),
            execution,
            workers: workers.max(1),
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Set the capacity of the stage's output sequence.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn execution(&self) -> ExecutionMode {
        self.execution
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl<I, O> Stage<I, O> for MapStage<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn run(&self, input: Sequence<I>) -> Sequence<O> {
        let (output, downstream) = sequence(self.capacity);
        let span = tracing::debug_span!("stage", stage = %self.transform.name());
        let transform = Arc::clone(&self.transform);
        let execution = self.execution;
        let workers = self.workers;

        let worker = async move {
            let applied = input.map(move |item| {
                let transform = Arc::clone(&transform);
                async move { transform.apply(item).await }
            });
            let mut results: BoxStream<'static, O> = match execution {
                ExecutionMode::Sequential => applied.buffered(1).boxed(),
                ExecutionMode::Parallel => applied.buffer_unordered(workers).boxed(),
                ExecutionMode::ParallelOrdered => applied.buffered(workers).boxed(),
            };

            let mut emitted: u64 = 0;
            while let Some(result) = results.next().await {
                if output.send(result).await.is_err() {
                    tracing::debug!(emitted, "Stage consumer is gone, stopping early");
                    return;
                }
                emitted += 1;
            }
            tracing::trace!(emitted, "Stage input exhausted");
        };

        tokio::spawn(worker.instrument(span));
        downstream
    }

    fn name(&self) -> &str {
        self.transform.name()
    }
}
