//! Pipeline composition.
//!
//! Every stage's input and the final output pass through a relay, so a fired
//! cancellation signal stops forwarding at every hop while the relays drain
//! whatever upstream elements still produce.

use super::metrics::HopMetrics;
use super::relay::Relay;
use super::run::{PipelineRun, RunId};
use super::stage::{BoxedStage, Stage};
use crate::config::PipelineConfig;
use crate::errors::ConveyorResult;
use crate::sequence::Sequence;
use crate::signal::CancelSignal;
use std::time::Instant;
use tokio::task::JoinHandle;

/// Run `input` through `stages`, honouring `signal`.
///
/// With an empty stage list the input is still passed through one relay, so
/// cancellation truncates a zero-stage pipeline as well. Must be called from
/// within a tokio runtime.
///
/// The caller must read the returned sequence to exhaustion or drop it.
/// Holding it unread without firing the signal keeps every stage and relay
/// suspended on backpressure for as long as it is held.
pub fn execute_pipeline<T: Send + 'static>(
    input: Sequence<T>,
    signal: Option<&CancelSignal>,
    stages: Vec<BoxedStage<T, T>>,
) -> Sequence<T> {
    PipelineExecutor::default()
        .execute(input, signal, stages)
        .into_output()
}

/// Executes homogeneous stage lists with a validated configuration.
#[derive(Debug, Clone, Default)]
pub struct PipelineExecutor {
    config: PipelineConfig,
}

impl PipelineExecutor {
    pub fn new(config: PipelineConfig) -> ConveyorResult<Self> {
        config.sanitize()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Wire `stages` behind `input` and start the run.
    pub fn execute<T: Send + 'static>(
        &self,
        input: Sequence<T>,
        signal: Option<&CancelSignal>,
        stages: Vec<BoxedStage<T, T>>,
    ) -> PipelineRun<T> {
        let builder = PipelineBuilder::with_config(input, signal.cloned(), self.config.clone());
        stages
            .into_iter()
            .fold(builder, |builder, stage| builder.pipe(stage))
            .build()
    }
}

/// Fluent pipeline builder with automatic relay wiring.
///
/// Each [`pipe`](Self::pipe) may change the item type:
///
/// ```ignore
/// let run = PipelineBuilder::new(Sequence::produce(1..=5), Some(signal))
///     .pipe(MapStage::sequential(transform::from_fn("double", |v: i32| v * 2)))
///     .pipe(MapStage::sequential(transform::from_fn("render", |v: i32| v.to_string())))
///     .build();
/// let (lines, metrics) = run.collect().await?;
/// ```
pub struct PipelineBuilder<T> {
    run_id: RunId,
    config: PipelineConfig,
    signal: Option<CancelSignal>,
    current: Sequence<T>,
    relays: Vec<JoinHandle<HopMetrics>>,
    stages: Vec<String>,
    span: tracing::Span,
    started: Instant,
}

impl<T: Send + 'static> PipelineBuilder<T> {
    pub fn new(input: Sequence<T>, signal: Option<CancelSignal>) -> Self {
        Self::with_config(input, signal, PipelineConfig::default())
    }

    /// Start a builder with `config`. The configuration is not validated
    /// here; use [`PipelineExecutor::new`] or `PipelineConfig::sanitize`.
    pub fn with_config(
        input: Sequence<T>,
        signal: Option<CancelSignal>,
        config: PipelineConfig,
    ) -> Self {
        let run_id = RunId::new();
        let span = tracing::debug_span!("pipeline", run_id = %run_id, name = %config.name);
        Self {
            run_id,
            config,
            signal,
            current: input,
            relays: Vec::new(),
            stages: Vec::new(),
            span,
            started: Instant::now(),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Append `stage`, preceded by a relay on its input.
    pub fn pipe<O, S>(self, stage: S) -> PipelineBuilder<O>
    where
        O: Send + 'static,
        S: Stage<T, O>,
    {
        let PipelineBuilder {
            run_id,
            config,
            signal,
            current,
            mut relays,
            mut stages,
            span,
            started,
        } = self;

        let hop = stages.len();
        let next = span.in_scope(|| {
            let input = attach_relay(
                current,
                hop,
                signal.as_ref(),
                config.link_capacity,
                &mut relays,
            );
            tracing::debug!(hop, stage = stage.name(), "Attaching stage");
            stage.run(input)
        });
        stages.push(stage.name().to_string());

        PipelineBuilder {
            run_id,
            config,
            signal,
            current: next,
            relays,
            stages,
            span,
            started,
        }
    }

    /// Attach the trailing relay and hand out the running pipeline.
    pub fn build(self) -> PipelineRun<T> {
        let PipelineBuilder {
            run_id,
            config,
            signal,
            current,
            mut relays,
            stages,
            span,
            started,
        } = self;

        let output = span.in_scope(|| {
            let output = attach_relay(
                current,
                stages.len(),
                signal.as_ref(),
                config.link_capacity,
                &mut relays,
            );
            tracing::debug!(
                stages = stages.len(),
                relays = relays.len(),
                "Pipeline assembled"
            );
            output
        });

        PipelineRun::new(run_id, stages, output, relays, span, started)
    }
}

fn attach_relay<T: Send + 'static>(
    input: Sequence<T>,
    hop: usize,
    signal: Option<&CancelSignal>,
    capacity: usize,
    relays: &mut Vec<JoinHandle<HopMetrics>>,
) -> Sequence<T> {
    match signal {
        None => input,
        Some(signal) => {
            let (relay, output) = Relay::new(hop, input, signal.clone(), capacity);
            relays.push(relay.spawn());
            output
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConveyorError;
    use crate::pipeline::{MapStage, RelayOutcome, transform};

    fn add(n: i64) -> BoxedStage<i64, i64> {
        MapStage::sequential(transform::from_fn(format!("add_{}", n), move |v: i64| v + n))
            .boxed()
    }

    #[tokio::test]
    async fn test_zero_stages_passthrough() {
        let output = execute_pipeline(Sequence::produce(vec![1, 2, 3]), None, Vec::new());
        assert_eq!(output.into_vec().await, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_zero_stages_still_relayed_with_signal() {
        let signal = CancelSignal::new();
        let run = PipelineExecutor::default().execute(
            Sequence::produce(0..4i64),
            Some(&signal),
            Vec::new(),
        );
        assert_eq!(run.relay_count(), 1);

        let (items, metrics) = run.collect().await.unwrap();
        assert_eq!(items, vec![0, 1, 2, 3]);
        assert_eq!(metrics.hops.len(), 1);
        assert_eq!(metrics.hops[0].outcome, RelayOutcome::Exhausted);
    }

    #[tokio::test]
    async fn test_one_relay_per_hop() {
        let signal = CancelSignal::new();
        let run = PipelineExecutor::default().execute(
            Sequence::produce(0..10i64),
            Some(&signal),
            vec![add(1), add(10), add(100)],
        );
        assert_eq!(run.relay_count(), 4);
        assert_eq!(run.stages(), ["add_1", "add_10", "add_100"]);

        let (items, metrics) = run.collect().await.unwrap();
        assert_eq!(items, (111..121).collect::<Vec<_>>());
        for hop in 0..4 {
            assert_eq!(metrics.items_forwarded(hop), Some(10));
        }
        assert!(!metrics.was_cancelled());
    }

    #[tokio::test]
    async fn test_builder_changes_item_types() {
        let run = PipelineBuilder::new(Sequence::produce(1..=3u32), Some(CancelSignal::new()))
            .pipe(MapStage::sequential(transform::from_fn("square", |v: u32| {
                u64::from(v * v)
            })))
            .pipe(MapStage::sequential(transform::from_fn("render", |v: u64| {
                format!("#{}", v)
            })))
            .build();

        let (items, metrics) = run.collect().await.unwrap();
        assert_eq!(items, vec!["#1", "#4", "#9"]);
        assert_eq!(metrics.stages, vec!["square", "render"]);
    }

    #[test]
    fn test_executor_rejects_invalid_config() {
        let config = PipelineConfig {
            link_capacity: 0,
            ..Default::default()
        };
        let err = PipelineExecutor::new(config).unwrap_err();
        assert!(matches!(err, ConveyorError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_executor_uses_configured_capacity() {
        let config = PipelineConfig {
            link_capacity: 16,
            ..Default::default()
        };
        let executor = PipelineExecutor::new(config).unwrap();
        assert_eq!(executor.config().link_capacity, 16);

        let signal = CancelSignal::new();
        let mut run = executor.execute(Sequence::produce(0..64i64), Some(&signal), vec![add(0)]);
        assert_eq!(run.recv().await, Some(0));
        let metrics = run.join().await.unwrap();
        assert_eq!(metrics.hops.len(), 2);
    }
}
