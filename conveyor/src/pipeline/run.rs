//! Handle to an executing pipeline.

use super::metrics::{HopMetrics, PipelineMetrics};
use crate::errors::{ConveyorError, ConveyorResult};
use crate::sequence::Sequence;
use futures::future::try_join_all;
use std::fmt;
use std::time::Instant;
use tokio::task::JoinHandle;
use ulid::Ulid;

/// Identifier attached to every pipeline run (ULID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Ulid);

impl RunId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An executing pipeline: its output sequence plus the relay tasks feeding it.
///
/// Read the output to exhaustion, or drop it, before [`join`](Self::join)
/// can complete; `join` drops the output itself, so calling it early simply
/// abandons whatever has not been read yet. The relays then release their
/// inputs and every stage stops after the item it is working on.
pub struct PipelineRun<T> {
    run_id: RunId,
    stages: Vec<String>,
    output: Sequence<T>,
    relays: Vec<JoinHandle<HopMetrics>>,
    span: tracing::Span,
    started: Instant,
}

impl<T> PipelineRun<T> {
    pub(super) fn new(
        run_id: RunId,
        stages: Vec<String>,
        output: Sequence<T>,
        relays: Vec<JoinHandle<HopMetrics>>,
        span: tracing::Span,
        started: Instant,
    ) -> Self {
        Self {
            run_id,
            stages,
            output,
            relays,
            span,
            started,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn stages(&self) -> &[String] {
        &self.stages
    }

    /// Number of relay tasks spawned for this run (zero without a signal).
    pub fn relay_count(&self) -> usize {
        self.relays.len()
    }

    pub fn output(&mut self) -> &mut Sequence<T> {
        &mut self.output
    }

    pub async fn recv(&mut self) -> Option<T> {
        self.output.recv().await
    }

    /// Detach the relay tasks and keep only the output sequence.
    pub fn into_output(self) -> Sequence<T> {
        self.output
    }

    /// Drop the output and wait for every relay task to finish.
    pub async fn join(self) -> ConveyorResult<PipelineMetrics> {
        let PipelineRun {
            run_id,
            stages,
            output,
            relays,
            span,
            started,
        } = self;
        drop(output);

        let hops = try_join_all(relays).await.map_err(|e| {
            let _entered = span.enter();
            tracing::error!(error = %e, "Relay task failed");
            ConveyorError::Worker(format!("relay task failed: {}", e))
        })?;

        Ok(PipelineMetrics {
            run_id,
            stages,
            total_duration_ms: started.elapsed().as_millis(),
            hops,
        })
    }

    /// Read the output to exhaustion, then join the relays.
    pub async fn collect(mut self) -> ConveyorResult<(Vec<T>, PipelineMetrics)> {
        let mut items = Vec::new();
        while let Some(item) = self.output.recv().await {
            items.push(item);
        }
        let metrics = self.join().await?;
        Ok((items, metrics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RelayOutcome;

    #[test]
    fn test_run_ids_are_unique() {
        let a = RunId::new();
        let b = RunId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 26);
    }

    #[tokio::test]
    async fn test_join_reports_panicked_relay() {
        let failing: JoinHandle<HopMetrics> = tokio::spawn(async { panic!("boom") });
        let ok = tokio::spawn(async {
            HopMetrics {
                hop: 0,
                outcome: RelayOutcome::Exhausted,
                forwarded: 0,
                discarded: 0,
                duration_ms: 0,
            }
        });

        let run = PipelineRun::new(
            RunId::new(),
            Vec::new(),
            Sequence::<u8>::produce(Vec::new()),
            vec![ok, failing],
            tracing::Span::none(),
            Instant::now(),
        );

        let err = run.join().await.unwrap_err();
        assert!(matches!(err, ConveyorError::Worker(_)));
    }
}
