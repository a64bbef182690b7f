use crate::pipeline::RunId;

/// Why a relay stopped forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Upstream closed; every item was forwarded.
    Exhausted,
    /// The cancellation signal fired; the relay drained its input.
    Cancelled,
    /// The downstream consumer went away; the relay released its input.
    ConsumerGone,
}

#[derive(Debug, Clone)]
pub struct HopMetrics {
    /// Position in the chain: hop `i` feeds stage `i + 1`, the last hop feeds the consumer.
    pub hop: usize,
    pub outcome: RelayOutcome,
    pub forwarded: u64,
    /// Items dropped by an abandoned forward or by draining.
    pub discarded: u64,
    pub duration_ms: u128,
}

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub run_id: RunId,
    pub stages: Vec<String>,
    pub total_duration_ms: u128,
    /// One entry per relay, ordered by hop. Empty when the run had no signal.
    pub hops: Vec<HopMetrics>,
}

impl PipelineMetrics {
    pub fn hop(&self, hop: usize) -> Option<&HopMetrics> {
        self.hops.iter().find(|metrics| metrics.hop == hop)
    }

    pub fn items_forwarded(&self, hop: usize) -> Option<u64> {
        self.hop(hop).map(|metrics| metrics.forwarded)
    }

    pub fn total_discarded(&self) -> u64 {
        self.hops.iter().map(|metrics| metrics.discarded).sum()
    }

    pub fn was_cancelled(&self) -> bool {
        self.hops
            .iter()
            .any(|metrics| metrics.outcome == RelayOutcome::Cancelled)
    }

    pub fn log_summary(&self) {
        tracing::info!(
            run_id = %self.run_id,
            stages = self.stages.len(),
            cancelled = self.was_cancelled(),
            discarded = self.total_discarded(),
            total_duration_ms = self.total_duration_ms,
            "Pipeline run finished"
        );
        for hop in &self.hops {
            tracing::debug!(
                run_id = %self.run_id,
                hop = hop.hop,
                outcome = ?hop.outcome,
                forwarded = hop.forwarded,
                discarded = hop.discarded,
                duration_ms = hop.duration_ms,
                "Hop summary"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hop(hop: usize, outcome: RelayOutcome, forwarded: u64, discarded: u64) -> HopMetrics {
        HopMetrics {
            hop,
            outcome,
            forwarded,
            discarded,
            duration_ms: 0,
        }
    }

    #[test]
    fn test_aggregates_over_hops() {
        let metrics = PipelineMetrics {
            run_id: RunId::new(),
            stages: vec!["double".into()],
            total_duration_ms: 12,
            hops: vec![
                hop(0, RelayOutcome::Cancelled, 3, 4),
                hop(1, RelayOutcome::Cancelled, 1, 2),
            ],
        };

        assert_eq!(metrics.items_forwarded(0), Some(3));
        assert_eq!(metrics.items_forwarded(2), None);
        assert_eq!(metrics.total_discarded(), 6);
        assert!(metrics.was_cancelled());
    }

    #[test]
    fn test_consumer_gone_is_not_cancellation() {
        let metrics = PipelineMetrics {
            run_id: RunId::new(),
            stages: Vec::new(),
            total_duration_ms: 0,
            hops: vec![hop(0, RelayOutcome::ConsumerGone, 0, 1)],
        };
        assert!(!metrics.was_cancelled());
    }
}
