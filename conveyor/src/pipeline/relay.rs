//! Cancellation-aware forwarding between two pipeline elements.
//!
//! ```text
//!            ┌──────────── signal fired ────────────┐
//!            │                                      ▼
//! recv ──► forward ──► recv ──► ...      close output, drain input ──► exit
//!   │        │
//!   │        └── consumer gone ──► close output, release input ──► exit
//!   └── input closed ──► close output ──► exit
//! ```
//!
//! Draining keeps an upstream producer that is suspended in `send` from being
//! stranded once the signal has fired. When the consumer leaves instead, the
//! input is released so upstream sends fail and the shutdown travels back up
//! the chain.

use super::metrics::{HopMetrics, RelayOutcome};
use crate::sequence::{DEFAULT_CAPACITY, Sequence, SequenceSender, sequence};
use crate::signal::CancelSignal;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Wrap `input` in a relay honouring `signal`.
///
/// Without a signal the input is returned unchanged. With one, a relay task is
/// spawned and detached; use [`Relay`] directly to keep its report.
pub fn relay<T: Send + 'static>(input: Sequence<T>, signal: Option<&CancelSignal>) -> Sequence<T> {
    match signal {
        None => input,
        Some(signal) => {
            let (relay, output) = Relay::new(0, input, signal.clone(), DEFAULT_CAPACITY);
            relay.spawn();
            output
        }
    }
}

pub struct Relay<T> {
    hop: usize,
    input: Sequence<T>,
    output: SequenceSender<T>,
    signal: CancelSignal,
}

impl<T: Send + 'static> Relay<T> {
    /// Create a relay for `hop` and the sequence it will feed.
    pub fn new(
        hop: usize,
        input: Sequence<T>,
        signal: CancelSignal,
        capacity: usize,
    ) -> (Self, Sequence<T>) {
        let (output, downstream) = sequence(capacity);
        let relay = Self {
            hop,
            input,
            output,
            signal,
        };
        (relay, downstream)
    }

    /// Run the relay on its own task.
    pub fn spawn(self) -> JoinHandle<HopMetrics> {
        let span = tracing::debug_span!("relay", hop = self.hop);
        tokio::spawn(self.run().instrument(span))
    }

    /// Forward until the input is exhausted, the signal fires or the consumer
    /// leaves. Returns only after the output is closed and, on cancellation,
    /// the input has been drained.
    pub async fn run(self) -> HopMetrics {
        let Relay {
            hop,
            mut input,
            output,
            signal,
        } = self;

        let started = Instant::now();
        let mut forwarded = 0;
        let mut discarded = 0;

        let outcome = loop {
            if signal.is_fired() {
                break RelayOutcome::Cancelled;
            }

            let item = tokio::select! {
                _ = signal.fired() => break RelayOutcome::Cancelled,
                _ = output.closed() => break RelayOutcome::ConsumerGone,
                item = input.recv() => item,
            };
            let Some(item) = item else {
                break RelayOutcome::Exhausted;
            };

            tokio::select! {
                _ = signal.fired() => {
                    // The abandoned send drops its item.
                    discarded += 1;
                    break RelayOutcome::Cancelled;
                }
                sent = output.send(item) => match sent {
                    Ok(()) => forwarded += 1,
                    Err(_) => {
                        discarded += 1;
                        break RelayOutcome::ConsumerGone;
                    }
                },
            }
        };

        // Downstream sees end-of-stream as soon as forwarding stops.
        output.close();

        match outcome {
            RelayOutcome::Cancelled => {
                tracing::trace!("Relay draining input");
                discarded += input.drain().await;
            }
            RelayOutcome::ConsumerGone => {
                tracing::trace!("Relay releasing input, consumer is gone");
                drop(input);
            }
            RelayOutcome::Exhausted => {}
        }

        let duration_ms = started.elapsed().as_millis();
        tracing::debug!(?outcome, forwarded, discarded, duration_ms, "Relay finished");

        HopMetrics {
            hop,
            outcome,
            forwarded,
            discarded,
            duration_ms,
        }
    }
}
