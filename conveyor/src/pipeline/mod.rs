//! Staged pipeline execution.
//!
//! ## Architecture
//!
//! ```text
//! producer ─► Relay₀ ─► Stage₁ ─► Relay₁ ─► Stage₂ ─► … ─► Stageₙ ─► Relayₙ ─► consumer
//!
//! - Stage: user transformation from one Sequence to another (own tasks)
//! - Relay: transparent forwarder enforcing the cancellation contract
//! - Pipeline: wires N stages and N + 1 relays, exposes the last Sequence
//! ```
//!
//! Every hop is a bounded [`Sequence`](crate::Sequence), so a slow consumer
//! pushes back all the way to the producer. When the
//! [`CancelSignal`](crate::CancelSignal) fires, every relay closes its output
//! and drains its input, which unblocks any element still sending into it.
//! When the consumer drops the output instead, each relay releases its input
//! in turn, so upstream sends fail and the chain winds down from the back.
//! A stage that ignores cancellation is starved on its input and ignored on
//! its output; its own tasks remain its responsibility.
//!
//! ## Example
//!
//! ```ignore
//! use conveyor::{CancelSignal, MapStage, Sequence, Stage, execute_pipeline, transform};
//!
//! let signal = CancelSignal::new();
//! signal.fire_after(Duration::from_secs(5));
//!
//! let output = execute_pipeline(
//!     Sequence::produce(1..=5),
//!     Some(&signal),
//!     vec![
//!         MapStage::sequential(transform::from_fn("double", |v: i64| v * 2)).boxed(),
//!         MapStage::parallel(4, transform::from_fn("offset", |v: i64| v + 100)).boxed(),
//!     ],
//! );
//! let results = output.into_vec().await;
//! ```

mod metrics;
#[allow(clippy::module_inception)]
mod pipeline;
mod relay;
mod run;
mod stage;
pub mod transform;

pub use metrics::{HopMetrics, PipelineMetrics, RelayOutcome};
pub use pipeline::{PipelineBuilder, PipelineExecutor, execute_pipeline};
pub use relay::{Relay, relay};
pub use run::{PipelineRun, RunId};
pub use stage::{BoxedStage, ExecutionMode, FnStage, MapStage, Stage, stage_fn};
pub use transform::{BoxedTransform, Transform};
