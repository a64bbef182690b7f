//! conveyor: a concurrent staged-pipeline execution engine.
//!
//! Items flow from a producer through a chain of stages, each running as its
//! own set of tokio tasks, so items at different depths are in flight at the
//! same time. A relay sits between every two elements and enforces prompt,
//! leak-free termination when a [`CancelSignal`] fires or the input ends.
//!
//! - [`sequence`]: bounded single-producer/single-consumer links
//! - [`signal`]: one-shot cancellation broadcast
//! - [`pipeline`]: relays, stages and the composer
//! - [`config`], [`logging`], [`errors`]: ambient plumbing

pub mod config;
pub mod errors;
pub mod logging;
pub mod pipeline;
pub mod sequence;
pub mod signal;

pub use config::PipelineConfig;
pub use errors::{ConveyorError, ConveyorResult, SendError};
pub use logging::{LogTarget, init_logging};
pub use pipeline::transform;
pub use pipeline::{
    BoxedStage, BoxedTransform, ExecutionMode, FnStage, HopMetrics, MapStage, PipelineBuilder,
    PipelineExecutor, PipelineMetrics, PipelineRun, Relay, RelayOutcome, RunId, Stage, Transform,
    execute_pipeline, relay, stage_fn,
};
pub use sequence::{Sequence, SequenceSender, sequence};
pub use signal::CancelSignal;
