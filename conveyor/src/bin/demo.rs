//! conveyor-demo: push a range of integers through a delayed four-stage chain
//! (identity, ×2, +100, to-string) and print every result line.

use anyhow::{Context, Result};
use clap::Parser;
use conveyor::{
    CancelSignal, LogTarget, MapStage, PipelineBuilder, PipelineConfig, Sequence, init_logging,
    transform,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Parser)]
#[command(
    name = "conveyor-demo",
    about = "Run a delayed four-stage pipeline over 1..=N"
)]
struct Args {
    /// Number of integers fed into the pipeline.
    #[arg(long, default_value_t = 5)]
    items: u64,

    /// Time each stage holds an item, in milliseconds.
    #[arg(long, default_value_t = 100)]
    stage_delay_ms: u64,

    /// Fire the cancellation signal after this many milliseconds.
    #[arg(long)]
    cancel_after_ms: Option<u64>,

    /// Items each stage processes concurrently (output order is kept).
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Override the relay link capacity.
    #[arg(long)]
    link_capacity: Option<usize>,

    /// JSON pipeline configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn delayed<I, O, F>(name: &str, delay: Duration, workers: usize, f: F) -> MapStage<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> O + Copy + Send + Sync + 'static,
{
    let transform = transform::from_async_fn(name, move |item: I| async move {
        tokio::time::sleep(delay).await;
        f(item)
    });
    if workers > 1 {
        MapStage::parallel_ordered(workers, transform)
    } else {
        MapStage::sequential(transform)
    }
}

// Saturating, since `--items` is unbounded.
fn double(v: u64) -> u64 {
    v.saturating_mul(2)
}

fn add_offset(v: u64) -> u64 {
    v.saturating_add(100)
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let mut config = config.with_env_overrides()?;
    if let Some(capacity) = args.link_capacity {
        config.link_capacity = capacity;
    }
    config.sanitize()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let target = match &args.log_file {
        Some(path) => LogTarget::File(path.clone()),
        None => LogTarget::Stderr,
    };
    let _log_guard = init_logging(&target)?;

    let config = load_config(&args)?;
    let signal = CancelSignal::new();
    if let Some(ms) = args.cancel_after_ms {
        signal.fire_after(Duration::from_millis(ms));
    }

    let delay = Duration::from_millis(args.stage_delay_ms);
    let started = Instant::now();

    let input = Sequence::produce(1..=args.items);
    let mut run = PipelineBuilder::with_config(input, Some(signal.clone()), config)
        .pipe(delayed("dummy", delay, args.workers, |v: u64| v))
        .pipe(delayed("multiplier", delay, args.workers, double))
        .pipe(delayed("adder", delay, args.workers, add_offset))
        .pipe(delayed("stringifier", delay, args.workers, |v: u64| v.to_string()))
        .build();

    tracing::info!(run_id = %run.run_id(), items = args.items, "Pipeline started");

    while let Some(line) = run.recv().await {
        println!("{}", line);
    }

    let metrics = run.join().await?;
    metrics.log_summary();
    tracing::info!(
        elapsed_ms = started.elapsed().as_millis(),
        cancelled = signal.is_fired(),
        "Demo finished"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_saturates() {
        assert_eq!(double(5), 10);
        assert_eq!(add_offset(5), 105);
        assert_eq!(double(u64::MAX / 2 + 1), u64::MAX);
        assert_eq!(add_offset(u64::MAX - 1), u64::MAX);
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["conveyor-demo"]).unwrap();
        assert_eq!(args.items, 5);
        assert_eq!(args.stage_delay_ms, 100);
        assert_eq!(args.workers, 1);
        assert!(args.cancel_after_ms.is_none());
    }

    #[test]
    fn test_cli_capacity_overrides_config() {
        let args = Args::try_parse_from(["conveyor-demo", "--link-capacity", "16"]).unwrap();
        assert_eq!(load_config(&args).unwrap().link_capacity, 16);

        let args = Args::try_parse_from(["conveyor-demo", "--link-capacity", "0"]).unwrap();
        assert!(load_config(&args).is_err());
    }
}
