//! Exercise the buffered capture path.
//!
//! Records from the default input device into memory for a few seconds and
//! reports what arrived. Nothing is written to disk.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tonesweep_audio::capture::run_capture;

/// Record from the default input device and report statistics
#[derive(Parser, Debug)]
#[command(name = "capture-check")]
#[command(about = "Capture from the default input device into memory", long_about = None)]
struct Args {
    /// Capture duration (seconds)
    #[arg(short, long, default_value_t = 2.0)]
    duration: f64,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tonesweep=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let report = run_capture(args.duration)?;
    tracing::info!(
        "Captured {} frames at {} Hz, {} channels (peak {:.3}, {} samples dropped)",
        report.frames(),
        report.sample_rate,
        report.channels,
        report.peak,
        report.dropped_samples
    );

    Ok(())
}
