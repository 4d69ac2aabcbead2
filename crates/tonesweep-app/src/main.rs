//! tonesweep - audio output diagnostic
//!
//! Sweeps the default output device through a matrix of bit depths, channel
//! counts, and sample rates, rendering a sine tone in each configuration and
//! reporting which ones the backend accepted.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tonesweep_audio::{CaseOutcome, SweepPlan, SweepRunner};
use tonesweep_core::{Hz, ToneParams};

/// Sweep the default output device through the test matrix
#[derive(Parser, Debug)]
#[command(name = "tonesweep")]
#[command(about = "Audio output diagnostic sweep", long_about = None)]
struct Args {
    /// Tone frequency (Hz)
    #[arg(short, long, default_value_t = 440.0)]
    frequency: f64,

    /// Tone amplitude (0.0-1.0)
    #[arg(short, long, default_value_t = 0.5)]
    amplitude: f64,

    /// How long to hold each configuration (seconds)
    #[arg(short, long, default_value_t = 2.0)]
    duration: f64,

    /// Test a single bit depth instead of the full matrix
    #[arg(short, long)]
    bits: Option<u32>,

    /// Channel count for single-configuration mode
    #[arg(short, long, requires = "bits")]
    channels: Option<u16>,

    /// Sample rate (Hz) for single-configuration mode
    #[arg(short = 's', long, requires = "bits")]
    rate: Option<Hz>,
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
    tracing::info!("Starting tonesweep...");

    let tone = ToneParams {
        frequency: args.frequency,
        amplitude: args.amplitude,
    };
    let hold = Duration::from_secs_f64(args.duration);

    let plan = match (args.bits, args.channels, args.rate) {
        (Some(bits), Some(channels), Some(rate)) => SweepPlan::single(bits, channels, rate, hold),
        (None, None, None) => SweepPlan {
            hold,
            ..SweepPlan::default()
        },
        _ => anyhow::bail!("--bits, --channels and --rate must be given together"),
    };

    let runner = SweepRunner::new(tone);
    let reports = runner.run(&plan)?;

    let mut accepted = 0;
    for report in &reports {
        let config = &report.config;
        match &report.outcome {
            CaseOutcome::Accepted => {
                accepted += 1;
                tracing::info!(
                    "ok   {:>2} bits, {} ch, {:>9.2} Hz - {} frames rendered, peak {:.3}",
                    config.encoding.bit_depth(),
                    config.channels,
                    config.sample_rate,
                    report.frames_rendered,
                    report.peak
                );
            }
            CaseOutcome::Rejected(e) => {
                tracing::warn!(
                    "fail {:>2} bits, {} ch, {:>9.2} Hz - {e:#}",
                    config.encoding.bit_depth(),
                    config.channels,
                    config.sample_rate
                );
            }
        }
    }
    tracing::info!("{accepted}/{} configurations accepted", reports.len());

    Ok(())
}
