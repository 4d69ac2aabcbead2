//! Configuration sweep.
//!
//! Walks the {bit depth x channel count x sample rate} matrix, attempts each
//! configuration on the default output device, and records what the backend
//! accepted. Configurations run strictly one at a time, each with a fresh
//! engine and a fresh phase counter - nothing carries over between cases.

use std::time::Duration;

use tonesweep_core::{Hz, SampleEncoding, ToneParams};

use crate::OutputConfig;
use crate::engine::OutputEngine;
use crate::report::{EngineEvent, event_channel};

/// Rates the hardware matrix probes, including the deliberately awkward
/// fractional rate at the end.
pub const DEFAULT_SAMPLE_RATES: [Hz; 13] = [
    8_000.0, 11_025.0, 16_000.0, 22_050.0, 32_000.0, 44_100.0, 48_000.0, 64_000.0, 88_200.0,
    96_000.0, 192_000.0, 320_000.0, 55_339.75,
];

/// Channel counts the matrix probes.
pub const DEFAULT_CHANNEL_COUNTS: [u16; 3] = [2, 4, 8];

/// Bit depths the matrix probes.
pub const DEFAULT_BIT_DEPTHS: [u32; 3] = [16, 24, 32];

/// Event-ring capacity per case: enough buffers of history that a held
/// configuration never wraps before the runner drains it.
const EVENT_CAPACITY: usize = 4_096;

/// The matrix of configurations to try.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    /// Bit depths, outermost sweep axis.
    pub bit_depths: Vec<u32>,
    /// Channel counts, middle axis.
    pub channel_counts: Vec<u16>,
    /// Sample rates in Hz, innermost axis.
    pub sample_rates: Vec<Hz>,
    /// How long each accepted configuration keeps rendering before teardown.
    pub hold: Duration,
}

impl Default for SweepPlan {
    fn default() -> Self {
        Self {
            bit_depths: DEFAULT_BIT_DEPTHS.to_vec(),
            channel_counts: DEFAULT_CHANNEL_COUNTS.to_vec(),
            sample_rates: DEFAULT_SAMPLE_RATES.to_vec(),
            hold: Duration::from_secs(2),
        }
    }
}

impl SweepPlan {
    /// A plan holding a single configuration.
    pub fn single(bits: u32, channels: u16, sample_rate: Hz, hold: Duration) -> Self {
        Self {
            bit_depths: vec![bits],
            channel_counts: vec![channels],
            sample_rates: vec![sample_rate],
            hold,
        }
    }

    /// Expands the matrix in sweep order: depth outermost, rate innermost.
    pub fn configs(&self) -> tonesweep_core::Result<Vec<OutputConfig>> {
        let mut configs =
            Vec::with_capacity(self.bit_depths.len() * self.channel_counts.len() * self.sample_rates.len());
        for &bits in &self.bit_depths {
            let encoding = SampleEncoding::from_bit_depth(bits)?;
            for &channels in &self.channel_counts {
                for &sample_rate in &self.sample_rates {
                    configs.push(OutputConfig {
                        sample_rate,
                        channels,
                        encoding,
                    });
                }
            }
        }
        Ok(configs)
    }
}

/// What happened to one configuration.
#[derive(Debug)]
pub enum CaseOutcome {
    /// The backend accepted the configuration and rendering ran.
    Accepted,
    /// The backend rejected it.
    Rejected(anyhow::Error),
}

/// Result of one swept configuration.
#[derive(Debug)]
pub struct CaseReport {
    /// The configuration that was attempted.
    pub config: OutputConfig,
    /// Acceptance or the rejection error.
    pub outcome: CaseOutcome,
    /// Frames the callback rendered while the configuration was held.
    pub frames_rendered: u64,
    /// Largest decoded sample magnitude the callback observed.
    pub peak: f32,
}

impl CaseReport {
    /// True when the backend accepted the configuration.
    pub fn accepted(&self) -> bool {
        matches!(self.outcome, CaseOutcome::Accepted)
    }
}

/// Drives a plan, configuration by configuration.
pub struct SweepRunner {
    tone: ToneParams,
}

impl SweepRunner {
    /// A runner that renders the given tone in every case.
    pub fn new(tone: ToneParams) -> Self {
        Self { tone }
    }

    /// Runs the whole plan. A rejected configuration is recorded and the
    /// sweep moves on; only an invalid plan aborts.
    pub fn run(&self, plan: &SweepPlan) -> tonesweep_core::Result<Vec<CaseReport>> {
        let configs = plan.configs()?;
        tracing::info!("Sweeping {} configurations", configs.len());

        let mut reports = Vec::with_capacity(configs.len());
        for config in configs {
            reports.push(self.run_case(config, plan.hold));
        }
        Ok(reports)
    }

    /// Attempts one configuration: fresh engine, hold, teardown, drain.
    pub fn run_case(&self, config: OutputConfig, hold: Duration) -> CaseReport {
        tracing::info!(
            "Testing at {} bits, with {} channels, at {} Hz",
            config.encoding.bit_depth(),
            config.channels,
            config.sample_rate
        );

        let (events_tx, mut events_rx) = event_channel(EVENT_CAPACITY);
        let mut engine = OutputEngine::new(config);

        let outcome = match engine.start(self.tone, events_tx) {
            Ok(()) => {
                std::thread::sleep(hold);
                match engine.stop() {
                    Ok(()) => CaseOutcome::Accepted,
                    Err(e) => CaseOutcome::Rejected(e),
                }
            }
            Err(e) => {
                tracing::warn!("Configuration rejected: {e:#}");
                CaseOutcome::Rejected(e)
            }
        };

        let mut frames_rendered = 0u64;
        let mut peak = 0.0f32;
        while let Ok(event) = events_rx.pop() {
            if let EngineEvent::Rendered { frames, peak: p } = event {
                frames_rendered += frames as u64;
                peak = peak.max(p);
            }
        }

        CaseReport {
            config,
            outcome,
            frames_rendered,
            peak,
        }
    }
}
