//! cpal integration for the tonesweep diagnostic.
//!
//! This crate owns everything that touches a device: the output engine that
//! renders the tone from a real-time callback, the sweep runner that walks
//! the configuration matrix, the callback event channel, and the buffered
//! capture sketch for the input side.

pub mod capture;
pub mod engine;
pub mod report;
pub mod sweep;

pub use engine::OutputEngine;
pub use report::{EngineEvent, event_channel};
pub use sweep::{CaseOutcome, CaseReport, SweepPlan, SweepRunner};

use tonesweep_core::{Hz, SampleEncoding};

/// One output configuration under test.
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    /// Requested rate in Hz. Kept as a float because the sweep matrix
    /// includes a fractional rate; the render math uses this exact value.
    pub sample_rate: Hz,
    /// Interleaved channels per frame.
    pub channels: u16,
    /// Sample encoding for the stream buffers.
    pub encoding: SampleEncoding,
}

impl OutputConfig {
    /// The integral rate handed to the device. Devices take whole Hz; the
    /// generator keeps the fractional part.
    pub fn device_sample_rate(&self) -> u32 {
        self.sample_rate.round() as u32
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            channels: 2,
            encoding: SampleEncoding::Float32,
        }
    }
}
