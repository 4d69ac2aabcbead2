//! Buffered capture sketch.
//!
//! The input-side counterpart of the output engine: opens the default input
//! device at its default configuration, streams samples through an SPSC ring
//! sized by [`capture_buffer_frames`], and drains them into memory on the
//! control thread. Captured audio is reported, never persisted.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};

/// Upper bound for the capture buffer, in bytes. Roughly five seconds of
/// stereo 24-bit audio at 96 kHz.
pub const MAX_CAPTURE_BYTES: usize = 0x50000;

/// How often the control thread drains the ring while capturing.
const DRAIN_INTERVAL: Duration = Duration::from_millis(10);

/// Sizes the capture buffer for `seconds` of audio, clamped to
/// [`MAX_CAPTURE_BYTES`].
///
/// `bytes_per_frame` of zero means the frame size is not fixed for this
/// format; `max_frame_bytes_hint` stands in for it, the way a queue is asked
/// for its largest packet when the stream description cannot say.
pub fn capture_buffer_frames(
    sample_rate: f64,
    seconds: f64,
    bytes_per_frame: usize,
    max_frame_bytes_hint: usize,
) -> usize {
    let frame_bytes = if bytes_per_frame == 0 {
        max_frame_bytes_hint
    } else {
        bytes_per_frame
    };
    if frame_bytes == 0 {
        return 0;
    }

    let wanted_bytes = (sample_rate * seconds * frame_bytes as f64) as usize;
    wanted_bytes.min(MAX_CAPTURE_BYTES) / frame_bytes
}

/// What one capture run saw.
#[derive(Debug)]
pub struct CaptureReport {
    /// Interleaved samples, normalized to f32.
    pub samples: Vec<f32>,
    /// Device sample rate.
    pub sample_rate: u32,
    /// Interleaved channels per frame.
    pub channels: u16,
    /// Samples the callback had to drop because the ring was full.
    pub dropped_samples: u64,
    /// Largest sample magnitude seen.
    pub peak: f32,
}

impl CaptureReport {
    /// Captured frames.
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }
}

/// Captures from the default input device for roughly `seconds`, returning
/// the drained samples and what happened along the way.
pub fn run_capture(seconds: f64) -> Result<CaptureReport> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("No input device available")?;
    tracing::info!("Using input device: {}", device.name()?);

    let supported = device
        .default_input_config()
        .context("No default input configuration")?;
    tracing::debug!("Default input config: {:?}", supported);

    match supported.sample_format() {
        SampleFormat::F32 => capture_typed::<f32>(&device, &supported.into(), seconds),
        SampleFormat::I16 => capture_typed::<i16>(&device, &supported.into(), seconds),
        SampleFormat::U16 => capture_typed::<u16>(&device, &supported.into(), seconds),
        other => anyhow::bail!("Unhandled input sample format: {other:?}"),
    }
}

fn capture_typed<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    seconds: f64,
) -> Result<CaptureReport>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let channels = config.channels;
    let sample_rate = config.sample_rate.0;

    // Ring sized for half a second of backlog; the drain loop runs two
    // orders of magnitude faster than that.
    let bytes_per_frame = usize::from(channels) * size_of::<f32>();
    let ring_frames =
        capture_buffer_frames(f64::from(sample_rate), 0.5, bytes_per_frame, bytes_per_frame).max(1);
    let (mut tx, mut rx) = rtrb::RingBuffer::<f32>::new(ring_frames * usize::from(channels));

    let dropped = Arc::new(AtomicU64::new(0));
    let dropped_in_callback = Arc::clone(&dropped);

    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                // Real-time path: push what fits, count the rest.
                for &sample in data {
                    if tx.push(f32::from_sample(sample)).is_err() {
                        dropped_in_callback.fetch_add(1, Ordering::Relaxed);
                    }
                }
            },
            move |err| {
                tracing::error!("Input stream error: {err}");
            },
            None,
        )
        .context("Device rejected the capture configuration")?;

    stream.play().context("Failed to start the capture stream")?;
    tracing::info!("Capture stream started");

    let mut samples = Vec::new();
    let deadline = Instant::now() + Duration::from_secs_f64(seconds);
    while Instant::now() < deadline {
        while let Ok(sample) = rx.pop() {
            samples.push(sample);
        }
        std::thread::sleep(DRAIN_INTERVAL);
    }

    stream
        .pause()
        .context("Failed to pause the capture stream")?;
    drop(stream);

    // The callback is gone; whatever is still queued belongs to the run.
    while let Ok(sample) = rx.pop() {
        samples.push(sample);
    }
    tracing::info!("Capture stream stopped after {} samples", samples.len());

    let peak = samples.iter().fold(0.0f32, |max, &s| max.max(s.abs()));
    Ok(CaptureReport {
        samples,
        sample_rate,
        channels,
        dropped_samples: dropped.load(Ordering::Relaxed),
        peak,
    })
}
