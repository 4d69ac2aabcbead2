//! Output engine - one cpal stream per test configuration.

use anyhow::{Context, Result};
use cpal::Stream;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tonesweep_core::{RenderSample, SampleEncoding, ToneParams, render_sine};

use crate::OutputConfig;
use crate::report::{EngineEvent, EventSender};

/// Largest block rendered in one pass. Host buffers bigger than this are
/// pushed through the scratch block in chunks so the callback never
/// allocates, whatever buffer size the backend settles on.
pub const MAX_BLOCK_FRAMES: usize = 4_096;

/// State owned by one render callback: the phase counter, the tone, and a
/// preallocated mono scratch block. Nothing here is shared - the host
/// serializes callback invocations, and the state dies with the stream.
struct RenderState<T> {
    phase: u64,
    sample_rate: f64,
    channels: usize,
    tone: ToneParams,
    scratch: Vec<T>,
    events: EventSender,
    started: bool,
}

impl<T: RenderSample> RenderState<T> {
    fn new(config: &OutputConfig, tone: ToneParams, events: EventSender) -> Self {
        Self {
            phase: 0,
            sample_rate: config.sample_rate,
            channels: usize::from(config.channels.max(1)),
            tone,
            scratch: vec![T::default(); MAX_BLOCK_FRAMES],
            events,
            started: false,
        }
    }

    /// Fills one interleaved host buffer. Runs on the real-time thread: no
    /// allocation, no locking, no logging.
    fn fill(&mut self, data: &mut [T]) {
        if !self.started {
            self.started = true;
            let _ = self.events.push(EngineEvent::Started);
        }

        let channels = self.channels;
        let usable = data.len() - data.len() % channels;
        let mut frames_total = 0;
        let mut peak = 0.0f64;

        for chunk in data[..usable].chunks_mut(channels * MAX_BLOCK_FRAMES) {
            let frames = chunk.len() / channels;
            let block = &mut self.scratch[..frames];
            render_sine(T::block(block), self.phase, self.sample_rate, &self.tone);

            // One mono block, copied into every channel of the frame.
            for (value, frame) in block.iter().zip(chunk.chunks_mut(channels)) {
                frame.fill(*value);
            }
            for value in block.iter() {
                peak = peak.max(value.to_normalized().abs());
            }

            // The phase counter advances by exactly the frames rendered,
            // once per render call.
            self.phase += frames as u64;
            frames_total += frames;
        }

        // A trailing partial frame should never happen; leave it silent.
        for sample in &mut data[usable..] {
            *sample = T::default();
        }

        let _ = self.events.push(EngineEvent::Rendered {
            frames: frames_total,
            peak: peak as f32,
        });
    }
}

/// The output engine manages one cpal stream for one configuration.
pub struct OutputEngine {
    config: OutputConfig,
    stream: Option<Stream>,
}

impl OutputEngine {
    /// Create a new engine for the given configuration.
    pub fn new(config: OutputConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    /// The configuration this engine was built for.
    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Opens the default output device in this configuration and starts
    /// rendering the tone. Success of this call is the acceptance check:
    /// a backend that cannot run the configuration fails here.
    pub fn start(&mut self, tone: ToneParams, events: EventSender) -> Result<()> {
        tracing::info!("Output engine starting with config: {:?}", self.config);

        let host = cpal::default_host();
        tracing::debug!("Using audio host: {}", host.id().name());

        let device = host
            .default_output_device()
            .context("No output device available")?;
        tracing::info!("Using output device: {}", device.name()?);

        let stream_config = cpal::StreamConfig {
            channels: self.config.channels,
            sample_rate: cpal::SampleRate(self.config.device_sample_rate()),
            buffer_size: cpal::BufferSize::Default,
        };
        tracing::debug!("Stream config: {:?}", stream_config);

        let stream = match self.config.encoding {
            SampleEncoding::Float32 => {
                self.build_stream::<f32>(&device, &stream_config, tone, events)?
            }
            SampleEncoding::Int16 => {
                self.build_stream::<i16>(&device, &stream_config, tone, events)?
            }
            SampleEncoding::Int24 => {
                self.build_stream::<i32>(&device, &stream_config, tone, events)?
            }
        };

        stream.play().context("Failed to start the output stream")?;
        tracing::info!("Output stream started");

        self.stream = Some(stream);
        Ok(())
    }

    fn build_stream<T>(
        &self,
        device: &cpal::Device,
        stream_config: &cpal::StreamConfig,
        tone: ToneParams,
        events: EventSender,
    ) -> Result<Stream>
    where
        T: RenderSample + cpal::SizedSample + Send + 'static,
    {
        let mut state = RenderState::<T>::new(&self.config, tone, events);

        device
            .build_output_stream(
                stream_config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| state.fill(data),
                move |err| {
                    tracing::error!("Output stream error: {err}");
                },
                None,
            )
            .with_context(|| {
                format!(
                    "Device rejected {} Hz, {} channels, {} bits",
                    stream_config.sample_rate.0,
                    stream_config.channels,
                    T::ENCODING.bit_depth()
                )
            })
    }

    /// Stops rendering and releases the stream.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream.pause().context("Failed to pause the output stream")?;
            drop(stream);
            tracing::info!("Output stream stopped");
        }
        Ok(())
    }
}

impl Drop for OutputEngine {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::error!("Error stopping output engine: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::event_channel;
    use cpal::traits::HostTrait;
    use std::time::Duration;
    use tonesweep_core::BlockMut;

    /// Helper to check if an output device is available.
    /// Returns true if we should skip the test.
    fn should_skip_audio_test() -> bool {
        let host = cpal::default_host();
        host.default_output_device().is_none()
    }

    #[test]
    fn test_fill_matches_direct_render_across_chunks() {
        let config = OutputConfig {
            sample_rate: 48_000.0,
            channels: 2,
            encoding: SampleEncoding::Float32,
        };
        let tone = ToneParams {
            frequency: 440.0,
            amplitude: 1.0,
        };
        let (tx, mut rx) = event_channel(16);
        let mut state = RenderState::<f32>::new(&config, tone, tx);

        // More frames than one scratch block, to force chunking.
        let frames = MAX_BLOCK_FRAMES + 600;
        let mut data = vec![0.0f32; frames * 2];
        state.fill(&mut data);

        let mut expected = vec![0.0f32; frames];
        render_sine(BlockMut::Float32(&mut expected), 0, 48_000.0, &tone);

        for (n, frame) in data.chunks(2).enumerate() {
            assert_eq!(frame[0], expected[n], "frame {n}");
            assert_eq!(frame[1], expected[n], "frame {n}");
        }
        assert_eq!(state.phase, frames as u64);

        assert_eq!(rx.pop().unwrap(), EngineEvent::Started);
        let mut rendered = 0;
        while let Ok(EngineEvent::Rendered { frames, .. }) = rx.pop() {
            rendered += frames;
        }
        assert_eq!(rendered, frames);
    }

    #[test]
    fn test_fill_keeps_phase_across_buffers() {
        let config = OutputConfig::default();
        let tone = ToneParams {
            frequency: 997.0,
            amplitude: 0.8,
        };
        let (tx, _rx) = event_channel(64);
        let mut state = RenderState::<f32>::new(&config, tone, tx);

        let mut joined = Vec::new();
        for _ in 0..4 {
            let mut data = vec![0.0f32; 300 * 2];
            state.fill(&mut data);
            joined.extend(data.chunks(2).map(|frame| frame[0]));
        }

        let mut expected = vec![0.0f32; 1_200];
        render_sine(BlockMut::Float32(&mut expected), 0, 48_000.0, &tone);
        assert_eq!(joined, expected);
    }

    #[test]
    fn test_fill_reports_peak() {
        let config = OutputConfig {
            encoding: SampleEncoding::Int16,
            ..OutputConfig::default()
        };
        let tone = ToneParams {
            frequency: 440.0,
            amplitude: 0.5,
        };
        let (tx, mut rx) = event_channel(16);
        let mut state = RenderState::<i16>::new(&config, tone, tx);

        let mut data = vec![0i16; 2_048 * 2];
        state.fill(&mut data);

        assert_eq!(rx.pop().unwrap(), EngineEvent::Started);
        let Ok(EngineEvent::Rendered { peak, .. }) = rx.pop() else {
            panic!("expected a Rendered event");
        };
        assert!(peak > 0.4 && peak <= 0.5 + 0.001, "peak={peak}");
    }

    #[test]
    fn test_engine_start_stop() {
        if should_skip_audio_test() {
            eprintln!("Skipping test: No audio device available (CI environment)");
            return;
        }

        let mut engine = OutputEngine::new(OutputConfig::default());
        let (tx, mut rx) = event_channel(1_024);

        // Start the engine - skip test if the device can't be opened (CI).
        match engine.start(ToneParams::default(), tx) {
            Ok(()) => {
                std::thread::sleep(Duration::from_millis(200));
                assert!(engine.stop().is_ok());

                let mut saw_started = false;
                while let Ok(event) = rx.pop() {
                    if event == EngineEvent::Started {
                        saw_started = true;
                    }
                }
                assert!(saw_started, "Should receive Started event");
            }
            Err(e) => {
                eprintln!("Skipping test: Audio device unavailable - {e}");
            }
        }
    }

    #[test]
    fn test_multiple_start_stop_cycles() {
        if should_skip_audio_test() {
            eprintln!("Skipping test: No audio device available (CI environment)");
            return;
        }

        let mut engine = OutputEngine::new(OutputConfig::default());
        for _ in 0..3 {
            let (tx, _rx) = event_channel(1_024);
            if let Err(e) = engine.start(ToneParams::default(), tx) {
                eprintln!("Skipping test: Audio device unavailable - {e}");
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
            engine.stop().unwrap();
        }
    }
}
