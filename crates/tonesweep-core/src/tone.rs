//! Sine block renderer.
//!
//! The generator is a pure function of (starting phase, destination block,
//! sample rate, tone parameters); it keeps no state of its own. The phase
//! counter lives with the caller, which advances it by the block length
//! after each call, so back-to-back calls produce one continuous waveform.

use std::f64::consts::TAU;

use crate::Hz;
use crate::format::{encode_i16, encode_i24};

/// Tone parameters, fixed for the duration of one test configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneParams {
    /// Tone frequency in Hz.
    pub frequency: Hz,
    /// Peak amplitude, conventionally in [0, 1].
    pub amplitude: f64,
}

impl Default for ToneParams {
    fn default() -> Self {
        Self {
            frequency: 440.0,
            amplitude: 0.5,
        }
    }
}

/// A mutable view of one destination block in a specific encoding.
///
/// The encoding travels with the buffer, so a caller cannot pair a format
/// selector with a buffer of the wrong width.
pub enum BlockMut<'a> {
    /// 32-bit float destination.
    Float32(&'a mut [f32]),
    /// Signed 16-bit destination.
    Int16(&'a mut [i16]),
    /// 24-in-32 destination.
    Int24(&'a mut [i32]),
}

impl BlockMut<'_> {
    /// Frames the block holds.
    pub fn len(&self) -> usize {
        match self {
            Self::Float32(buf) => buf.len(),
            Self::Int16(buf) => buf.len(),
            Self::Int24(buf) => buf.len(),
        }
    }

    /// True when the block holds no frames.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fills `dest` with consecutive sine samples, continuing from `phase_start`
/// samples into the waveform.
///
/// For frame `n` the instantaneous phase is
/// `2π · frequency · (phase_start + n) / sample_rate`; its sine, scaled by
/// the amplitude, is written in the block's encoding. Exactly `dest.len()`
/// samples are written and nothing else happens: no allocation, no locking,
/// no I/O. That keeps the function callable from the stream's real-time
/// callback thread.
///
/// The caller owns the phase counter and adds `dest.len()` to it after this
/// returns, exactly once per call.
pub fn render_sine(dest: BlockMut<'_>, phase_start: u64, sample_rate: Hz, tone: &ToneParams) {
    let step = TAU * tone.frequency / sample_rate;
    match dest {
        BlockMut::Float32(out) => {
            for (n, sample) in out.iter_mut().enumerate() {
                *sample = (tone.amplitude * ((phase_start + n as u64) as f64 * step).sin()) as f32;
            }
        }
        BlockMut::Int16(out) => {
            for (n, sample) in out.iter_mut().enumerate() {
                let value = tone.amplitude * ((phase_start + n as u64) as f64 * step).sin();
                *sample = encode_i16(value);
            }
        }
        BlockMut::Int24(out) => {
            for (n, sample) in out.iter_mut().enumerate() {
                let value = tone.amplitude * ((phase_start + n as u64) as f64 * step).sin();
                *sample = encode_i24(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{decode_i16, decode_i24, SampleEncoding};

    const RATE: Hz = 48_000.0;

    fn render_f32(frames: usize, phase_start: u64, tone: &ToneParams) -> Vec<f32> {
        let mut buf = vec![0.0f32; frames];
        render_sine(BlockMut::Float32(&mut buf), phase_start, RATE, tone);
        buf
    }

    #[test]
    fn test_phase_continuity_split_equals_single_pass() {
        let tone = ToneParams {
            frequency: 440.0,
            amplitude: 1.0,
        };
        let whole = render_f32(512, 0, &tone);

        for split in [1usize, 137, 256, 511] {
            let mut first = vec![0.0f32; split];
            let mut second = vec![0.0f32; 512 - split];
            render_sine(BlockMut::Float32(&mut first), 0, RATE, &tone);
            render_sine(BlockMut::Float32(&mut second), split as u64, RATE, &tone);
            first.extend_from_slice(&second);
            assert_eq!(whole, first, "split at {split}");
        }
    }

    #[test]
    fn test_periodicity_on_integral_period() {
        // 1 kHz at 48 kHz repeats every 48 samples exactly.
        let tone = ToneParams {
            frequency: 1_000.0,
            amplitude: 1.0,
        };
        let buf = render_f32(480, 0, &tone);
        for n in 0..buf.len() - 48 {
            assert!(
                (buf[n] - buf[n + 48]).abs() < 1e-5,
                "n={n}: {} vs {}",
                buf[n],
                buf[n + 48]
            );
        }
    }

    #[test]
    fn test_amplitude_bound_all_encodings() {
        let tone = ToneParams {
            frequency: 440.0,
            amplitude: 0.25,
        };

        let floats = render_f32(4_096, 0, &tone);
        assert!(floats.iter().all(|s| s.abs() <= 0.25));

        let mut ints = vec![0i16; 4_096];
        render_sine(BlockMut::Int16(&mut ints), 0, RATE, &tone);
        let step = SampleEncoding::Int16.quantization_step();
        assert!(ints.iter().all(|&s| decode_i16(s).abs() <= 0.25 + step));

        let mut wide = vec![0i32; 4_096];
        render_sine(BlockMut::Int24(&mut wide), 0, RATE, &tone);
        let step = SampleEncoding::Int24.quantization_step();
        assert!(wide.iter().all(|&s| decode_i24(s).abs() <= 0.25 + step));
    }

    #[test]
    fn test_one_second_float_scenario() {
        // 440 Hz at 48 kHz, amplitude 1.0: silence at n=0, near-zero again
        // one period later, and never above full scale.
        let tone = ToneParams {
            frequency: 440.0,
            amplitude: 1.0,
        };
        let buf = render_f32(48_000, 0, &tone);

        assert_eq!(buf[0], 0.0);

        // One period is 48000/440 = 109.09 samples; at the nearest frame the
        // wave can have moved at most one sample-step off zero.
        let period = (RATE / tone.frequency).round() as usize;
        let slope_bound = (TAU * tone.frequency / RATE) as f32;
        assert!(buf[period].abs() <= slope_bound);

        assert!(buf.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_one_second_int16_scenario() {
        // Same tone in 16-bit: zero at n=0 and a peak within one LSB of full
        // scale (440/48000 = 11/1200, so sample phases land exactly on the
        // 2π/1200 grid, which contains π/2).
        let tone = ToneParams {
            frequency: 440.0,
            amplitude: 1.0,
        };
        let mut buf = vec![0i16; 48_000];
        render_sine(BlockMut::Int16(&mut buf), 0, RATE, &tone);

        assert_eq!(buf[0], 0);

        let peak = buf.iter().map(|s| i32::from(s.abs())).max().unwrap();
        assert!(peak >= i32::from(i16::MAX) - 1, "peak={peak}");
        assert!(peak <= i32::from(i16::MAX));
    }

    #[test]
    fn test_integer_paths_track_float_path() {
        let tone = ToneParams {
            frequency: 997.0,
            amplitude: 0.8,
        };
        let floats = render_f32(2_048, 31, &tone);

        let mut ints = vec![0i16; 2_048];
        render_sine(BlockMut::Int16(&mut ints), 31, RATE, &tone);
        let step = SampleEncoding::Int16.quantization_step();
        for (f, i) in floats.iter().zip(&ints) {
            assert!((f64::from(*f) - decode_i16(*i)).abs() <= step);
        }

        let mut wide = vec![0i32; 2_048];
        render_sine(BlockMut::Int24(&mut wide), 31, RATE, &tone);
        let step = SampleEncoding::Int24.quantization_step() + f64::from(f32::EPSILON);
        for (f, i) in floats.iter().zip(&wide) {
            assert!((f64::from(*f) - decode_i24(*i)).abs() <= step);
        }
    }

    #[test]
    fn test_nonzero_phase_start_matches_absolute_index() {
        let tone = ToneParams {
            frequency: 440.0,
            amplitude: 1.0,
        };
        let absolute = render_f32(1_000, 0, &tone);
        let offset = render_f32(500, 500, &tone);
        assert_eq!(&absolute[500..], offset.as_slice());
    }

    #[test]
    fn test_empty_block_is_a_no_op() {
        let tone = ToneParams::default();
        let mut buf: Vec<f32> = Vec::new();
        render_sine(BlockMut::Float32(&mut buf), 10, RATE, &tone);
        assert!(buf.is_empty());
    }
}
