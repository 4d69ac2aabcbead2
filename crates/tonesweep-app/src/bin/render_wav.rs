//! Render the diagnostic tone to a WAV file.
//!
//! Runs the real generator offline so the exact rendered samples can be
//! inspected without an audio device, in any of the three encodings.

use anyhow::{Context, Result};
use clap::Parser;
use hound::{WavSpec, WavWriter};
use std::io::{Seek, Write};
use std::path::PathBuf;

use tonesweep_core::{BlockMut, SampleEncoding, ToneParams, render_sine};

/// Render the diagnostic tone to a WAV file
#[derive(Parser, Debug)]
#[command(name = "render-wav")]
#[command(about = "Render the diagnostic sine tone to a WAV file", long_about = None)]
struct Args {
    /// Output WAV file
    #[arg(short, long)]
    output: PathBuf,

    /// Sample rate (Hz)
    #[arg(short, long, default_value_t = 48000)]
    sample_rate: u32,

    /// Number of channels
    #[arg(short, long, default_value_t = 2)]
    channels: u16,

    /// Bits per sample (16, 24 or 32)
    #[arg(short, long, default_value_t = 32)]
    bits: u32,

    /// Duration (seconds)
    #[arg(short, long, default_value_t = 2.0)]
    duration: f64,

    /// Frequency (Hz)
    #[arg(short, long, default_value_t = 440.0)]
    frequency: f64,

    /// Amplitude (0.0-1.0)
    #[arg(short, long, default_value_t = 0.5)]
    amplitude: f64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let encoding = SampleEncoding::from_bit_depth(args.bits)?;

    println!("Rendering tone:");
    println!("  Output: {}", args.output.display());
    println!("  Sample rate: {} Hz", args.sample_rate);
    println!("  Channels: {}", args.channels);
    println!("  Bits: {}", encoding.bit_depth());
    println!("  Duration: {:.1} seconds", args.duration);
    println!("  Frequency: {:.1} Hz", args.frequency);
    println!("  Amplitude: {:.2}", args.amplitude);

    let spec = WavSpec {
        channels: args.channels,
        sample_rate: args.sample_rate,
        bits_per_sample: encoding.bit_depth() as u16,
        sample_format: match encoding {
            SampleEncoding::Float32 => hound::SampleFormat::Float,
            SampleEncoding::Int16 | SampleEncoding::Int24 => hound::SampleFormat::Int,
        },
    };

    let mut writer = WavWriter::create(&args.output, spec)
        .with_context(|| format!("Failed to create output file: {}", args.output.display()))?;

    let frames = (f64::from(args.sample_rate) * args.duration) as usize;
    let rate = f64::from(args.sample_rate);
    let tone = ToneParams {
        frequency: args.frequency,
        amplitude: args.amplitude,
    };

    match encoding {
        SampleEncoding::Float32 => {
            let mut block = vec![0.0f32; frames];
            render_sine(BlockMut::Float32(&mut block), 0, rate, &tone);
            write_frames(&mut writer, &block, args.channels)?;
        }
        SampleEncoding::Int16 => {
            let mut block = vec![0i16; frames];
            render_sine(BlockMut::Int16(&mut block), 0, rate, &tone);
            write_frames(&mut writer, &block, args.channels)?;
        }
        SampleEncoding::Int24 => {
            // hound takes 24-bit samples in i32 containers, the same layout
            // the generator writes.
            let mut block = vec![0i32; frames];
            render_sine(BlockMut::Int24(&mut block), 0, rate, &tone);
            write_frames(&mut writer, &block, args.channels)?;
        }
    }

    writer.finalize().context("Failed to finalize WAV file")?;

    println!("Successfully wrote {frames} frames");
    Ok(())
}

/// Writes one mono block into every channel of the WAV.
fn write_frames<S, W>(writer: &mut WavWriter<W>, block: &[S], channels: u16) -> Result<()>
where
    S: hound::Sample + Copy,
    W: Write + Seek,
{
    for &sample in block {
        for _ in 0..channels {
            writer
                .write_sample(sample)
                .context("Failed to write sample")?;
        }
    }
    Ok(())
}
