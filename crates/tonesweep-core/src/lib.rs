//! Pure signal core for the tonesweep diagnostic.
//!
//! This crate holds the sample encodings and the sine block renderer. It
//! performs no device I/O; everything here is plain arithmetic that the audio
//! crate drives from its real-time callback.

pub mod format;
pub mod tone;

pub use format::{RenderSample, SampleEncoding};
pub use tone::{BlockMut, ToneParams, render_sine};

/// Number of audio frames (samples per channel)
pub type Frames = usize;

/// Frequency or sample rate in Hz
pub type Hz = f64;

/// Common error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A bit depth outside the 16/24/32 matrix
    #[error("unsupported bit depth: {0}")]
    UnsupportedBitDepth(u32),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_depth_mapping() {
        assert_eq!(
            SampleEncoding::from_bit_depth(16).unwrap(),
            SampleEncoding::Int16
        );
        assert!(SampleEncoding::from_bit_depth(20).is_err());
    }
}
