//! Audio input: container validation, decoding and resampling
//!
//! Everything here produces [`RawAudio`]: mono `f32` samples at the canonical
//! feature sample rate, bounded to the feature duration.

mod decoder;
mod resample;

pub use decoder::AudioDecoder;
pub use resample::resample;

use std::path::Path;

use crate::error::{ClassifyError, Result};

/// Containers accepted for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,
}

impl AudioFormat {
    /// All accepted formats
    pub fn all() -> &'static [Self] {
        &[Self::Wav, Self::Mp3, Self::Flac, Self::Ogg]
    }

    /// Canonical file extension (lowercase, no dot)
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
        }
    }

    /// Match an extension case-insensitively, with or without the leading dot
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.');
        Self::all()
            .iter()
            .copied()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
    }

    /// Detect the format of a file name or path from its extension.
    ///
    /// Fails with [`ClassifyError::UnsupportedFormat`] before any I/O happens.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| ClassifyError::UnsupportedFormat(path.display().to_string()))
    }
}

/// Mono audio at a known sample rate, as produced by [`AudioDecoder`]
#[derive(Debug, Clone, PartialEq)]
pub struct RawAudio {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl RawAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}
