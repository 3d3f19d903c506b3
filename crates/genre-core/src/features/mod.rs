//! Audio-to-tensor feature pipeline
//!
//! Converts decoded audio into the fixed `(1, 128, 128, 1)` model input:
//!
//! ```text
//! RawAudio ─► duration::fix_duration ─► FixedAudio
//!          ─► SpectrogramExtractor  ─► PowerSpectrogram ─► DecibelSpectrogram
//!          ─► FrameNormalizer       ─► FixedSpectrogram ─► NormalizedSpectrogram
//!          ─► tensor::assemble      ─► NormalizedTensor
//! ```
//!
//! The constants below must match the preprocessing the classifier was
//! trained with; they are not configurable.

mod duration;
mod frames;
mod mel;
mod tensor;

pub use duration::{fix_duration, FixedAudio};
pub use frames::{FixedSpectrogram, FrameNormalizer, NormalizedSpectrogram};
pub use mel::{DecibelSpectrogram, PowerSpectrogram, SpectrogramExtractor};
pub use tensor::{assemble, NormalizedTensor};

use crate::audio::RawAudio;
use crate::error::{ClassifyError, Result};

/// Canonical sample rate (Hz)
pub const SAMPLE_RATE: u32 = 22050;

/// Clip duration fed to the model (seconds)
pub const DURATION_SECS: u32 = 30;

/// Number of mel bands (tensor height)
pub const N_MELS: usize = 128;

/// STFT hop size in samples
pub const HOP_LENGTH: usize = 512;

/// STFT window / FFT size in samples
pub const N_FFT: usize = 2048;

/// Number of spectrogram frames kept (tensor width)
pub const TARGET_T: usize = 128;

/// Stabilizer for min-max normalization of a constant grid
pub const NORM_EPSILON: f32 = 1e-6;

/// Dynamic range kept below the loudest cell (dB)
pub const TOP_DB: f32 = 80.0;

/// Exact model input shape: (batch, height, width, channel)
pub const INPUT_SHAPE: [usize; 4] = [1, N_MELS, TARGET_T, 1];

/// Number of samples in a duration-normalized clip
pub const fn target_samples() -> usize {
    SAMPLE_RATE as usize * DURATION_SECS as usize
}

/// The stateless-per-request part of the feature pipeline.
///
/// Holds the FFT plan, window and mel filterbank, which are built once and
/// shared read-only between concurrent requests.
pub struct FeaturePipeline {
    extractor: SpectrogramExtractor,
    frames: FrameNormalizer,
}

impl Default for FeaturePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl FeaturePipeline {
    pub fn new() -> Self {
        Self {
            extractor: SpectrogramExtractor::new(),
            frames: FrameNormalizer::default(),
        }
    }

    /// Run every stage from decoded audio to the model input tensor
    pub fn process(&self, audio: &RawAudio) -> Result<NormalizedTensor> {
        if audio.is_empty() {
            return Err(ClassifyError::Processing(
                "Decoded audio contains no samples".to_string(),
            ));
        }
        if audio.sample_rate() != SAMPLE_RATE {
            return Err(ClassifyError::Processing(format!(
                "Expected {} Hz audio, got {} Hz",
                SAMPLE_RATE,
                audio.sample_rate()
            )));
        }

        let fixed = fix_duration(audio.samples(), target_samples());
        let power = self.extractor.power_spectrogram(&fixed)?;
        let db = power.to_decibels();
        log::debug!(
            "Mel spectrogram: {} bands x {} frames",
            db.n_mels(),
            db.n_frames()
        );

        let normalized = self.frames.apply(&db)?;
        assemble(&normalized)
    }
}
