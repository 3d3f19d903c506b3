//! Mel power spectrogram and per-clip decibel conversion
//!
//! Parameters follow the training-time preprocessing exactly:
//! centered frames (zero-padded by `N_FFT / 2`), periodic Hann window,
//! `|X|²` power, Slaney-scale area-normalized mel filters over `0..sr/2`,
//! and `power → dB` referenced to the clip's own maximum with an 80 dB floor.

use std::sync::Arc;

use ndarray::Array2;
use realfft::{RealFftPlanner, RealToComplex};

use super::duration::FixedAudio;
use super::{HOP_LENGTH, N_FFT, N_MELS, SAMPLE_RATE, TOP_DB};
use crate::error::{ClassifyError, Result};

/// Power floor before taking the logarithm
const AMIN: f32 = 1e-10;

/// Mel-band power grid, shape `(n_mels, n_frames)`
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectrogram {
    data: Array2<f32>,
}

/// Power grid in dB relative to its own maximum; every value is in `[-TOP_DB, 0]`
#[derive(Debug, Clone, PartialEq)]
pub struct DecibelSpectrogram {
    data: Array2<f32>,
}

impl PowerSpectrogram {
    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn n_mels(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_frames(&self) -> usize {
        self.data.ncols()
    }

    /// Convert to decibels with the grid's maximum as the 0 dB reference.
    ///
    /// Absolute loudness is discarded on purpose: the classifier was trained
    /// on per-clip referenced spectrograms.
    pub fn to_decibels(&self) -> DecibelSpectrogram {
        let reference = self.data.iter().cloned().fold(0.0f32, f32::max);
        let ref_db = 10.0 * reference.max(AMIN).log10();

        let mut db = self.data.mapv(|p| 10.0 * p.max(AMIN).log10() - ref_db);

        let max_db = db.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let floor = max_db - TOP_DB;
        db.mapv_inplace(|v| v.max(floor));

        DecibelSpectrogram { data: db }
    }
}

impl DecibelSpectrogram {
    /// Wrap an existing dB grid, shape `(n_mels, n_frames)`
    pub fn from_array(data: Array2<f32>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn n_mels(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_frames(&self) -> usize {
        self.data.ncols()
    }
}

/// STFT + mel projection with a pre-planned FFT and pre-built filterbank
pub struct SpectrogramExtractor {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    /// Shape `(N_MELS, N_FFT / 2 + 1)`
    mel_basis: Array2<f32>,
}

impl Default for SpectrogramExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrogramExtractor {
    pub fn new() -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        Self {
            fft: planner.plan_fft_forward(N_FFT),
            window: periodic_hann(N_FFT),
            mel_basis: slaney_mel_filterbank(SAMPLE_RATE as f64, N_FFT, N_MELS),
        }
    }

    pub fn mel_basis(&self) -> &Array2<f32> {
        &self.mel_basis
    }

    /// Number of centered frames for a signal of `n_samples`
    pub fn frame_count(n_samples: usize) -> usize {
        1 + n_samples / HOP_LENGTH
    }

    /// Mel power spectrogram over the full clip
    pub fn power_spectrogram(&self, audio: &FixedAudio) -> Result<PowerSpectrogram> {
        let power = self.stft_power(audio.samples())?;
        Ok(PowerSpectrogram {
            data: self.mel_basis.dot(&power),
        })
    }

    /// Mel spectrogram in dB, referenced to the clip's loudest cell
    pub fn extract(&self, audio: &FixedAudio) -> Result<DecibelSpectrogram> {
        Ok(self.power_spectrogram(audio)?.to_decibels())
    }

    /// Centered STFT power, shape `(N_FFT / 2 + 1, n_frames)`
    fn stft_power(&self, signal: &[f32]) -> Result<Array2<f32>> {
        if signal.is_empty() {
            return Err(ClassifyError::Processing(
                "Cannot compute spectrogram of empty audio".to_string(),
            ));
        }

        let pad = N_FFT / 2;
        let mut padded = vec![0.0f32; signal.len() + 2 * pad];
        padded[pad..pad + signal.len()].copy_from_slice(signal);

        let n_frames = Self::frame_count(signal.len());
        let n_bins = N_FFT / 2 + 1;
        let mut power = Array2::<f32>::zeros((n_bins, n_frames));

        let mut frame_buf = vec![0.0f32; N_FFT];
        let mut spectrum = self.fft.make_output_vec();
        let mut scratch = self.fft.make_scratch_vec();

        for frame_idx in 0..n_frames {
            let start = frame_idx * HOP_LENGTH;
            for (i, out) in frame_buf.iter_mut().enumerate() {
                *out = padded[start + i] * self.window[i];
            }

            self.fft
                .process_with_scratch(&mut frame_buf, &mut spectrum, &mut scratch)
                .map_err(|e| ClassifyError::Processing(format!("FFT failed: {:?}", e)))?;

            for (bin, c) in spectrum.iter().enumerate() {
                power[[bin, frame_idx]] = c.re * c.re + c.im * c.im;
            }
        }

        Ok(power)
    }
}

/// Periodic (DFT-even) Hann window
fn periodic_hann(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / size as f64;
            (0.5 - 0.5 * phase.cos()) as f32
        })
        .collect()
}

/// Triangular mel filters on the Slaney scale, area-normalized.
///
/// Returns shape `(n_mels, n_fft / 2 + 1)`, spanning `0 Hz..sample_rate / 2`.
fn slaney_mel_filterbank(sample_rate: f64, n_fft: usize, n_mels: usize) -> Array2<f32> {
    let n_bins = n_fft / 2 + 1;
    let f_max = sample_rate / 2.0;

    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|k| k as f64 * sample_rate / n_fft as f64)
        .collect();

    let mel_max = hz_to_mel(f_max);
    let n_points = n_mels + 2;
    let mel_freqs: Vec<f64> = (0..n_points)
        .map(|i| mel_to_hz(mel_max * i as f64 / (n_points - 1) as f64))
        .collect();

    let mut weights = Array2::<f32>::zeros((n_mels, n_bins));
    for band in 0..n_mels {
        let left = mel_freqs[band];
        let center = mel_freqs[band + 1];
        let right = mel_freqs[band + 2];
        let norm = 2.0 / (right - left);

        for (bin, &f) in fft_freqs.iter().enumerate() {
            let lower = (f - left) / (center - left);
            let upper = (right - f) / (right - center);
            let w = lower.min(upper).max(0.0);
            weights[[band, bin]] = (w * norm) as f32;
        }
    }

    weights
}

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Slaney mel scale: linear below 1 kHz, logarithmic above
fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}
