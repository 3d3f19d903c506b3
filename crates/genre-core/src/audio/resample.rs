//! Band-limited sample rate conversion via rubato

use rubato::{FftFixedInOut, Resampler};

use crate::error::{ClassifyError, Result};

/// Input chunk size requested from the FFT resampler
const RESAMPLE_CHUNK: usize = 1024;

/// Resample mono audio from `from_rate` to `to_rate`.
///
/// The resampler's output delay is compensated so the result lines up with the
/// input, and the length is `round(len * to_rate / from_rate)`.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(ClassifyError::Processing(format!(
            "Invalid sample rate conversion {} Hz -> {} Hz",
            from_rate, to_rate
        )));
    }

    let mut resampler =
        FftFixedInOut::<f32>::new(from_rate as usize, to_rate as usize, RESAMPLE_CHUNK, 1)
            .map_err(|e| ClassifyError::Processing(format!("Resampler init failed: {}", e)))?;

    let chunk_size = resampler.input_frames_next();
    let delay = resampler.output_delay();
    let expected_len =
        (samples.len() as f64 * to_rate as f64 / from_rate as f64).round() as usize;

    let mut output = Vec::with_capacity(expected_len + delay + resampler.output_frames_max());
    let mut chunk = vec![0.0f32; chunk_size];
    let mut consumed = 0;

    // Keep feeding (zero-padded) chunks until the delayed tail has been flushed
    while output.len() < expected_len + delay {
        let remaining = samples.len().saturating_sub(consumed);
        let take = remaining.min(chunk_size);
        chunk[..take].copy_from_slice(&samples[consumed..consumed + take]);
        chunk[take..].fill(0.0);
        consumed += take;

        let result = resampler
            .process(&[&chunk], None)
            .map_err(|e| ClassifyError::Processing(format!("Resampling failed: {}", e)))?;
        output.extend_from_slice(&result[0]);
    }

    output.drain(..delay);
    output.truncate(expected_len);

    log::debug!(
        "Resampled {} samples @ {}Hz -> {} samples @ {}Hz",
        samples.len(),
        from_rate,
        output.len(),
        to_rate
    );

    Ok(output)
}
