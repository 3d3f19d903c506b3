//! Time-axis fixing and global min-max scaling

use ndarray::{s, Array2};

use super::mel::DecibelSpectrogram;
use super::{NORM_EPSILON, TARGET_T};
use crate::error::{ClassifyError, Result};

/// dB grid with exactly `target_frames` columns
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSpectrogram {
    data: Array2<f32>,
}

impl FixedSpectrogram {
    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }
}

/// Fixed grid rescaled so its minimum is 0 and its maximum is ~1
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSpectrogram {
    data: Array2<f32>,
}

impl NormalizedSpectrogram {
    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }
}

/// Forces the frame count and scales amplitudes into `[0, 1]`
#[derive(Debug, Clone)]
pub struct FrameNormalizer {
    target_frames: usize,
    epsilon: f32,
}

impl Default for FrameNormalizer {
    fn default() -> Self {
        Self {
            target_frames: TARGET_T,
            epsilon: NORM_EPSILON,
        }
    }
}

impl FrameNormalizer {
    pub fn new(target_frames: usize, epsilon: f32) -> Self {
        Self {
            target_frames,
            epsilon,
        }
    }

    /// Fix the frame count, then min-max normalize
    pub fn apply(&self, spec: &DecibelSpectrogram) -> Result<NormalizedSpectrogram> {
        let fixed = self.fix_frames(spec)?;
        Ok(self.normalize(&fixed))
    }

    /// Truncate to the first `target_frames` columns or right-pad with 0 dB.
    ///
    /// Padding is literal zero, not the dB floor.
    pub fn fix_frames(&self, spec: &DecibelSpectrogram) -> Result<FixedSpectrogram> {
        let data = spec.data();
        if data.nrows() == 0 {
            return Err(ClassifyError::Processing(
                "Spectrogram has no mel bands".to_string(),
            ));
        }

        let keep = data.ncols().min(self.target_frames);
        let mut fixed = Array2::<f32>::zeros((data.nrows(), self.target_frames));
        fixed
            .slice_mut(s![.., ..keep])
            .assign(&data.slice(s![.., ..keep]));

        Ok(FixedSpectrogram { data: fixed })
    }

    /// Global (whole-grid) min-max scaling: `(v - min) / (max - min + ε)`
    pub fn normalize(&self, spec: &FixedSpectrogram) -> NormalizedSpectrogram {
        let data = spec.data();
        let min = data.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = data.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let range = max - min + self.epsilon;

        NormalizedSpectrogram {
            data: data.mapv(|v| (v - min) / range),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::N_MELS;

    fn ramp(rows: usize, cols: usize) -> DecibelSpectrogram {
        let data = Array2::from_shape_fn((rows, cols), |(r, c)| -((r * cols + c) as f32) * 0.01);
        DecibelSpectrogram::from_array(data)
    }

    #[test]
    fn test_output_shape_for_any_frame_count() {
        let normalizer = FrameNormalizer::default();
        for &cols in &[1, TARGET_T, 3 * TARGET_T] {
            let out = normalizer.apply(&ramp(N_MELS, cols)).unwrap();
            assert_eq!(out.dim(), (N_MELS, TARGET_T), "input with {} columns", cols);
        }
    }

    #[test]
    fn test_padding_is_zero_on_the_right() {
        let spec = ramp(4, 3);
        let fixed = FrameNormalizer::new(6, NORM_EPSILON).fix_frames(&spec).unwrap();
        assert_eq!(fixed.data().slice(s![.., ..3]), spec.data().view());
        assert!(fixed.data().slice(s![.., 3..]).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_truncation_keeps_first_frames() {
        let spec = ramp(2, 10);
        let fixed = FrameNormalizer::new(4, NORM_EPSILON).fix_frames(&spec).unwrap();
        assert_eq!(fixed.data().view(), spec.data().slice(s![.., ..4]));
    }

    #[test]
    fn test_values_within_unit_range() {
        let out = FrameNormalizer::default().apply(&ramp(N_MELS, 200)).unwrap();
        let min = out.data().iter().cloned().fold(f32::MAX, f32::min);
        let max = out.data().iter().cloned().fold(f32::MIN, f32::max);
        assert_eq!(min, 0.0);
        assert!(max <= 1.0 + NORM_EPSILON && max > 0.999, "max = {}", max);
    }

    #[test]
    fn test_normalization_is_global_not_per_row() {
        let data = Array2::from_shape_vec((2, 2), vec![-10.0, -10.0, 0.0, 0.0]).unwrap();
        let out = FrameNormalizer::new(2, NORM_EPSILON)
            .apply(&DecibelSpectrogram::from_array(data))
            .unwrap();
        // Row 0 is constant but is still scaled against the whole grid
        assert_eq!(out.data()[[0, 0]], 0.0);
        assert!(out.data()[[1, 1]] > 0.999);
    }

    #[test]
    fn test_constant_grid_does_not_divide_by_zero() {
        let data = Array2::from_elem((N_MELS, TARGET_T), -42.0f32);
        let out = FrameNormalizer::default()
            .apply(&DecibelSpectrogram::from_array(data))
            .unwrap();
        assert!(out.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_padded_zero_can_be_the_maximum() {
        // All-negative dB with padding: the 0 dB pad becomes the global max
        let spec = DecibelSpectrogram::from_array(Array2::from_elem((3, 2), -20.0f32));
        let out = FrameNormalizer::new(4, NORM_EPSILON).apply(&spec).unwrap();
        assert_eq!(out.data()[[0, 0]], 0.0);
        assert!(out.data()[[0, 3]] > 0.999);
    }

    #[test]
    fn test_empty_rows_rejected() {
        let spec = DecibelSpectrogram::from_array(Array2::zeros((0, 5)));
        assert!(FrameNormalizer::default().apply(&spec).is_err());
    }
}
