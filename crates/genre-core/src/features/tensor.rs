//! Model input assembly

use ndarray::{Array4, Axis};

use super::frames::NormalizedSpectrogram;
use super::INPUT_SHAPE;
use crate::error::{ClassifyError, Result};

/// Model input, shape `(1, N_MELS, TARGET_T, 1)` in `f32`
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    data: Array4<f32>,
}

impl NormalizedTensor {
    pub fn shape(&self) -> [usize; 4] {
        let (b, h, w, c) = self.data.dim();
        [b, h, w, c]
    }

    pub fn array(&self) -> &Array4<f32> {
        &self.data
    }

    /// Flat row-major values
    pub fn values(&self) -> &[f32] {
        // Freshly assembled tensors are always in standard layout
        self.data.as_slice().unwrap_or(&[])
    }

    pub fn into_array(self) -> Array4<f32> {
        self.data
    }
}

/// Add the leading batch and trailing channel axes. Values are unchanged.
pub fn assemble(spec: &NormalizedSpectrogram) -> Result<NormalizedTensor> {
    let (height, width) = spec.dim();
    if [1, height, width, 1] != INPUT_SHAPE {
        return Err(ClassifyError::Processing(format!(
            "Spectrogram is {}x{}, model expects {}x{}",
            height, width, INPUT_SHAPE[1], INPUT_SHAPE[2]
        )));
    }

    let data = spec
        .data()
        .to_owned()
        .insert_axis(Axis(2))
        .insert_axis(Axis(0));

    Ok(NormalizedTensor {
        data: data.as_standard_layout().into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{DecibelSpectrogram, FrameNormalizer, N_MELS, TARGET_T};
    use ndarray::Array2;

    #[test]
    fn test_assemble_shape_and_values() {
        let db = Array2::from_shape_fn((N_MELS, TARGET_T), |(r, c)| -((r + c) as f32));
        let normalized = FrameNormalizer::default()
            .apply(&DecibelSpectrogram::from_array(db))
            .unwrap();

        let tensor = assemble(&normalized).unwrap();
        assert_eq!(tensor.shape(), [1, N_MELS, TARGET_T, 1]);
        assert_eq!(tensor.values().len(), N_MELS * TARGET_T);
        assert_eq!(tensor.array()[[0, 3, 7, 0]], normalized.data()[[3, 7]]);
        assert_eq!(tensor.values(), normalized.data().as_slice().unwrap());
    }

    #[test]
    fn test_assemble_rejects_wrong_shape() {
        let db = DecibelSpectrogram::from_array(Array2::zeros((64, 10)));
        let normalized = FrameNormalizer::new(10, 1e-6).apply(&db).unwrap();
        let err = assemble(&normalized).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Processing);
    }
}
