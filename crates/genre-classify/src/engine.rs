//! Inference engine trait and ONNX Runtime implementation
//!
//! The pipeline only needs `predict(tensor) -> probabilities`. Keeping that
//! behind [`GenreModel`] lets tests inject fixed-output engines and keeps
//! `ort` out of the feature code.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use genre_core::features::INPUT_SHAPE;
use genre_core::{ClassifyError, GenreVocabulary, NormalizedTensor, Result};
use ndarray::Array4;
use ort::session::Session;
use ort::value::Tensor;

use crate::config::ModelConfig;
use crate::models::ModelStore;

/// A pretrained classifier producing one score per genre
pub trait GenreModel: Send + Sync {
    /// Run one `(1, 128, 128, 1)` tensor through the model.
    ///
    /// Returns scores in vocabulary order.
    fn predict(&self, input: &NormalizedTensor) -> Result<Vec<f32>>;

    /// Engine name for logging
    fn name(&self) -> &'static str;
}

/// Builds an engine for a vocabulary; may be called again after a failure
pub type EngineLoader =
    Box<dyn Fn(&GenreVocabulary) -> Result<Arc<dyn GenreModel>> + Send + Sync>;

/// Classifier backed by an ONNX Runtime session
///
/// `Session::run` needs `&mut`, so the session sits behind a mutex and
/// concurrent requests take turns on it.
pub struct OrtGenreModel {
    session: Mutex<Session>,
    input_name: String,
}

impl OrtGenreModel {
    /// Load an ONNX model and verify its input/output contract.
    ///
    /// A probe inference on an all-zero input must yield exactly
    /// `expected_classes` scores; anything else is an initialization error.
    pub fn load(
        model_path: &Path,
        input_name: &str,
        intra_threads: usize,
        expected_classes: usize,
    ) -> Result<Self> {
        if !model_path.exists() {
            return Err(ClassifyError::Initialization(format!(
                "Model not found: {:?}",
                model_path
            )));
        }

        log::info!("Loading ONNX genre model from {:?}", model_path);
        let session = Session::builder()
            .and_then(|b| b.with_intra_threads(intra_threads))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| {
                ClassifyError::Initialization(format!("Failed to load {:?}: {}", model_path, e))
            })?;

        let model = Self {
            session: Mutex::new(session),
            input_name: input_name.to_string(),
        };

        let probe = model.run(Array4::<f32>::zeros(INPUT_SHAPE)).map_err(|e| {
            ClassifyError::Initialization(format!("Model rejected {:?} input: {}", INPUT_SHAPE, e))
        })?;
        check_output_len(probe.len(), expected_classes)?;

        log::info!("ONNX genre model ready ({} classes)", expected_classes);
        Ok(model)
    }

    /// Loader that resolves the artifact through the [`ModelStore`] on every attempt
    pub fn loader(config: ModelConfig) -> EngineLoader {
        Box::new(move |vocabulary: &GenreVocabulary| {
            let store = ModelStore::new()?;
            let path = store.ensure_model(config.path.as_deref(), config.download_url.as_deref())?;
            let model = OrtGenreModel::load(
                &path,
                &config.input_name,
                config.intra_threads,
                vocabulary.len(),
            )?;
            Ok(Arc::new(model) as Arc<dyn GenreModel>)
        })
    }

    fn run(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        let input_tensor = Tensor::from_array(input)
            .map_err(|e| ClassifyError::Inference(format!("Tensor creation error: {}", e)))?;

        // A panic in an earlier run leaves the session itself usable
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| ClassifyError::Inference(format!("Inference error: {}", e)))?;

        let (_, scores) = outputs
            .iter()
            .next()
            .ok_or_else(|| ClassifyError::Inference("Model produced no output".to_string()))?;

        let (_shape, data) = scores
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifyError::Inference(format!("Output extraction error: {}", e)))?;

        Ok(data.to_vec())
    }
}

/// Load-time contract: one score per vocabulary entry
fn check_output_len(actual: usize, expected_classes: usize) -> Result<()> {
    if actual != expected_classes {
        return Err(ClassifyError::Initialization(format!(
            "Model outputs {} classes, vocabulary has {}",
            actual, expected_classes
        )));
    }
    Ok(())
}

impl GenreModel for OrtGenreModel {
    fn predict(&self, input: &NormalizedTensor) -> Result<Vec<f32>> {
        if input.shape() != INPUT_SHAPE {
            return Err(ClassifyError::Inference(format!(
                "Input shape {:?} does not match model shape {:?}",
                input.shape(),
                INPUT_SHAPE
            )));
        }
        self.run(input.array().clone())
    }

    fn name(&self) -> &'static str {
        "ONNX Runtime"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_model_is_initialization_error() {
        let err = OrtGenreModel::load(Path::new("/nonexistent/model.onnx"), "input_1", 1, 10)
            .err()
            .unwrap();
        assert_eq!(err.kind(), genre_core::ErrorKind::Initialization);
    }

    #[test]
    fn test_output_len_must_match_vocabulary() {
        assert!(check_output_len(10, 10).is_ok());

        let err = check_output_len(400, 10).unwrap_err();
        assert_eq!(err.kind(), genre_core::ErrorKind::Initialization);
        assert!(err.to_string().contains("400"));

        let err = check_output_len(0, 10).unwrap_err();
        assert_eq!(err.kind(), genre_core::ErrorKind::Initialization);
    }

    #[test]
    fn test_load_corrupt_model_is_initialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.onnx");
        std::fs::write(&path, b"this is not a protobuf graph").unwrap();

        let err = OrtGenreModel::load(&path, "input_1", 1, 10).err().unwrap();
        assert_eq!(err.kind(), genre_core::ErrorKind::Initialization);
    }
}
