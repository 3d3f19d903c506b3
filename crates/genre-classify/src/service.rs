//! Classification service - the request-facing entry point
//!
//! The `ClassificationService` wraps a shared [`InferenceContext`] and handles:
//! - Readiness gating (unready engines are reported, never retried implicitly)
//! - Format validation before any I/O
//! - Staging uploads to uniquely named temp files that are always removed

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use genre_core::{AudioFormat, ClassifyError, PredictionResult, Result};

use crate::config::ClassifierConfig;
use crate::context::InferenceContext;

/// Audio handed to [`classify`]
#[derive(Debug, Clone, Copy)]
pub enum AudioSource<'a> {
    /// A local file
    Path(&'a Path),
    /// An in-memory file; the extension is a container hint
    Bytes { data: &'a [u8], extension: &'a str },
}

/// Classify one clip against a shared context.
///
/// The format is checked first, then readiness; loading is never retried here.
pub fn classify(context: &InferenceContext, source: AudioSource<'_>) -> Result<PredictionResult> {
    match source {
        AudioSource::Path(path) => {
            AudioFormat::from_path(path)?;
            context.classify_file(path)
        }
        AudioSource::Bytes { data, extension } => {
            let format = AudioFormat::from_extension(extension)
                .ok_or_else(|| ClassifyError::UnsupportedFormat(extension.to_string()))?;
            if data.is_empty() {
                return Err(ClassifyError::Upload("Audio payload is empty".to_string()));
            }
            context.classify_bytes(data.to_vec(), Some(format.extension()))
        }
    }
}

/// Main service for genre classification
///
/// Example usage:
/// ```ignore
/// let service = ClassificationService::from_config(&config)?;
/// service.ensure_ready()?;
/// let result = service.classify_upload("song.mp3", &bytes)?;
/// ```
pub struct ClassificationService {
    context: Arc<InferenceContext>,
    staging_dir: PathBuf,
}

impl ClassificationService {
    pub fn new(context: Arc<InferenceContext>, staging_dir: PathBuf) -> Self {
        Self {
            context,
            staging_dir,
        }
    }

    /// Build the context (attempting the model load) from configuration
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        let context = InferenceContext::from_config(config)?;
        Ok(Self::new(Arc::new(context), config.staging_dir()))
    }

    pub fn context(&self) -> &Arc<InferenceContext> {
        &self.context
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn is_ready(&self) -> bool {
        self.context.is_ready()
    }

    /// Retry a failed model load; call before classifying
    pub fn ensure_ready(&self) -> Result<()> {
        self.context.ensure_ready()
    }

    /// Classify a local file
    pub fn classify_path(&self, path: impl AsRef<Path>) -> Result<PredictionResult> {
        let path = path.as_ref();
        self.context.engine()?;
        let result = classify(&self.context, AudioSource::Path(path));
        log_outcome(&path.display().to_string(), &result);
        result
    }

    /// Classify an in-memory file without touching the filesystem
    pub fn classify_bytes(&self, bytes: &[u8], extension: &str) -> Result<PredictionResult> {
        self.context.engine()?;
        classify(
            &self.context,
            AudioSource::Bytes {
                data: bytes,
                extension,
            },
        )
    }

    /// Classify an uploaded file.
    ///
    /// `file_name` is only used for its extension; the payload is staged under
    /// a generated name in the staging directory and removed afterwards.
    pub fn classify_upload(&self, file_name: &str, bytes: &[u8]) -> Result<PredictionResult> {
        self.context.engine()?;

        if bytes.is_empty() {
            return Err(ClassifyError::Upload(format!("No audio data in '{}'", file_name)));
        }
        let format = AudioFormat::from_path(file_name)?;

        let staged = self.stage(bytes, format)?;
        log::debug!("Staged upload '{}' at {:?}", file_name, staged.path());

        let result = classify(&self.context, AudioSource::Path(staged.path()));
        log_outcome(file_name, &result);

        // Dropping the handle deletes the staged file
        if let Err(e) = staged.close() {
            log::warn!("Failed to remove staged upload: {}", e);
        }
        result
    }

    fn stage(&self, bytes: &[u8], format: AudioFormat) -> Result<tempfile::NamedTempFile> {
        fs::create_dir_all(&self.staging_dir).map_err(|e| {
            ClassifyError::Upload(format!(
                "Failed to create staging dir {:?}: {}",
                self.staging_dir, e
            ))
        })?;

        let suffix = format!(".{}", format.extension());
        let mut staged = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(&self.staging_dir)
            .map_err(|e| ClassifyError::Upload(format!("Failed to stage upload: {}", e)))?;

        staged
            .write_all(bytes)
            .and_then(|_| staged.flush())
            .map_err(|e| ClassifyError::Upload(format!("Failed to write staged upload: {}", e)))?;

        Ok(staged)
    }
}

fn log_outcome(name: &str, result: &Result<PredictionResult>) {
    match result {
        Ok(prediction) => log::info!(
            "{}: {} ({:.2}%)",
            name,
            prediction.genre(),
            prediction.confidence()
        ),
        Err(e) => log::warn!("{}: classification failed: {}", name, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineLoader, GenreModel};
    use genre_core::{ErrorKind, GenreVocabulary, NormalizedTensor};

    struct UniformModel;

    impl GenreModel for UniformModel {
        fn predict(&self, _input: &NormalizedTensor) -> Result<Vec<f32>> {
            Ok(vec![0.1; 10])
        }

        fn name(&self) -> &'static str {
            "uniform"
        }
    }

    fn ready_service(staging: &Path) -> ClassificationService {
        let context =
            InferenceContext::with_engine(GenreVocabulary::default(), Arc::new(UniformModel));
        ClassificationService::new(Arc::new(context), staging.to_path_buf())
    }

    #[test]
    fn test_unsupported_extension_rejected_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("staging");
        let service = ready_service(&staging);

        let err = service.classify_upload("notes.txt", b"hello").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert!(!staging.exists(), "nothing should be staged for a rejected format");
    }

    #[test]
    fn test_empty_upload_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = ready_service(dir.path());

        let err = service.classify_upload("song.mp3", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upload);
    }

    #[test]
    fn test_bytes_need_known_extension() {
        let dir = tempfile::tempdir().unwrap();
        let service = ready_service(dir.path());

        let err = service.classify_bytes(b"RIFF", "aiff").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn test_unready_service_reports_engine_unavailable() {
        let loader: EngineLoader =
            Box::new(|_| Err(ClassifyError::Initialization("no weights".to_string())));
        let context = InferenceContext::with_loader(GenreVocabulary::default(), loader);
        let dir = tempfile::tempdir().unwrap();
        let service = ClassificationService::new(Arc::new(context), dir.path().to_path_buf());

        assert!(!service.is_ready());
        let err = service.classify_upload("song.wav", b"RIFF....").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EngineUnavailable);
        assert!(err.to_string().contains("no weights"));

        assert_eq!(
            service.ensure_ready().unwrap_err().kind(),
            ErrorKind::Initialization
        );
    }
}
