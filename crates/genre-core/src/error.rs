//! Classification error types
//!
//! Every pipeline stage returns [`Result`]; [`ClassifyError::kind`] gives the
//! failure classification reported back to callers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while classifying an audio file
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// Model artifact missing, corrupt, or violating the load-time shape contract
    #[error("Failed to load ML model: {0}")]
    Initialization(String),

    /// Engine never became ready; carries the last load error if any
    #[error("Inference engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Unsupported file format: {0}. Please upload .wav, .mp3, .flac, or .ogg.")]
    UnsupportedFormat(String),

    /// Missing or empty upload, or failure staging it for decoding
    #[error("Upload rejected: {0}")]
    Upload(String),

    #[error("Failed to read audio file: {path}")]
    AudioRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Audio decoding failed: {0}")]
    Decode(String),

    #[error("Audio processing failed: {0}")]
    Processing(String),

    #[error("Prediction failed: {0}")]
    Inference(String),
}

impl ClassifyError {
    /// Failure classification for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Initialization(_) => ErrorKind::Initialization,
            Self::EngineUnavailable(_) => ErrorKind::EngineUnavailable,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::Upload(_) => ErrorKind::Upload,
            Self::AudioRead { .. } | Self::Decode(_) => ErrorKind::Decode,
            Self::Processing(_) => ErrorKind::Processing,
            Self::Inference(_) => ErrorKind::Inference,
        }
    }
}

/// Failure classification, stable across error message changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Initialization,
    EngineUnavailable,
    UnsupportedFormat,
    Upload,
    Decode,
    Processing,
    Inference,
}

impl ErrorKind {
    /// Whether the failure was caused by the submitted audio rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnsupportedFormat | Self::Upload | Self::Decode)
    }
}

/// Result type for classification operations
pub type Result<T> = std::result::Result<T, ClassifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_is_decode_kind() {
        let err = ClassifyError::AudioRead {
            path: PathBuf::from("/missing.wav"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.kind().is_client_error());
    }

    #[test]
    fn test_server_side_kinds() {
        assert!(!ErrorKind::Initialization.is_client_error());
        assert!(!ErrorKind::EngineUnavailable.is_client_error());
        assert!(!ErrorKind::Processing.is_client_error());
        assert!(!ErrorKind::Inference.is_client_error());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_yaml::to_string(&ErrorKind::UnsupportedFormat).unwrap();
        assert_eq!(json.trim(), "unsupported_format");
    }
}
