//! JSON shape of a classification outcome
//!
//! Success: `{"success": true, "predicted_genre": "rock", "confidence": 55.0}`
//! Failure: `{"error": "...", "kind": "decode"}`

use genre_core::{ClassifyError, ErrorKind, PredictionResult};
use serde::{de, Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassificationResponse {
    Success {
        #[serde(deserialize_with = "deserialize_true")]
        success: bool,
        predicted_genre: String,
        confidence: f32,
    },
    Failure {
        error: String,
        kind: ErrorKind,
    },
}

/// Only `true` marks a success body
fn deserialize_true<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    if bool::deserialize(deserializer)? {
        Ok(true)
    } else {
        Err(de::Error::custom("success flag must be true"))
    }
}

impl ClassificationResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failure kind, if any
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

impl From<PredictionResult> for ClassificationResponse {
    fn from(result: PredictionResult) -> Self {
        Self::Success {
            success: true,
            predicted_genre: result.genre().to_string(),
            confidence: result.confidence(),
        }
    }
}

impl From<&ClassifyError> for ClassificationResponse {
    fn from(error: &ClassifyError) -> Self {
        Self::Failure {
            error: error.to_string(),
            kind: error.kind(),
        }
    }
}

impl From<genre_core::Result<PredictionResult>> for ClassificationResponse {
    fn from(result: genre_core::Result<PredictionResult>) -> Self {
        match result {
            Ok(prediction) => prediction.into(),
            Err(e) => (&e).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_json() {
        let err = ClassifyError::UnsupportedFormat("notes.txt".to_string());
        let response = ClassificationResponse::from(&err);
        assert!(!response.is_success());
        assert_eq!(response.error_kind(), Some(ErrorKind::UnsupportedFormat));

        let json: serde_json::Value = serde_json::to_value(&response).unwrap();
        assert_eq!(json["kind"], "unsupported_format");
        assert!(json["error"].as_str().unwrap().contains("notes.txt"));
        assert!(json.get("success").is_none());
    }

    #[test]
    fn test_success_json_parses_back() {
        let json = r#"{"success":true,"predicted_genre":"jazz","confidence":81.5}"#;
        let response: ClassificationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response,
            ClassificationResponse::Success {
                success: true,
                predicted_genre: "jazz".to_string(),
                confidence: 81.5,
            }
        );
        assert_eq!(serde_json::to_string(&response).unwrap(), json);
    }

    #[test]
    fn test_false_success_flag_is_rejected() {
        let json = r#"{"success":false,"predicted_genre":"jazz","confidence":81.5}"#;
        assert!(serde_json::from_str::<ClassificationResponse>(json).is_err());

        let json = r#"{"error":"Prediction failed: boom","kind":"inference"}"#;
        let response: ClassificationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.error_kind(), Some(ErrorKind::Inference));
    }
}
