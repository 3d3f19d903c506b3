//! Classifier configuration
//!
//! Stored as YAML. Default location: `<config_dir>/genre-classifier/config.yaml`
//!
//! Only deployment concerns live here (where the model is, how many threads
//! it gets, which labels it was trained with). Feature extraction parameters
//! are fixed constants in `genre_core::features`.

use std::path::PathBuf;

use genre_core::config::ConfigFile;
use genre_core::DEFAULT_GENRES;
use serde::{Deserialize, Serialize};

/// Application name used for config and cache directories
pub const APP_NAME: &str = "genre-classifier";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Model artifact and runtime settings
    pub model: ModelConfig,
    /// Genre labels in model output order
    pub genres: Vec<String>,
    /// Where uploads are staged while decoding (defaults to the OS temp dir)
    pub staging_dir: Option<PathBuf>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            genres: DEFAULT_GENRES.iter().map(|s| s.to_string()).collect(),
            staging_dir: None,
        }
    }
}

impl ClassifierConfig {
    /// Resolved staging directory
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl ConfigFile for ClassifierConfig {
    fn validate(&mut self) {
        self.model.validate();
        if self.genres.is_empty() {
            log::warn!("Config has no genre labels, using the default vocabulary");
            self.genres = DEFAULT_GENRES.iter().map(|s| s.to_string()).collect();
        }
    }
}

/// ONNX model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX artifact (defaults to the model cache)
    pub path: Option<PathBuf>,
    /// Fetched into `path` when the artifact is missing
    pub download_url: Option<String>,
    /// Name of the model's input tensor
    pub input_name: String,
    /// ONNX Runtime intra-op threads (1-16)
    pub intra_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            download_url: None,
            // Keras default name for the first Input layer, kept by tf2onnx
            input_name: String::from("input_1"),
            intra_threads: 1,
        }
    }
}

impl ModelConfig {
    /// Clamp values to supported ranges
    pub fn validate(&mut self) {
        self.intra_threads = self.intra_threads.clamp(1, 16);
        if self.input_name.trim().is_empty() {
            self.input_name = ModelConfig::default().input_name;
        }
    }
}
