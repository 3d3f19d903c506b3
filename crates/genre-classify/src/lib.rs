//! Genre Classify - model execution and request handling for genre classification
//!
//! Builds on `genre-core`'s feature pipeline:
//! - [`engine`]: the `GenreModel` trait and its ONNX Runtime implementation
//! - [`models`]: locating and downloading the model artifact
//! - [`context`]: the shared, readiness-aware `InferenceContext`
//! - [`service`]: format checks, upload staging and the `classify` entry point
//! - [`response`]: the JSON result shape

pub mod config;
pub mod context;
pub mod engine;
pub mod models;
pub mod response;
pub mod service;

pub use config::{ClassifierConfig, ModelConfig, APP_NAME};
pub use context::InferenceContext;
pub use engine::{EngineLoader, GenreModel, OrtGenreModel};
pub use models::ModelStore;
pub use response::ClassificationResponse;
pub use service::{classify, AudioSource, ClassificationService};
