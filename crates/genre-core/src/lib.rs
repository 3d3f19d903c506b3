//! Genre Core - audio-to-feature pipeline and decision logic for genre classification
//!
//! Turns an audio file into the fixed `(1, 128, 128, 1)` mel spectrogram tensor
//! the classifier expects, and turns the classifier's probability vector back
//! into a genre label with a confidence percentage. Model execution itself
//! lives behind a trait in `genre-classify`.

pub mod audio;
pub mod config;
pub mod error;
pub mod features;
pub mod genre;

pub use audio::{AudioDecoder, AudioFormat, RawAudio};
pub use error::{ClassifyError, ErrorKind, Result};
pub use features::{FeaturePipeline, NormalizedTensor};
pub use genre::{DecisionMaker, GenreVocabulary, PredictionResult, DEFAULT_GENRES};
