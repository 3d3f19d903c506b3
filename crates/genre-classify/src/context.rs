//! Shared inference context
//!
//! One [`InferenceContext`] is built at startup and shared (via `Arc`) by all
//! request handlers. It owns the vocabulary, the feature pipeline and the
//! engine. The engine is loaded once; if loading fails the context stays
//! usable but reports every request as `EngineUnavailable` until a later
//! [`InferenceContext::ensure_ready`] succeeds.

use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use genre_core::{
    AudioDecoder, ClassifyError, DecisionMaker, FeaturePipeline, GenreVocabulary, NormalizedTensor,
    PredictionResult, RawAudio, Result,
};

use crate::config::ClassifierConfig;
use crate::engine::{EngineLoader, GenreModel, OrtGenreModel};

/// Vocabulary, feature pipeline and engine shared by concurrent requests
pub struct InferenceContext {
    vocabulary: GenreVocabulary,
    features: FeaturePipeline,
    decoder: AudioDecoder,
    decision: DecisionMaker,
    engine: OnceLock<Arc<dyn GenreModel>>,
    loader: Option<EngineLoader>,
    /// Last load failure; the lock also serializes load attempts
    load_state: Mutex<Option<String>>,
}

impl InferenceContext {
    /// Context around an already-loaded engine
    pub fn with_engine(vocabulary: GenreVocabulary, engine: Arc<dyn GenreModel>) -> Self {
        let context = Self::empty(vocabulary, None);
        // Freshly created, so the cell is empty
        let _ = context.engine.set(engine);
        context
    }

    /// Context that loads its engine through `loader`.
    ///
    /// The first attempt happens here. A failure is logged and remembered,
    /// not returned.
    pub fn with_loader(vocabulary: GenreVocabulary, loader: EngineLoader) -> Self {
        let context = Self::empty(vocabulary, Some(loader));
        if let Err(e) = context.ensure_ready() {
            log::error!("Genre model failed to load: {}", e);
        }
        context
    }

    /// Context for a configuration, using the ONNX Runtime engine.
    ///
    /// Fails only when the configured vocabulary itself is invalid.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        let vocabulary = GenreVocabulary::new(config.genres.iter().cloned())?;
        Ok(Self::with_loader(
            vocabulary,
            OrtGenreModel::loader(config.model.clone()),
        ))
    }

    fn empty(vocabulary: GenreVocabulary, loader: Option<EngineLoader>) -> Self {
        Self {
            vocabulary,
            features: FeaturePipeline::new(),
            decoder: AudioDecoder::default(),
            decision: DecisionMaker,
            engine: OnceLock::new(),
            loader,
            load_state: Mutex::new(None),
        }
    }

    /// Whether an engine is loaded
    pub fn is_ready(&self) -> bool {
        self.engine.get().is_some()
    }

    /// Load the engine if it is not loaded yet.
    ///
    /// Concurrent callers wait for a single attempt. Without a loader the
    /// previous state is returned as is.
    pub fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }

        // A loader that panicked left no engine behind, so the state is still valid
        let mut state = self.load_state.lock().unwrap_or_else(PoisonError::into_inner);

        // Another caller may have finished loading while we waited
        if self.is_ready() {
            return Ok(());
        }

        let Some(loader) = &self.loader else {
            return Err(self.unavailable(state.as_deref()));
        };

        match loader(&self.vocabulary) {
            Ok(engine) => {
                log::info!(
                    "Genre engine ready: {} ({} genres)",
                    engine.name(),
                    self.vocabulary.len()
                );
                let _ = self.engine.set(engine);
                *state = None;
                Ok(())
            }
            Err(e) => {
                *state = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// The loaded engine, or `EngineUnavailable` carrying the last load error
    pub fn engine(&self) -> Result<&Arc<dyn GenreModel>> {
        match self.engine.get() {
            Some(engine) => Ok(engine),
            None => {
                let last = self.last_error();
                Err(self.unavailable(last.as_deref()))
            }
        }
    }

    /// Message of the most recent failed load, if any
    pub fn last_error(&self) -> Option<String> {
        self.load_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn unavailable(&self, last_error: Option<&str>) -> ClassifyError {
        match last_error {
            Some(e) => ClassifyError::EngineUnavailable(e.to_string()),
            None => ClassifyError::EngineUnavailable("no model loaded".to_string()),
        }
    }

    pub fn vocabulary(&self) -> &GenreVocabulary {
        &self.vocabulary
    }

    pub fn decoder(&self) -> &AudioDecoder {
        &self.decoder
    }

    pub fn features(&self) -> &FeaturePipeline {
        &self.features
    }

    pub fn decision(&self) -> &DecisionMaker {
        &self.decision
    }

    /// Run the engine on a prepared tensor and return the raw scores
    pub fn predict_scores(&self, tensor: &NormalizedTensor) -> Result<Vec<f32>> {
        let engine = self.engine()?;
        let scores = engine.predict(tensor)?;
        log::debug!("{} produced {} scores", engine.name(), scores.len());
        Ok(scores)
    }

    /// Features, inference and decision for already-decoded audio
    pub fn classify_audio(&self, audio: &RawAudio) -> Result<PredictionResult> {
        // Checked first so an unready service does no feature work
        self.engine()?;
        let tensor = self.features.process(audio)?;
        let scores = self.predict_scores(&tensor)?;

        if log::log_enabled!(log::Level::Debug) {
            if let Ok(top) = self.decision.top_k(&scores, &self.vocabulary, 3) {
                let summary: Vec<String> = top
                    .iter()
                    .map(|p| format!("{} {:.1}%", p.genre(), p.confidence()))
                    .collect();
                log::debug!("Top genres: {}", summary.join(", "));
            }
        }

        self.decision.decide(&scores, &self.vocabulary)
    }

    /// Decode and classify a file on disk
    pub fn classify_file(&self, path: &Path) -> Result<PredictionResult> {
        self.engine()?;
        let audio = self.decoder.decode_file(path)?;
        self.classify_audio(&audio)
    }

    /// Decode and classify an in-memory file
    pub fn classify_bytes(
        &self,
        bytes: Vec<u8>,
        extension: Option<&str>,
    ) -> Result<PredictionResult> {
        self.engine()?;
        let audio = self.decoder.decode_bytes(bytes, extension)?;
        self.classify_audio(&audio)
    }
}
