//! Genre vocabulary and the arg-max decision over model output

use serde::{Deserialize, Serialize};

use crate::error::{ClassifyError, Result};

/// GTZAN label order the bundled classifier was trained with
pub const DEFAULT_GENRES: [&str; 10] = [
    "blues",
    "classical",
    "country",
    "disco",
    "hiphop",
    "jazz",
    "metal",
    "pop",
    "reggae",
    "rock",
];

/// Ordered class labels; index `i` names model output `i`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreVocabulary {
    labels: Vec<String>,
}

impl Default for GenreVocabulary {
    fn default() -> Self {
        Self {
            labels: DEFAULT_GENRES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl GenreVocabulary {
    /// Build a vocabulary; labels must be non-empty, non-blank and unique
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();

        if labels.is_empty() {
            return Err(ClassifyError::Initialization(
                "Genre vocabulary is empty".to_string(),
            ));
        }
        for (i, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(ClassifyError::Initialization(format!(
                    "Genre label {} is blank",
                    i
                )));
            }
            if labels[..i].contains(label) {
                return Err(ClassifyError::Initialization(format!(
                    "Duplicate genre label: {}",
                    label
                )));
            }
        }

        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Final answer for one clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    genre: String,
    /// Probability of `genre` as a percentage
    confidence: f32,
}

impl PredictionResult {
    pub fn genre(&self) -> &str {
        &self.genre
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

/// Turns a probability vector into a [`PredictionResult`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionMaker;

impl DecisionMaker {
    /// Arg-max over `probabilities`; exact ties go to the lowest index.
    ///
    /// The vector need not sum to 1, but must be aligned with `vocabulary`.
    pub fn decide(
        &self,
        probabilities: &[f32],
        vocabulary: &GenreVocabulary,
    ) -> Result<PredictionResult> {
        check_output(probabilities, vocabulary)?;

        let mut best = 0;
        for (i, &p) in probabilities.iter().enumerate().skip(1) {
            if p > probabilities[best] {
                best = i;
            }
        }

        let genre = vocabulary
            .get(best)
            .ok_or_else(|| ClassifyError::Inference(format!("No label for class {}", best)))?;

        Ok(PredictionResult {
            genre: genre.to_string(),
            confidence: probabilities[best] * 100.0,
        })
    }

    /// The `k` most likely genres, best first; ties keep vocabulary order
    pub fn top_k(
        &self,
        probabilities: &[f32],
        vocabulary: &GenreVocabulary,
        k: usize,
    ) -> Result<Vec<PredictionResult>> {
        check_output(probabilities, vocabulary)?;

        let mut ranked: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
        // Stable sort, so equal scores stay in index order
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(k);

        Ok(ranked
            .into_iter()
            .filter_map(|(i, p)| {
                vocabulary.get(i).map(|genre| PredictionResult {
                    genre: genre.to_string(),
                    confidence: p * 100.0,
                })
            })
            .collect())
    }
}

fn check_output(probabilities: &[f32], vocabulary: &GenreVocabulary) -> Result<()> {
    if probabilities.is_empty() {
        return Err(ClassifyError::Inference("Model produced no scores".to_string()));
    }
    if probabilities.len() != vocabulary.len() {
        return Err(ClassifyError::Inference(format!(
            "Model produced {} scores for {} genres",
            probabilities.len(),
            vocabulary.len()
        )));
    }
    if let Some(i) = probabilities.iter().position(|p| !p.is_finite()) {
        return Err(ClassifyError::Inference(format!(
            "Model score {} is not finite",
            i
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_vocabulary_order() {
        let vocab = GenreVocabulary::default();
        assert_eq!(vocab.len(), 10);
        assert_eq!(vocab.get(0), Some("blues"));
        assert_eq!(vocab.get(9), Some("rock"));
    }

    #[test]
    fn test_rock_wins_with_expected_confidence() {
        let mut probs = vec![0.05f32; 9];
        probs.push(0.55);
        let result = DecisionMaker.decide(&probs, &GenreVocabulary::default()).unwrap();
        assert_eq!(result.genre(), "rock");
        assert!((result.confidence() - 55.0).abs() < 1e-4, "confidence = {}", result.confidence());
    }

    #[test]
    fn test_ties_pick_lowest_index() {
        let probs = [0.1, 0.3, 0.0, 0.3, 0.3, 0.0, 0.0, 0.0, 0.0, 0.0];
        let result = DecisionMaker.decide(&probs, &GenreVocabulary::default()).unwrap();
        assert_eq!(result.genre(), "classical");

        let flat = [0.1f32; 10];
        let result = DecisionMaker.decide(&flat, &GenreVocabulary::default()).unwrap();
        assert_eq!(result.genre(), "blues");
    }

    #[test]
    fn test_unnormalized_scores_are_accepted() {
        let probs = [2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 7.5, 0.0, 0.0, 0.0];
        let result = DecisionMaker.decide(&probs, &GenreVocabulary::default()).unwrap();
        assert_eq!(result.genre(), "metal");
        assert_eq!(result.confidence(), 750.0);
    }

    #[test]
    fn test_length_mismatch_is_inference_error() {
        let err = DecisionMaker
            .decide(&[0.5, 0.5], &GenreVocabulary::default())
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Inference);
        assert!(DecisionMaker.decide(&[], &GenreVocabulary::default()).is_err());
    }

    #[test]
    fn test_nan_is_inference_error() {
        let mut probs = vec![0.1f32; 10];
        probs[4] = f32::NAN;
        assert!(DecisionMaker.decide(&probs, &GenreVocabulary::default()).is_err());
    }

    #[test]
    fn test_top_k_descending_and_stable() {
        let probs = [0.1, 0.3, 0.0, 0.3, 0.2, 0.0, 0.0, 0.1, 0.0, 0.0];
        let top = DecisionMaker
            .top_k(&probs, &GenreVocabulary::default(), 3)
            .unwrap();
        let genres: Vec<&str> = top.iter().map(|r| r.genre()).collect();
        assert_eq!(genres, vec!["classical", "disco", "hiphop"]);
        let best = DecisionMaker
            .decide(&probs, &GenreVocabulary::default())
            .unwrap();
        assert_eq!(top[0].genre(), best.genre());
    }

    #[test]
    fn test_vocabulary_validation() {
        assert!(GenreVocabulary::new(Vec::<String>::new()).is_err());
        assert!(GenreVocabulary::new(["rock", "rock"]).is_err());
        assert!(GenreVocabulary::new(["rock", " "]).is_err());
        let vocab = GenreVocabulary::new(["a", "b"]).unwrap();
        assert_eq!(vocab.labels(), &["a".to_string(), "b".to_string()]);
    }
}
