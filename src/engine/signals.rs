//! Signal adapter contracts.
//!
//! The decision engine only sees these traits. Concrete backends (hashing
//! embedder, isolation forest, centroid or OpenRouter classifier) are chosen
//! at startup and shared read-only across requests.

use std::sync::Arc;

use crate::domain::{AnomalyScore, IntentLabel, IntentPrediction};
use crate::error::ShieldResult;

/// Maps text to a fixed-length vector.
pub trait Embedder: Send + Sync {
    /// Length of every vector returned by [`Embedder::encode`].
    fn dimension(&self) -> usize;

    fn encode(&self, text: &str) -> ShieldResult<Vec<f64>>;
}

/// A fitted novelty detector over embedding vectors.
///
/// Fitting happens when the scorer is constructed; scoring never mutates it.
pub trait AnomalyScorer: Send + Sync {
    /// Higher scores are more normal; negative scores are labelled anomalous.
    fn score(&self, vector: &[f64]) -> ShieldResult<AnomalyScore>;
}

/// Zero-shot style classifier over a fixed candidate set.
pub trait IntentClassifier: Send + Sync {
    /// Return the top candidate and its confidence in [0, 1].
    fn classify(&self, text: &str, candidates: &[IntentLabel]) -> ShieldResult<IntentPrediction>;
}

/// Dangerous-term detector.
pub trait KeywordMatcher: Send + Sync {
    fn matches(&self, text: &str) -> bool;
}

/// Case-insensitive keyword list.
#[derive(Debug, Clone)]
pub struct KeywordList {
    keywords: Vec<String>,
}

impl KeywordList {
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

impl KeywordMatcher for KeywordList {
    fn matches(&self, text: &str) -> bool {
        let text_lower = text.to_lowercase();
        self.keywords.iter().any(|kw| text_lower.contains(kw.as_str()))
    }
}

/// Models built once at process start and passed to the decision engine.
#[derive(Clone)]
pub struct SignalModels {
    pub embedder: Arc<dyn Embedder>,
    pub anomaly: Arc<dyn AnomalyScorer>,
    pub intent: Arc<dyn IntentClassifier>,
    pub keywords: Arc<dyn KeywordMatcher>,
}
