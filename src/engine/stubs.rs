//! Deterministic collaborator stand-ins for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{AnomalyLabel, AnomalyScore, IntentLabel, IntentPrediction};
use crate::engine::{
    AnomalyScorer, Embedder, IntentClassifier, KeywordList, SignalModels, TextGenerator,
};
use crate::error::{ShieldError, ShieldResult};

/// Embedder returning a constant vector and counting calls.
#[derive(Default)]
pub struct CountingEmbedder {
    pub calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for CountingEmbedder {
    fn dimension(&self) -> usize {
        2
    }

    fn encode(&self, _text: &str) -> ShieldResult<Vec<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0.0, 1.0])
    }
}

pub struct FixedAnomaly(pub f64, pub AnomalyLabel);

impl AnomalyScorer for FixedAnomaly {
    fn score(&self, _vector: &[f64]) -> ShieldResult<AnomalyScore> {
        Ok(AnomalyScore {
            score: self.0,
            label: self.1,
        })
    }
}

pub struct FixedIntent(pub IntentLabel, pub f64);

impl IntentClassifier for FixedIntent {
    fn classify(&self, _text: &str, _candidates: &[IntentLabel]) -> ShieldResult<IntentPrediction> {
        Ok(IntentPrediction {
            label: self.0,
            confidence: self.1,
        })
    }
}

pub struct FailingIntent;

impl IntentClassifier for FailingIntent {
    fn classify(&self, _text: &str, _candidates: &[IntentLabel]) -> ShieldResult<IntentPrediction> {
        Err(ShieldError::collaborator("intent classifier", "model offline"))
    }
}

/// Benign classifier that answers only after a delay.
pub struct SlowIntent(pub Duration);

impl IntentClassifier for SlowIntent {
    fn classify(&self, _text: &str, _candidates: &[IntentLabel]) -> ShieldResult<IntentPrediction> {
        std::thread::sleep(self.0);
        Ok(IntentPrediction {
            label: IntentLabel::Benign,
            confidence: 0.9,
        })
    }
}

pub struct FixedGenerator(pub &'static str);

impl TextGenerator for FixedGenerator {
    fn generate(&self, _prompt: &str) -> ShieldResult<String> {
        Ok(self.0.to_string())
    }
}

/// Models with the given anomaly and intent outcomes and the default
/// dangerous keyword list.
pub fn models(
    anomaly: (f64, AnomalyLabel),
    intent: (IntentLabel, f64),
) -> (SignalModels, Arc<CountingEmbedder>) {
    models_with_intent(anomaly, Arc::new(FixedIntent(intent.0, intent.1)))
}

pub fn models_with_intent(
    anomaly: (f64, AnomalyLabel),
    intent: Arc<dyn IntentClassifier>,
) -> (SignalModels, Arc<CountingEmbedder>) {
    let embedder = Arc::new(CountingEmbedder::default());
    let models = SignalModels {
        embedder: embedder.clone(),
        anomaly: Arc::new(FixedAnomaly(anomaly.0, anomaly.1)),
        intent,
        keywords: Arc::new(KeywordList::new(
            crate::config::PolicyConfig::default().dangerous_keywords,
        )),
    };
    (models, embedder)
}
