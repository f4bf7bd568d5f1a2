//! Risk signals computed per request.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Binary outcome of the anomaly scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyLabel {
    Normal,
    Anomalous,
}

impl std::fmt::Display for AnomalyLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalyLabel::Normal => write!(f, "normal"),
            AnomalyLabel::Anomalous => write!(f, "anomalous"),
        }
    }
}

/// Intent categories offered to the zero-shot classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    Benign,
    Suspicious,
    Malicious,
}

impl IntentLabel {
    /// Candidate labels, in the order they are offered to classifiers.
    pub const ALL: [IntentLabel; 3] = [
        IntentLabel::Benign,
        IntentLabel::Suspicious,
        IntentLabel::Malicious,
    ];
}

impl std::fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntentLabel::Benign => write!(f, "benign"),
            IntentLabel::Suspicious => write!(f, "suspicious"),
            IntentLabel::Malicious => write!(f, "malicious"),
        }
    }
}

impl std::str::FromStr for IntentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "benign" => Ok(IntentLabel::Benign),
            "suspicious" => Ok(IntentLabel::Suspicious),
            "malicious" => Ok(IntentLabel::Malicious),
            _ => Err(format!("Unknown intent label: {}", s)),
        }
    }
}

/// Output of an anomaly scorer: higher scores are more normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyScore {
    pub score: f64,
    pub label: AnomalyLabel,
}

/// Top label and its confidence from an intent classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntentPrediction {
    pub label: IntentLabel,
    pub confidence: f64,
}

/// Every signal the cascade consumes, computed fresh for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalBundle {
    pub keyword_flag: bool,
    pub anomaly_score: f64,
    pub anomaly_label: AnomalyLabel,
    pub intent_label: IntentLabel,
    pub intent_confidence: f64,
}

impl SignalBundle {
    pub fn new(keyword_flag: bool, anomaly: AnomalyScore, intent: IntentPrediction) -> Self {
        Self {
            keyword_flag,
            anomaly_score: anomaly.score,
            anomaly_label: anomaly.label,
            intent_label: intent.label,
            intent_confidence: intent.confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_label_parsing() {
        assert_eq!(" Malicious ".parse::<IntentLabel>(), Ok(IntentLabel::Malicious));
        assert!("hostile".parse::<IntentLabel>().is_err());
    }

    #[test]
    fn test_labels_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&AnomalyLabel::Anomalous).unwrap(),
            "\"anomalous\""
        );
        assert_eq!(
            serde_json::to_string(&IntentLabel::Suspicious).unwrap(),
            "\"suspicious\""
        );
    }
}
