//! Decision domain types.
//!
//! Represents the verdict the cascade reached for one request, and the
//! evidence that explains it.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{AnomalyLabel, IntentLabel, SignalBundle};

/// Final categorical verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// Input may proceed.
    Allow,
    /// Input may proceed but is queued for human review.
    Flag,
    /// Input is stopped.
    Block,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Allow => write!(f, "ALLOW"),
            Verdict::Flag => write!(f, "FLAG"),
            Verdict::Block => write!(f, "BLOCK"),
        }
    }
}

/// Which cascade branch produced the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    PromptInjectionIndicators,
    IntentMaliciousHighConf,
    KeywordAndAnomaly,
    SuspiciousOrIso,
    LowRisk,
}

impl ReasonCode {
    /// The verdict each reason implies.
    pub fn verdict(self) -> Verdict {
        match self {
            ReasonCode::PromptInjectionIndicators
            | ReasonCode::IntentMaliciousHighConf
            | ReasonCode::KeywordAndAnomaly => Verdict::Block,
            ReasonCode::SuspiciousOrIso => Verdict::Flag,
            ReasonCode::LowRisk => Verdict::Allow,
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            ReasonCode::PromptInjectionIndicators => "prompt_injection_indicators",
            ReasonCode::IntentMaliciousHighConf => "intent_malicious_high_conf",
            ReasonCode::KeywordAndAnomaly => "keyword_and_anomaly",
            ReasonCode::SuspiciousOrIso => "suspicious_or_iso",
            ReasonCode::LowRisk => "low_risk",
        };
        f.write_str(code)
    }
}

/// Indicators that triggered the injection short-circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionEvidence {
    pub found: Vec<String>,
}

/// Signal values used by the cascade, numbers rounded to 3 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvidence {
    pub keyword: bool,
    pub iso_score: f64,
    pub anomaly_label: AnomalyLabel,
    pub intent_label: IntentLabel,
    pub intent_score: f64,
}

impl From<&SignalBundle> for SignalEvidence {
    fn from(bundle: &SignalBundle) -> Self {
        Self {
            keyword: bundle.keyword_flag,
            iso_score: round3(bundle.anomaly_score),
            anomaly_label: bundle.anomaly_label,
            intent_label: bundle.intent_label,
            intent_score: round3(bundle.intent_confidence),
        }
    }
}

/// Evidence attached to a decision. Only signals that were computed appear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Evidence {
    Injection(InjectionEvidence),
    Signals(SignalEvidence),
}

/// Audit-friendly metadata: the reason code plus its evidence, flattened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionMeta {
    pub reason: ReasonCode,
    #[serde(flatten)]
    pub evidence: Evidence,
}

/// Terminal outcome of the decision cascade for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub verdict: Verdict,
    pub meta: DecisionMeta,
}

impl Decision {
    /// Block because configured injection indicators were found.
    pub fn injection(found: Vec<String>) -> Self {
        Self::new(
            ReasonCode::PromptInjectionIndicators,
            Evidence::Injection(InjectionEvidence { found }),
        )
    }

    /// Decision reached from a full signal bundle.
    pub fn from_signals(reason: ReasonCode, bundle: &SignalBundle) -> Self {
        Self::new(reason, Evidence::Signals(SignalEvidence::from(bundle)))
    }

    fn new(reason: ReasonCode, evidence: Evidence) -> Self {
        Self {
            verdict: reason.verdict(),
            meta: DecisionMeta { reason, evidence },
        }
    }

    pub fn reason(&self) -> ReasonCode {
        self.meta.reason
    }
}

/// Round to 3 decimal places for reporting.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
