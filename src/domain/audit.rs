//! Audit event types.
//!
//! One event is appended to the audit log per decision and per checked
//! generation output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Decision, OutputCheckResult, SanitizedText, Verdict};

/// Placeholder logged instead of generated text.
pub const REDACTED_OUTPUT: &str = "[REDACTED OUTPUT]";

/// Decision or outcome label of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AuditOutcome {
    #[serde(rename = "ALLOW")]
    Allow,
    #[serde(rename = "FLAG")]
    Flag,
    #[serde(rename = "BLOCK")]
    Block,
    #[serde(rename = "blocked_output")]
    BlockedOutput,
    #[serde(rename = "allowed_output")]
    AllowedOutput,
}

impl From<Verdict> for AuditOutcome {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Allow => AuditOutcome::Allow,
            Verdict::Flag => AuditOutcome::Flag,
            Verdict::Block => AuditOutcome::Block,
        }
    }
}

impl std::fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditOutcome::Allow => write!(f, "ALLOW"),
            AuditOutcome::Flag => write!(f, "FLAG"),
            AuditOutcome::Block => write!(f, "BLOCK"),
            AuditOutcome::BlockedOutput => write!(f, "blocked_output"),
            AuditOutcome::AllowedOutput => write!(f, "allowed_output"),
        }
    }
}

/// A single line of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// When the event was recorded (UTC, `Z` suffix).
    pub time: DateTime<Utc>,
    /// Sanitized input, or [`REDACTED_OUTPUT`] for generated text.
    pub text: String,
    pub decision: AuditOutcome,
    #[schema(value_type = Object)]
    pub meta: serde_json::Value,
}

impl AuditEvent {
    /// Event for a cascade decision over sanitized input.
    pub fn for_decision(text: &SanitizedText, decision: &Decision) -> serde_json::Result<Self> {
        Ok(Self {
            time: Utc::now(),
            text: text.as_str().to_string(),
            decision: decision.verdict.into(),
            meta: serde_json::to_value(&decision.meta)?,
        })
    }

    /// Event for a checked generation; the output itself is never logged.
    pub fn for_output(result: &OutputCheckResult) -> serde_json::Result<Self> {
        let decision = if result.allowed {
            AuditOutcome::AllowedOutput
        } else {
            AuditOutcome::BlockedOutput
        };
        Ok(Self {
            time: Utc::now(),
            text: REDACTED_OUTPUT.to_string(),
            decision,
            meta: serde_json::to_value(result)?,
        })
    }
}
