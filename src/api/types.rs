//! API request and response types.

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{AuditEvent, Decision, DecisionMeta, Verdict};

// ==================== Inspect / Generate ====================

/// Text submitted for inspection or generation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct InspectRequest {
    /// User input. Must contain non-whitespace text.
    #[serde(default, deserialize_with = "string_or_none")]
    #[schema(value_type = String)]
    pub text: Option<String>,
}

impl InspectRequest {
    /// The submitted text; absent, null or non-string values read as empty.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// Accept any JSON value, keeping only strings.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(text) => Some(text),
        _ => None,
    })
}

/// Verdict with its explanation.
#[derive(Debug, Serialize, ToSchema)]
pub struct InspectResponse {
    pub decision: Verdict,
    /// Reason code plus the signals that were computed.
    #[schema(value_type = Object)]
    pub meta: DecisionMeta,
}

impl From<Decision> for InspectResponse {
    fn from(decision: Decision) -> Self {
        Self {
            decision: decision.verdict,
            meta: decision.meta,
        }
    }
}

/// Released model answer.
#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateResponse {
    pub answer: String,
}

// ==================== Review ====================

/// Query parameters for the review queue.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ReviewQuery {
    /// Maximum number of events (1-500, default 50).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Recent FLAG decisions awaiting review, oldest first.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewResponse {
    pub events: Vec<AuditEvent>,
    pub total: usize,
}

// ==================== Health ====================

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
    /// Current UTC time, ISO-8601.
    pub time: String,
}
