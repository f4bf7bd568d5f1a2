//! Validated request text and its sanitized form.

use crate::error::{ShieldError, ShieldResult};

/// Input text that passed validation: trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectionRequest {
    text: String,
}

impl InspectionRequest {
    /// Validate raw input. Empty or whitespace-only text is rejected.
    pub fn parse(raw: &str) -> ShieldResult<Self> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(ShieldError::BadRequest("text is required".to_string()));
        }
        Ok(Self {
            text: text.to_string(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Text after PII redaction. Only the redactor constructs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedText(String);

impl SanitizedText {
    pub(crate) fn new(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SanitizedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
