//! PII Redactor - scrubs personal data and credentials from text.
//!
//! Every request passes through here before any detector sees it, and the
//! output policy checker reuses the same patterns to detect leaks.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use crate::domain::SanitizedText;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+").expect("email regex")
});

/// 7 to 15 digits with an optional leading `+`.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\d{7,15}").expect("phone regex"));

static AWS_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"AKIA[0-9A-Z]{16}").expect("aws key regex"));

/// A sensitive-data pattern known to the redactor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiiPattern {
    Email,
    Phone,
    AwsKey,
}

impl PiiPattern {
    /// Declaration order; detection results are reported in this order.
    pub const DECLARED: [PiiPattern; 3] = [PiiPattern::Email, PiiPattern::Phone, PiiPattern::AwsKey];

    /// Substitution order. Access keys go before phone numbers so a key's
    /// digit run is never rewritten as a phone placeholder.
    const PRECEDENCE: [PiiPattern; 3] = [PiiPattern::Email, PiiPattern::AwsKey, PiiPattern::Phone];

    pub fn name(self) -> &'static str {
        match self {
            PiiPattern::Email => "email",
            PiiPattern::Phone => "phone",
            PiiPattern::AwsKey => "aws_key",
        }
    }

    /// `[REDACTED_<NAME>]`. No placeholder contains `@`, a digit or `AKIA`.
    pub fn placeholder(self) -> &'static str {
        match self {
            PiiPattern::Email => "[REDACTED_EMAIL]",
            PiiPattern::Phone => "[REDACTED_PHONE]",
            PiiPattern::AwsKey => "[REDACTED_AWS_KEY]",
        }
    }

    fn regex(self) -> &'static Regex {
        match self {
            PiiPattern::Email => &EMAIL_RE,
            PiiPattern::Phone => &PHONE_RE,
            PiiPattern::AwsKey => &AWS_KEY_RE,
        }
    }

    pub fn is_match(self, text: &str) -> bool {
        self.regex().is_match(text)
    }
}

/// Pattern-based PII scrubber.
#[derive(Debug, Clone, Copy, Default)]
pub struct PiiRedactor;

impl PiiRedactor {
    pub fn new() -> Self {
        Self
    }

    /// Replace every PII match with its placeholder. Idempotent.
    pub fn redact(&self, text: &str) -> SanitizedText {
        let mut redacted = text.to_string();
        for pattern in PiiPattern::PRECEDENCE {
            redacted = pattern
                .regex()
                .replace_all(&redacted, NoExpand(pattern.placeholder()))
                .into_owned();
        }
        SanitizedText::new(redacted)
    }

    /// Patterns present in `text`, in declaration order. Does not modify text.
    pub fn detect(&self, text: &str) -> Vec<PiiPattern> {
        PiiPattern::DECLARED
            .into_iter()
            .filter(|pattern| pattern.is_match(text))
            .collect()
    }
}
