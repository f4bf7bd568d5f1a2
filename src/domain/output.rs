//! Output policy check results.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Category of an output policy violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Pii,
    BannedTerm,
}

/// One violation found in generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OutputIssue {
    pub kind: IssueKind,
    /// Pattern name for PII, the configured term for banned terms.
    pub detail: String,
}

impl OutputIssue {
    pub fn pii(pattern: &str) -> Self {
        Self {
            kind: IssueKind::Pii,
            detail: pattern.to_string(),
        }
    }

    pub fn banned_term(term: &str) -> Self {
        Self {
            kind: IssueKind::BannedTerm,
            detail: term.to_string(),
        }
    }
}

/// Outcome of checking generated text against the output rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OutputCheckResult {
    pub allowed: bool,
    pub issues: Vec<OutputIssue>,
}

impl OutputCheckResult {
    pub fn from_issues(issues: Vec<OutputIssue>) -> Self {
        Self {
            allowed: issues.is_empty(),
            issues,
        }
    }
}
