//! Output Policy Checker - screens generated text before release.
//!
//! Applies the configured output rules: PII leaks (same patterns the
//! redactor uses, reported without modifying the text) and banned terms.

use crate::config::OutputRules;
use crate::domain::{OutputCheckResult, OutputIssue};
use crate::engine::PiiRedactor;

/// Configuration-driven output checker.
pub struct OutputPolicyChecker {
    no_pii: bool,
    /// (configured term, lowercased term)
    banned_terms: Vec<(String, String)>,
    redactor: PiiRedactor,
}

impl OutputPolicyChecker {
    pub fn new(rules: OutputRules) -> Self {
        let banned_terms = rules
            .banned_terms
            .into_iter()
            .map(|term| {
                let lowered = term.to_lowercase();
                (term, lowered)
            })
            .collect();

        Self {
            no_pii: rules.no_pii,
            banned_terms,
            redactor: PiiRedactor::new(),
        }
    }

    /// PII issues first (pattern declaration order), then banned terms
    /// (list order).
    pub fn check(&self, output: &str) -> OutputCheckResult {
        let mut issues = Vec::new();

        if self.no_pii {
            issues.extend(
                self.redactor
                    .detect(output)
                    .into_iter()
                    .map(|pattern| OutputIssue::pii(pattern.name())),
            );
        }

        let output_lower = output.to_lowercase();
        issues.extend(
            self.banned_terms
                .iter()
                .filter(|(_, lowered)| output_lower.contains(lowered.as_str()))
                .map(|(term, _)| OutputIssue::banned_term(term)),
        );

        let result = OutputCheckResult::from_issues(issues);
        tracing::debug!(
            allowed = result.allowed,
            issue_count = result.issues.len(),
            "Output policy check complete"
        );
        result
    }
}
