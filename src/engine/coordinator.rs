//! Guard Coordinator - orchestrates the request pipeline.
//!
//! Redaction, the decision cascade, the generation gate, the output policy
//! check and audit logging all meet here. Handlers call into this type from a
//! blocking task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::{AuditEvent, Decision, InspectionRequest, Verdict};
use crate::engine::{DecisionEngine, OutputPolicyChecker, PiiRedactor, TextGenerator};
use crate::error::{ShieldError, ShieldResult};
use crate::storage::AuditSink;

pub struct GuardCoordinator {
    redactor: PiiRedactor,
    engine: DecisionEngine,
    output_checker: OutputPolicyChecker,
    generator: Arc<dyn TextGenerator>,
    audit: Arc<dyn AuditSink>,
}

impl GuardCoordinator {
    pub fn new(
        engine: DecisionEngine,
        output_checker: OutputPolicyChecker,
        generator: Arc<dyn TextGenerator>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            redactor: PiiRedactor::new(),
            engine,
            output_checker,
            generator,
            audit,
        }
    }

    /// Redact, decide and log. The decision is returned even if logging fails.
    pub fn inspect(&self, request: &InspectionRequest) -> ShieldResult<Decision> {
        let sanitized = self.redactor.redact(request.text());
        let decision = self.engine.evaluate(&sanitized)?;

        self.record(AuditEvent::for_decision(&sanitized, &decision));
        Ok(decision)
    }

    /// Gate generation on the decision, then check the output before release.
    ///
    /// BLOCK ends the request before the generator is called. FLAG proceeds
    /// like ALLOW; it is surfaced through the review queue instead.
    ///
    /// Once `cancelled` is set the generator is not called and no
    /// `allowed_output` event is written.
    pub fn generate(
        &self,
        request: &InspectionRequest,
        cancelled: &AtomicBool,
    ) -> ShieldResult<String> {
        let sanitized = self.redactor.redact(request.text());
        let decision = self.engine.evaluate(&sanitized)?;
        self.record(AuditEvent::for_decision(&sanitized, &decision));

        if decision.verdict == Verdict::Block {
            tracing::warn!(reason = %decision.reason(), "Generation blocked by guardrails");
            return Err(ShieldError::Blocked);
        }

        if cancelled.load(Ordering::SeqCst) {
            tracing::warn!("Caller gone, skipping generation");
            return Err(ShieldError::Cancelled);
        }

        let answer = self.generator.generate(sanitized.as_str())?;

        let check = self.output_checker.check(&answer);
        if !check.allowed {
            self.record(AuditEvent::for_output(&check));
            tracing::error!(issues = check.issues.len(), "Generated output violated output policy");
            return Err(ShieldError::OutputPolicyViolation);
        }

        if cancelled.load(Ordering::SeqCst) {
            tracing::warn!("Caller gone, generated output discarded");
            return Err(ShieldError::Cancelled);
        }
        self.record(AuditEvent::for_output(&check));

        tracing::info!(verdict = %decision.verdict, "Generated output released");
        Ok(answer)
    }

    fn record(&self, event: serde_json::Result<AuditEvent>) {
        let result = event
            .map_err(ShieldError::from)
            .and_then(|event| self.audit.record(&event));
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to write audit event");
        }
    }
}
