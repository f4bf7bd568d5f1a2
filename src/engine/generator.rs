//! Text generation collaborator.

use crate::error::ShieldResult;

/// Answer returned when no model backend is configured.
pub const SIMULATED_ANSWER: &str = "SIMULATED LLM ANSWER based on allowed context.";

/// A generative model reached only after the input was allowed.
pub trait TextGenerator: Send + Sync {
    /// Produce an answer for sanitized user text.
    fn generate(&self, prompt: &str) -> ShieldResult<String>;
}

/// Fixed-answer generator for deployments without a model backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedGenerator;

impl TextGenerator for SimulatedGenerator {
    fn generate(&self, _prompt: &str) -> ShieldResult<String> {
        Ok(SIMULATED_ANSWER.to_string())
    }
}
