//! Guard engine for Ensemble Shield.
//!
//! This module contains the inspection pipeline:
//! - PII Redactor: masks emails, phone numbers and AWS keys
//! - Injection Detector: matches configured prompt-injection indicators
//! - Signal adapters: embedder, anomaly scorer, intent classifier, keywords
//! - Decision Engine: the ensemble cascade producing ALLOW / FLAG / BLOCK
//! - Output Policy Checker: screens generated text before release
//! - Guard Coordinator: ties the above to generation and the audit log

mod coordinator;
mod decision;
pub mod embedding;
mod generator;
mod injection;
mod intent;
mod isolation;
mod llm;
mod output_policy;
mod redactor;
mod signals;

#[cfg(test)]
pub mod stubs;

pub use coordinator::*;
pub use decision::*;
pub use embedding::HashingEmbedder;
pub use generator::*;
pub use injection::*;
pub use intent::*;
pub use isolation::*;
pub use llm::*;
pub use output_policy::*;
pub use redactor::*;
pub use signals::*;
