//! Storage layer: the audit event log.

mod audit;

#[cfg(test)]
pub use audit::MemoryAuditSink;
pub use audit::{AuditSink, JsonlAuditSink};
