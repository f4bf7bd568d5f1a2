//! Injection Detector - flags attempts to override system instructions.
//!
//! This is the first check in the decision cascade. Any configured indicator
//! found in the sanitized text blocks the request before the model-backed
//! signals are computed.

/// Outcome of injection detection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InjectionReport {
    /// Matched indicators, in configured order and spelling.
    pub found: Vec<String>,
}

impl InjectionReport {
    pub fn is_injection(&self) -> bool {
        !self.found.is_empty()
    }
}

/// Case-insensitive substring matcher over configured indicators.
#[derive(Debug, Clone)]
pub struct InjectionDetector {
    indicators: Vec<String>,
    lowered: Vec<String>,
}

impl InjectionDetector {
    pub fn new(indicators: Vec<String>) -> Self {
        let lowered = indicators.iter().map(|i| i.to_lowercase()).collect();
        Self {
            indicators,
            lowered,
        }
    }

    pub fn detect(&self, text: &str) -> InjectionReport {
        let text_lower = text.to_lowercase();
        let found = self
            .indicators
            .iter()
            .zip(&self.lowered)
            .filter(|(_, lowered)| text_lower.contains(lowered.as_str()))
            .map(|(indicator, _)| indicator.clone())
            .collect();

        InjectionReport { found }
    }
}
