//! OpenRouter-backed collaborators.
//!
//! Provides a zero-shot intent classifier and a text generator on top of the
//! OpenRouter chat completions API. Both are synchronous adapters: they run on
//! the blocking pipeline thread and drive the async HTTP call through the
//! current tokio runtime handle.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::domain::{IntentLabel, IntentPrediction};
use crate::engine::{IntentClassifier, TextGenerator};
use crate::error::{ShieldError, ShieldResult};

/// Request to OpenRouter API.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Response from OpenRouter API.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Thin async client for chat completions.
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenRouterClient {
    pub fn new(config: &LlmConfig) -> ShieldResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ShieldError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.openrouter_api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn complete(
        &self,
        component: &'static str,
        request: &ChatRequest<'_>,
    ) -> ShieldResult<String> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Title", "Ensemble Shield")
            .json(request)
            .send()
            .await
            .map_err(|e| ShieldError::collaborator(component, format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ShieldError::collaborator(
                component,
                format!("API error {}: {}", status, body),
            ));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            ShieldError::collaborator(component, format!("Failed to parse response: {}", e))
        })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ShieldError::collaborator(component, "Response had no choices"))
    }
}

/// Run an async call from the blocking pipeline thread.
fn block_on<T>(
    component: &'static str,
    future: impl Future<Output = ShieldResult<T>>,
) -> ShieldResult<T> {
    let handle = tokio::runtime::Handle::try_current()
        .map_err(|e| ShieldError::collaborator(component, format!("No async runtime: {}", e)))?;
    handle.block_on(future)
}

/// Expected classifier reply.
#[derive(Debug, Deserialize)]
struct IntentReply {
    label: String,
    confidence: f64,
}

/// Parse the model's JSON reply, tolerating surrounding prose or code fences.
fn parse_intent_reply(raw: &str, candidates: &[IntentLabel]) -> Result<IntentPrediction, String> {
    let start = raw.find('{').ok_or_else(|| format!("No JSON object in reply: {}", raw))?;
    let end = raw.rfind('}').ok_or_else(|| format!("No JSON object in reply: {}", raw))?;
    if end < start {
        return Err(format!("Malformed reply: {}", raw));
    }

    let reply: IntentReply =
        serde_json::from_str(&raw[start..=end]).map_err(|e| format!("Invalid JSON: {}", e))?;
    let label: IntentLabel = reply.label.parse()?;
    if !candidates.contains(&label) {
        return Err(format!("Label '{}' is not a candidate", label));
    }
    if !(0.0..=1.0).contains(&reply.confidence) {
        return Err(format!("Confidence {} outside [0, 1]", reply.confidence));
    }

    Ok(IntentPrediction {
        label,
        confidence: reply.confidence,
    })
}

fn intent_prompt(candidates: &[IntentLabel]) -> String {
    let labels: Vec<String> = candidates.iter().map(|l| l.to_string()).collect();
    format!(
        "You classify the intent of a message sent to an AI assistant. \
         Choose exactly one label from: {}. \
         'malicious' means the sender tries to steal data, break security controls, or cause harm; \
         'suspicious' means the request is ambiguous or probing; 'benign' means ordinary use. \
         Reply with JSON only: {{\"label\": \"<label>\", \"confidence\": <number between 0 and 1>}}",
        labels.join(", ")
    )
}

/// Zero-shot intent classification through a hosted chat model.
pub struct OpenRouterIntentClassifier {
    client: OpenRouterClient,
    model: String,
}

impl OpenRouterIntentClassifier {
    pub fn new(client: OpenRouterClient, model: String) -> Self {
        Self { client, model }
    }
}

impl IntentClassifier for OpenRouterIntentClassifier {
    fn classify(&self, text: &str, candidates: &[IntentLabel]) -> ShieldResult<IntentPrediction> {
        const COMPONENT: &str = "intent classifier";

        let system = intent_prompt(candidates);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            max_tokens: Some(60),
            temperature: Some(0.0),
        };

        let raw = block_on(COMPONENT, self.client.complete(COMPONENT, &request))?;
        tracing::debug!(model = %self.model, reply = %raw, "Intent classifier reply");

        parse_intent_reply(&raw, candidates).map_err(|e| ShieldError::collaborator(COMPONENT, e))
    }
}

/// Text generation through a hosted chat model.
pub struct OpenRouterGenerator {
    client: OpenRouterClient,
    model: String,
    system_prompt: String,
}

impl OpenRouterGenerator {
    pub fn new(client: OpenRouterClient, model: String, system_prompt: String) -> Self {
        Self {
            client,
            model,
            system_prompt,
        }
    }
}

impl TextGenerator for OpenRouterGenerator {
    fn generate(&self, prompt: &str) -> ShieldResult<String> {
        const COMPONENT: &str = "generator";

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: None,
            temperature: None,
        };

        block_on(COMPONENT, self.client.complete(COMPONENT, &request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let p = parse_intent_reply(r#"{"label": "malicious", "confidence": 0.91}"#, &IntentLabel::ALL)
            .unwrap();
        assert_eq!(p.label, IntentLabel::Malicious);
        assert_eq!(p.confidence, 0.91);
    }

    #[test]
    fn test_parse_fenced_reply() {
        let raw = "```json\n{\"label\": \"Suspicious\", \"confidence\": 0.5}\n```";
        let p = parse_intent_reply(raw, &IntentLabel::ALL).unwrap();
        assert_eq!(p.label, IntentLabel::Suspicious);
    }

    #[test]
    fn test_parse_rejects_unknown_label() {
        let raw = r#"{"label": "hostile", "confidence": 0.9}"#;
        assert!(parse_intent_reply(raw, &IntentLabel::ALL).is_err());
    }

    #[test]
    fn test_parse_rejects_non_candidate() {
        let raw = r#"{"label": "malicious", "confidence": 0.9}"#;
        assert!(parse_intent_reply(raw, &[IntentLabel::Benign]).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_confidence_and_prose() {
        assert!(parse_intent_reply(r#"{"label": "benign", "confidence": 3}"#, &IntentLabel::ALL).is_err());
        assert!(parse_intent_reply("I think it is benign", &IntentLabel::ALL).is_err());
    }

    #[test]
    fn test_prompt_lists_candidates() {
        let prompt = intent_prompt(&IntentLabel::ALL);
        assert!(prompt.contains("benign, suspicious, malicious"));
    }

    #[test]
    fn test_classify_without_runtime_is_collaborator_error() {
        let client = OpenRouterClient::new(&LlmConfig::default()).unwrap();
        let classifier = OpenRouterIntentClassifier::new(client, "test-model".to_string());
        let result = classifier.classify("hello", &IntentLabel::ALL);
        assert!(matches!(result, Err(ShieldError::Collaborator { .. })));
    }
}
