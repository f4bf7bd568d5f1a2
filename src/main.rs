//! Ensemble Shield - prompt guard for generative models
//!
//! This service screens untrusted text before it reaches an LLM, combining
//! injection indicators, keyword, anomaly and intent signals into one
//! ALLOW / FLAG / BLOCK verdict, and checks generated output before release.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

mod api;
mod config;
mod domain;
mod engine;
mod error;
mod logging;
mod storage;

use crate::api::build_router;
use crate::config::{Config, PolicyConfig};
use crate::engine::{
    CentroidIntentClassifier, DecisionEngine, Embedder, GuardCoordinator, HashingEmbedder,
    InjectionDetector, IntentClassifier, IsolationForest, IsolationForestParams, KeywordList,
    OpenRouterClient, OpenRouterGenerator, OpenRouterIntentClassifier, OutputPolicyChecker,
    SignalModels, SimulatedGenerator, TextGenerator,
};
use crate::storage::{AuditSink, JsonlAuditSink};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The guard pipeline.
    pub coordinator: Arc<GuardCoordinator>,
    /// Audit log, read back for the review queue.
    pub audit: Arc<dyn AuditSink>,
    /// Bound on one request's pipeline run; `None` waits indefinitely.
    pub collaborator_timeout: Option<Duration>,
}

/// Read a seed corpus: one example per non-empty line.
fn read_seed(path: &str) -> anyhow::Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read seed file {}: {}", path, e))?;
    let lines: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();
    if lines.is_empty() {
        anyhow::bail!("Seed file {} has no examples", path);
    }
    Ok(lines)
}

fn encode_all(embedder: &dyn Embedder, texts: &[String]) -> anyhow::Result<Vec<Vec<f64>>> {
    texts
        .iter()
        .map(|t| embedder.encode(t).map_err(anyhow::Error::from))
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Note: No .env file loaded ({e})");
    }

    logging::init();

    tracing::info!("Starting Ensemble Shield v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    let policy = PolicyConfig::load(&config.policy.path).map_err(|e| {
        tracing::error!(path = %config.policy.path, error = %e, "Failed to load policy");
        anyhow::anyhow!("Policy error: {}", e)
    })?;

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        policy = %config.policy.path,
        audit_log = %config.audit.path,
        injection_indicators = policy.injection_indicators.len(),
        banned_terms = policy.output_rules.banned_terms.len(),
        "Configuration loaded"
    );

    // Fit the signal models once from the bootstrap corpora
    let benign = read_seed(&config.bootstrap.benign_seed)?;
    let malicious = read_seed(&config.bootstrap.malicious_seed)?;

    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(config.models.embedding_dim)?);
    tracing::info!(
        dimension = embedder.dimension(),
        benign = benign.len(),
        malicious = malicious.len(),
        "Embedding seed corpora"
    );
    let benign_vectors = encode_all(embedder.as_ref(), &benign)?;
    let malicious_vectors = encode_all(embedder.as_ref(), &malicious)?;

    let corpus: Vec<Vec<f64>> = benign_vectors
        .iter()
        .chain(&malicious_vectors)
        .cloned()
        .collect();
    let forest = IsolationForest::fit(
        &corpus,
        &IsolationForestParams {
            estimators: config.models.estimators,
            max_samples: config.models.max_samples,
            contamination: config.models.contamination,
            seed: config.models.seed,
        },
    )?;

    let llm_client = if config.llm.enabled && !config.llm.openrouter_api_key.is_empty() {
        Some(OpenRouterClient::new(&config.llm)?)
    } else {
        None
    };

    let intent: Arc<dyn IntentClassifier> = match &llm_client {
        Some(client) => {
            tracing::info!(model = %config.llm.intent_model, "OpenRouter intent classifier enabled");
            Arc::new(OpenRouterIntentClassifier::new(
                client.clone(),
                config.llm.intent_model.clone(),
            ))
        }
        None => {
            tracing::info!("Centroid intent classifier enabled");
            Arc::new(CentroidIntentClassifier::from_vectors(
                embedder.clone(),
                &benign_vectors,
                &malicious_vectors,
            )?)
        }
    };

    let generator: Arc<dyn TextGenerator> = match &llm_client {
        Some(client) => {
            tracing::info!(model = %config.llm.generator_model, "OpenRouter generator enabled");
            Arc::new(OpenRouterGenerator::new(
                client.clone(),
                config.llm.generator_model.clone(),
                config.llm.system_prompt.clone(),
            ))
        }
        None => {
            tracing::info!("Simulated generator enabled");
            Arc::new(SimulatedGenerator)
        }
    };

    let models = SignalModels {
        embedder,
        anomaly: Arc::new(forest),
        intent,
        keywords: Arc::new(KeywordList::new(policy.dangerous_keywords.clone())),
    };

    let engine = DecisionEngine::new(
        InjectionDetector::new(policy.injection_indicators.clone()),
        models,
        policy.thresholds,
    );
    let output_checker = OutputPolicyChecker::new(policy.output_rules.clone());
    let audit_sink = JsonlAuditSink::new(&config.audit.path)?;
    tracing::info!(path = %audit_sink.path().display(), "Audit log ready");
    let audit: Arc<dyn AuditSink> = Arc::new(audit_sink);

    let coordinator = Arc::new(GuardCoordinator::new(
        engine,
        output_checker,
        generator,
        audit.clone(),
    ));

    let collaborator_timeout = match config.engine.collaborator_timeout_secs {
        0 => {
            tracing::warn!("Collaborator timeout is DISABLED - a hung model call stalls its request");
            None
        }
        secs => Some(Duration::from_secs(secs)),
    };

    let state = AppState {
        coordinator,
        audit,
        collaborator_timeout,
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(address = %addr, "Server listening");
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
