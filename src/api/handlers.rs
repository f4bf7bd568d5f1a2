//! HTTP request handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::SecondsFormat;
use uuid::Uuid;

use crate::api::types::*;
use crate::domain::{AuditOutcome, InspectionRequest};
use crate::engine::GuardCoordinator;
use crate::error::{ShieldError, ShieldResult};
use crate::AppState;

const MAX_REVIEW_LIMIT: usize = 500;

/// Run a pipeline job on the blocking pool under the collaborator timeout.
///
/// On timeout the caller gets an error and the job's cancellation flag is
/// set; work the job has not started yet is skipped.
async fn run_pipeline<T, F>(state: &AppState, route: &'static str, job: F) -> ShieldResult<T>
where
    F: FnOnce(&GuardCoordinator, &AtomicBool) -> ShieldResult<T> + Send + 'static,
    T: Send + 'static,
{
    let span = tracing::info_span!("guard_request", route, request_id = %Uuid::new_v4());
    let coordinator = state.coordinator.clone();
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    let task = tokio::task::spawn_blocking(move || span.in_scope(|| job(&coordinator, &flag)));

    let joined = match state.collaborator_timeout {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_) => {
                cancelled.store(true, Ordering::SeqCst);
                tracing::error!(
                    route,
                    timeout_ms = limit.as_millis() as u64,
                    "Collaborator call timed out"
                );
                return Err(ShieldError::CollaboratorTimeout(limit));
            }
        },
        None => task.await,
    };

    joined.map_err(|e| ShieldError::Internal(format!("Pipeline task failed: {}", e)))?
}

/// Inspect text and return the guard decision.
///
/// POST /guard/inspect
#[utoipa::path(
    post,
    path = "/guard/inspect",
    request_body = InspectRequest,
    responses(
        (status = 200, description = "Decision computed", body = InspectResponse),
        (status = 400, description = "Missing or empty text"),
        (status = 502, description = "A model collaborator failed"),
        (status = 504, description = "A model collaborator timed out")
    ),
    tag = "guard"
)]
pub async fn inspect(
    State(state): State<AppState>,
    Json(body): Json<InspectRequest>,
) -> ShieldResult<Json<InspectResponse>> {
    let request = InspectionRequest::parse(body.text())?;

    let decision =
        run_pipeline(&state, "inspect", move |guard, _| guard.inspect(&request)).await?;

    Ok(Json(decision.into()))
}

/// Inspect text and, unless blocked, generate a policy-checked answer.
///
/// POST /guard/generate
#[utoipa::path(
    post,
    path = "/guard/generate",
    request_body = InspectRequest,
    responses(
        (status = 200, description = "Answer released", body = GenerateResponse),
        (status = 400, description = "Missing or empty text"),
        (status = 403, description = "Request blocked by guardrails"),
        (status = 500, description = "Generated output violated output policy"),
        (status = 502, description = "A model collaborator failed"),
        (status = 504, description = "A model collaborator timed out")
    ),
    tag = "guard"
)]
pub async fn generate(
    State(state): State<AppState>,
    Json(body): Json<InspectRequest>,
) -> ShieldResult<Json<GenerateResponse>> {
    let request = InspectionRequest::parse(body.text())?;

    let answer = run_pipeline(&state, "generate", move |guard, cancelled| {
        guard.generate(&request, cancelled)
    })
    .await?;

    Ok(Json(GenerateResponse { answer }))
}

/// List recent FLAG decisions for human review.
///
/// GET /guard/review
#[utoipa::path(
    get,
    path = "/guard/review",
    params(ReviewQuery),
    responses(
        (status = 200, description = "Flagged events, oldest first", body = ReviewResponse),
        (status = 500, description = "Audit log unreadable")
    ),
    tag = "guard"
)]
pub async fn review(
    State(state): State<AppState>,
    Query(query): Query<ReviewQuery>,
) -> ShieldResult<Json<ReviewResponse>> {
    let limit = query.limit.clamp(1, MAX_REVIEW_LIMIT);
    let audit = state.audit.clone();

    let events = tokio::task::spawn_blocking(move || audit.recent(AuditOutcome::Flag, limit))
        .await
        .map_err(|e| ShieldError::Internal(format!("Review task failed: {}", e)))??;

    Ok(Json(ReviewResponse {
        total: events.len(),
        events,
    }))
}

/// Liveness check.
///
/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        time: chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}
