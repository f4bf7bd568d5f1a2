//! Route definitions for the API.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::handlers;
use crate::AppState;

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::inspect,
        handlers::generate,
        handlers::review,
        handlers::health_check,
    ),
    components(schemas(
        crate::api::types::InspectRequest,
        crate::api::types::InspectResponse,
        crate::api::types::GenerateResponse,
        crate::api::types::ReviewResponse,
        crate::api::types::HealthResponse,
        crate::domain::Verdict,
        crate::domain::ReasonCode,
        crate::domain::AuditEvent,
        crate::domain::AuditOutcome,
        crate::domain::IssueKind,
    )),
    tags(
        (name = "guard", description = "Input inspection and guarded generation"),
        (name = "health", description = "Health and status endpoints")
    ),
    info(
        title = "Ensemble Shield API",
        version = "0.1.0",
        description = "Prompt guard - screens LLM input with an ensemble of signals and checks model output before release",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/guard/inspect", post(handlers::inspect))
        .route("/guard/generate", post(handlers::generate))
        .route("/guard/review", get(handlers::review))
        .route("/health", get(handlers::health_check))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
