//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

mod ai;
mod images;
mod proposals;
mod sections;

use crate::config::CorsConfig;
use crate::state::SharedState;
use axum::{
    http::{header, Method},
    routing::{get, patch, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, cors: &CorsConfig) -> Router {
    let cors = build_cors_layer(cors);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(middleware)
        .with_state(state)
}

fn api_routes() -> Router<SharedState> {
    Router::new()
        // Proposals
        .route(
            "/proposals",
            post(proposals::create_proposal).get(proposals::list_proposals),
        )
        .route(
            "/proposals/{id}",
            get(proposals::get_proposal)
                .patch(proposals::update_proposal)
                .delete(proposals::delete_proposal),
        )
        .route("/proposals/{id}/preview", get(proposals::preview_proposal))
        .route("/proposals/{id}/sections", post(proposals::create_section))
        .route("/proposals/{id}/sections/order", put(proposals::reorder_sections))
        .route("/proposals/{id}/ai/draft", post(ai::generate_draft))
        .route("/proposals/{id}/ai/chart", post(ai::generate_proposal_chart))
        .route("/proposals/{id}/ai/expand-bullets", post(ai::expand_bullets))
        // Sections
        .route(
            "/sections/{id}",
            patch(sections::update_section).delete(sections::delete_section),
        )
        .route("/sections/{id}/versions", get(sections::list_section_versions))
        .route(
            "/sections/{id}/versions/{version_id}/revert",
            post(sections::revert_section),
        )
        .route(
            "/sections/{id}/images/{image_id}",
            put(sections::attach_image).delete(sections::detach_image),
        )
        .route("/sections/{id}/ai/enhance", post(ai::enhance_section))
        .route("/sections/{id}/ai/content", post(ai::generate_section_content))
        .route("/sections/{id}/ai/chart", post(ai::generate_section_chart))
        .route("/sections/{id}/ai/chart/update", post(ai::update_section_chart))
        .route(
            "/sections/{id}/ai/chart/suggestion",
            get(ai::suggest_chart_type),
        )
        .route("/sections/{id}/ai/suggestions", get(ai::suggest_improvements))
        // Image library
        .route(
            "/users/{user_id}/images",
            get(images::list_user_images).post(images::add_user_image),
        )
        .route(
            "/users/{user_id}/images/{image_id}",
            axum::routing::delete(images::delete_user_image),
        )
}

/// Build CORS layer from settings
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let headers = [header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT];

    let layer = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(origins)
    };
    layer
        .allow_methods(methods)
        .allow_headers(headers)
        .max_age(Duration::from_secs(3600))
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
