use crate::api::{handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health and metrics
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        // Search
        .route("/api/v1/search/:index", get(handlers::search))
        .route("/api/v1/search/:index/facets", get(handlers::faceted_search))
        .route("/api/v1/search/:index/:id", get(handlers::get_document))
        // Administration
        .route("/api/v1/admin/search/stats", get(handlers::search_stats))
        .route("/api/v1/admin/search/actions", post(handlers::start_action))
        .route("/api/v1/admin/search/tasks/:task_id", get(handlers::task_status))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
