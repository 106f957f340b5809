use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{audit, handlers, middleware::metrics_middleware, uploads};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Uploads
        .route("/uploads", post(uploads::start_uploads))
        .route("/uploads/status", get(uploads::get_status))
        .route("/uploads/pause", post(uploads::pause))
        .route("/uploads/resume", post(uploads::resume))
        .route("/uploads/cancel", post(uploads::cancel))
        .route("/uploads/clear", post(uploads::clear_status))
        // Operation log
        .route("/audit", get(audit::query_audit))
        .route_layer(middleware::from_fn(metrics_middleware))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
