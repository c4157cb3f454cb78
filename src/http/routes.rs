use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session control
        .route(
            "/sessions",
            get(handlers::list_sessions).post(handlers::spawn_session),
        )
        .route("/sessions/:channel_id", get(handlers::get_session))
        .route("/sessions/:channel_id/events", post(handlers::send_event))
        .route("/sessions/:channel_id/stop", post(handlers::stop_session))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
