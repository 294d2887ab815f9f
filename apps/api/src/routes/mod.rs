pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::ranking::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.body_limit();
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/rankings", post(handlers::handle_rank))
        .route("/api/v1/rankings/upload", post(handlers::handle_rank_upload))
        .route("/api/v1/rankings/export", post(handlers::handle_rank_export))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
