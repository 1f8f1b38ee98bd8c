//! Route table.

use axum::{
    routing::{get, post},
    Router,
};
use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/status", get(handlers::status))
        .route("/api/status/table", get(handlers::status_table))
        .route("/api/logs", get(handlers::logs))
        .route("/api/targets", get(handlers::targets))
        .route("/api/health", get(handlers::health_check))
        .route("/api/shutdown", post(handlers::shutdown))
}
