//! HTTP handlers: read-only views over the latest frame, plus the quit signal.

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use common::errors::AppError;
use common::models::{LogEntry, Process};
use common::response::ApiResponse;
use crate::state::AppState;
use crate::table;

/// Every visible target with its processes.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    /// Refresh counter of the frame this was read from.
    pub generation: u64,
    pub rendered_at: DateTime<Utc>,
    /// Sorted by target name.
    pub targets: Vec<TargetStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TargetStatus {
    pub name: String,
    pub processes: Vec<Process>,
}

/// A configured target, without its password.
#[derive(Debug, Serialize, ToSchema)]
pub struct TargetItem {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub username: String,
    /// Whether the target currently has an entry in the view.
    pub visible: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub generation: u64,
    pub targets_configured: usize,
    pub targets_visible: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TableParams {
    /// Total line width in characters (40..=1000, default 160).
    pub width: Option<usize>,
}

/// Current status view
#[utoipa::path(
    get,
    path = "/api/status",
    tag = "status",
    responses(
        (status = 200, description = "Latest view", body = ApiResponse<StatusResponse>),
        (status = 503, description = "No frame published yet")
    )
)]
pub async fn status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<StatusResponse>>, AppError> {
    let frame = state.frame();
    if frame.generation == 0 {
        return Err(AppError::NotReady("no refresh has happened yet".to_string()));
    }

    let targets = frame
        .view
        .iter()
        .map(|(name, snapshot)| TargetStatus {
            name: name.to_string(),
            processes: snapshot.processes.clone(),
        })
        .collect();

    Ok(Json(ApiResponse::ok_with_service(
        StatusResponse {
            generation: frame.generation,
            rendered_at: frame.rendered_at,
            targets,
        },
        state.config.service.clone(),
    )))
}

/// Current status view as a text table
#[utoipa::path(
    get,
    path = "/api/status/table",
    tag = "status",
    params(TableParams),
    responses(
        (status = 200, description = "Boxed text table", body = String, content_type = "text/plain"),
        (status = 400, description = "Width out of range")
    )
)]
pub async fn status_table(
    State(state): State<AppState>,
    Query(params): Query<TableParams>,
) -> Result<impl IntoResponse, AppError> {
    let width = params.width.unwrap_or(table::DEFAULT_WIDTH);
    if !(table::MIN_WIDTH..=table::MAX_WIDTH).contains(&width) {
        return Err(AppError::Validation(format!(
            "width must be between {} and {}, got {}",
            table::MIN_WIDTH,
            table::MAX_WIDTH,
            width
        )));
    }

    let body = table::render(&state.frame(), width);
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body))
}

/// Activity log, oldest first
#[utoipa::path(
    get,
    path = "/api/logs",
    tag = "status",
    responses(
        (status = 200, description = "Log entries", body = ApiResponse<Vec<LogEntry>>)
    )
)]
pub async fn logs(State(state): State<AppState>) -> Json<ApiResponse<Vec<LogEntry>>> {
    let logs = state.frame().logs.clone();
    Json(ApiResponse::ok_with_service(logs, state.config.service.clone()))
}

/// Configured targets
#[utoipa::path(
    get,
    path = "/api/targets",
    tag = "targets",
    responses(
        (status = 200, description = "Targets in file order", body = ApiResponse<Vec<TargetItem>>)
    )
)]
pub async fn targets(State(state): State<AppState>) -> Json<ApiResponse<Vec<TargetItem>>> {
    let frame = state.frame();
    let items = state
        .targets
        .iter()
        .map(|t| TargetItem {
            name: t.name.clone(),
            address: t.address.clone(),
            port: t.port,
            username: t.username.clone(),
            visible: frame.view.contains(&t.name),
        })
        .collect();
    Json(ApiResponse::ok_with_service(items, state.config.service.clone()))
}

/// Health check
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let frame = state.frame();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        generation: frame.generation,
        targets_configured: state.targets.len(),
        targets_visible: frame.view.len(),
        timestamp: Utc::now(),
    })
}

/// Stop the monitor
#[utoipa::path(
    post,
    path = "/api/shutdown",
    tag = "control",
    responses(
        (status = 200, description = "Shutdown requested", body = ApiResponse<String>)
    )
)]
pub async fn shutdown(State(state): State<AppState>) -> Json<ApiResponse<String>> {
    // Full or closed: a quit is already pending or under way.
    if state.quit.try_send(()).is_ok() {
        tracing::info!("shutdown requested over HTTP");
    }
    Json(ApiResponse::ok_with_service(
        "shutting down".to_string(),
        state.config.service.clone(),
    ))
}
