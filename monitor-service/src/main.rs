//! mmtop: live MySQL session monitor.
//!
//! Polls `SHOW FULL PROCESSLIST` on every configured server and serves the
//! merged view over HTTP:
//! - one connection supervisor per target, retrying forever
//! - one sampler per established connection
//! - a single aggregator owning the view and the activity log

mod engine;
mod handlers;
mod mysql;
mod routes;
mod state;
mod table;

use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Json, Router};
use common::config::{load_targets, AppConfig};
use common::models::RenderFrame;
use engine::{Dispatcher, EngineSettings};
use mysql::MySqlConnector;
use state::AppState;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "mmtop";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "mmtop API",
        version = "0.1.0",
        description = "Live view of MySQL sessions across servers"
    ),
    paths(
        handlers::status,
        handlers::status_table,
        handlers::logs,
        handlers::targets,
        handlers::health_check,
        handlers::shutdown,
    ),
    components(schemas(
        common::models::Process,
        common::models::LogEntry,
        handlers::StatusResponse,
        handlers::TargetStatus,
        handlers::TargetItem,
        handlers::HealthResponse,
    )),
    tags(
        (name = "status", description = "Merged session view and activity log"),
        (name = "targets", description = "Configured servers"),
        (name = "health", description = "Health check"),
        (name = "control", description = "Process control")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::load_with_service(SERVICE_NAME);
    let targets = load_targets(&config.targets_file)
        .with_context(|| format!("loading targets from {}", config.targets_file.display()))?;
    info!(
        file = %config.targets_file.display(),
        targets = targets.len(),
        "loaded targets"
    );

    let (frames_tx, frames_rx) = watch::channel(Arc::new(RenderFrame::default()));
    let (quit_tx, quit_rx) = mpsc::channel(1);
    let state = AppState::new(config.clone(), targets.clone(), frames_rx, quit_tx);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(service = SERVICE_NAME, address = %addr, "starting HTTP server");

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = tokio::spawn(async move {
        axum::serve(listener, create_router(state))
            .with_graceful_shutdown(async move {
                let _ = stop_rx.changed().await;
            })
            .await
    });

    let connector = MySqlConnector::new(config.database.clone(), config.connect_timeout());
    let summary = Dispatcher::new(connector, targets, EngineSettings::from(&config))
        .run(frames_tx, quit_signal(quit_rx))
        .await;
    info!(
        supervisors_aborted = summary.supervisors_aborted,
        samplers_cancelled = summary.samplers_cancelled,
        targets_seen = summary.targets_seen,
        "monitor stopped"
    );

    let _ = stop_tx.send(true);
    server.await.context("HTTP server task")?.context("HTTP server")?;
    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Resolves on Ctrl-C, SIGTERM or a request on `/api/shutdown`.
async fn quit_signal(mut http: mpsc::Receiver<()>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let from_http = async {
        // The handler state keeps a sender alive, so None never comes first.
        if http.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl-C"),
        _ = terminate => info!("received SIGTERM"),
        _ = from_http => info!("quit requested over HTTP"),
    }
}
