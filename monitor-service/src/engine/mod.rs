//! 监控引擎
//!
//! Each target gets its own connection task and, once connected, its own
//! sampling task. Everything they observe flows as messages into a single
//! aggregator task, which is the only owner of the status view and the log
//! buffer:
//!
//! ```text
//! Target -> ConnectionSupervisor -> Connection -> Sampler -> Aggregator -> FrameSink
//! ```
//!
//! - [`supervisor`]: connects to one target, retrying forever.
//! - [`sampler`]: polls one connection on a fixed interval.
//! - [`aggregator`]: merges snapshots and log entries, triggers refreshes.
//! - [`log_sink`]: bounded chronological log buffer.
//! - [`dispatcher`]: spawns and tracks the tasks, handles shutdown.

pub mod aggregator;
pub mod dispatcher;
pub mod log_sink;
pub mod reporter;
pub mod sampler;
pub mod supervisor;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::config::AppConfig;
use common::errors::AppResult;
use common::models::{Process, Target};
use tokio::sync::oneshot;

pub use aggregator::{Aggregator, FrameSink};
pub use dispatcher::Dispatcher;
pub use log_sink::LogSink;
pub use reporter::{Event, Reporter};
pub use sampler::Sampler;
pub use supervisor::ConnectionSupervisor;

/// Opens sessions to targets.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Session: ProcessSource;

    /// Makes one connection attempt.
    async fn connect(&self, target: &Target) -> AppResult<Self::Session>;
}

/// A live session able to list the server's active sessions.
#[async_trait]
pub trait ProcessSource: Send + 'static {
    /// Runs the session-listing query.
    ///
    /// The outer error means the query itself failed. Inner errors belong to
    /// single rows that could not be decoded.
    async fn list_processes(&mut self) -> AppResult<Vec<AppResult<Process>>>;
}

/// An established session, owned by exactly one sampler.
pub struct Connection<S> {
    pub target: Arc<Target>,
    pub session: S,
    /// Resolves when the sampler must stop (or its canceller is dropped).
    pub cancelled: oneshot::Receiver<()>,
}

impl<S> Connection<S> {
    /// Wraps a fresh session together with a new cancellation signal.
    pub fn new(target: Arc<Target>, session: S) -> (Self, Canceller) {
        let (tx, rx) = oneshot::channel();
        let conn = Self {
            target,
            session,
            cancelled: rx,
        };
        (conn, Canceller(tx))
    }
}

/// Fires the cancellation signal of one connection.
#[derive(Debug)]
pub struct Canceller(oneshot::Sender<()>);

impl Canceller {
    pub fn cancel(self) {
        // The sampler may already be gone.
        let _ = self.0.send(());
    }
}

/// What a supervisor hands to the dispatcher on success.
pub type Established<S> = (Connection<S>, Canceller);

/// Timing and sizing knobs of the engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub poll_interval: Duration,
    pub retry_backoff: Duration,
    pub refresh_interval: Duration,
    pub log_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for EngineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            retry_backoff: config.retry_backoff(),
            refresh_interval: config.refresh_interval(),
            log_capacity: config.log_capacity,
        }
    }
}
