//! Per-target connection establishment.

use std::sync::Arc;
use std::time::Duration;

use common::models::Target;
use tokio::sync::mpsc;

use super::{Connection, Connector, Established, Reporter};

/// Connects to one target, retrying forever with a fixed backoff.
///
/// Failures are not classified: bad credentials are retried exactly like an
/// unreachable host. On success the connection is handed to the dispatcher
/// once and the supervisor finishes.
pub struct ConnectionSupervisor<C: Connector> {
    connector: Arc<C>,
    target: Arc<Target>,
    backoff: Duration,
    reporter: Reporter,
    out: mpsc::Sender<Established<C::Session>>,
}

impl<C: Connector> ConnectionSupervisor<C> {
    pub fn new(
        connector: Arc<C>,
        target: Arc<Target>,
        backoff: Duration,
        reporter: Reporter,
        out: mpsc::Sender<Established<C::Session>>,
    ) -> Self {
        Self {
            connector,
            target,
            backoff,
            reporter,
            out,
        }
    }

    pub async fn run(self) {
        let name = self.target.name.as_str();
        let mut attempt: u64 = 0;

        loop {
            attempt += 1;
            tracing::debug!(server = name, attempt, addr = %self.target, "connecting");

            match self.connector.connect(&self.target).await {
                Ok(session) => {
                    self.reporter
                        .info(name, format!("Connected to {} after {} attempt(s)", name, attempt))
                        .await;
                    let established = Connection::new(self.target.clone(), session);
                    if self.out.send(established).await.is_err() {
                        tracing::debug!(server = name, "dispatcher stopped, dropping connection");
                    }
                    return;
                }
                Err(e) => {
                    self.reporter
                        .warn(
                            name,
                            format!(
                                "Connection to {} failed ({}); sleeping {} seconds",
                                name,
                                e,
                                self.backoff.as_secs()
                            ),
                        )
                        .await;
                    tokio::time::sleep(self.backoff).await;
                }
            }
        }
    }
}
