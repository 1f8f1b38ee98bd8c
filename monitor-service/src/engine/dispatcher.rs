//! Top-level orchestration of supervisors, samplers and the aggregator.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use common::models::Target;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::{
    Aggregator, Canceller, ConnectionSupervisor, Connector, EngineSettings, Established,
    FrameSink, Reporter, Sampler,
};

const EVENT_BUFFER: usize = 1024;

/// A running sampler and the means to stop it.
struct SamplerEntry {
    canceller: Canceller,
    handle: JoinHandle<()>,
}

/// What the dispatcher tore down on shutdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownSummary {
    /// Targets still trying to connect.
    pub supervisors_aborted: usize,
    /// Samplers told to stop.
    pub samplers_cancelled: usize,
    /// Targets present in the view when the aggregator stopped.
    pub targets_seen: usize,
}

/// Spawns one supervisor per target and one sampler per established
/// connection, and keeps at most one live sampler per target name.
pub struct Dispatcher<C: Connector> {
    connector: Arc<C>,
    targets: Vec<Arc<Target>>,
    settings: EngineSettings,
}

impl<C: Connector> Dispatcher<C> {
    pub fn new(connector: C, targets: Vec<Target>, settings: EngineSettings) -> Self {
        Self {
            connector: Arc::new(connector),
            targets: targets.into_iter().map(Arc::new).collect(),
            settings,
        }
    }

    /// Runs until `quit` resolves.
    ///
    /// On quit, pending connection attempts are aborted and samplers are
    /// cancelled without being awaited: a sampler stuck in a query is
    /// abandoned rather than drained.
    pub async fn run<F, Q>(self, sink: F, quit: Q) -> ShutdownSummary
    where
        F: FrameSink,
        Q: Future<Output = ()>,
    {
        let (reporter, events) = Reporter::channel(EVENT_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let aggregator = Aggregator::new(
            sink,
            self.settings.refresh_interval,
            self.settings.log_capacity,
        );
        let aggregator = tokio::spawn(aggregator.run(events, shutdown_rx));

        let (conn_tx, mut conn_rx) = mpsc::channel::<Established<C::Session>>(self.targets.len().max(1));
        let mut supervisors: Vec<JoinHandle<()>> = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            let supervisor = ConnectionSupervisor::new(
                self.connector.clone(),
                target.clone(),
                self.settings.retry_backoff,
                reporter.clone(),
                conn_tx.clone(),
            );
            tracing::info!(server = %target.name, addr = %target, "starting connection supervisor");
            supervisors.push(tokio::spawn(supervisor.run()));
        }
        // Only supervisors hold senders now; recv() yields None once all are done.
        drop(conn_tx);

        let mut samplers: HashMap<String, SamplerEntry> = HashMap::new();
        tokio::pin!(quit);

        loop {
            tokio::select! {
                biased;
                _ = &mut quit => break,
                Some((conn, canceller)) = conn_rx.recv() => {
                    let name = conn.target.name.clone();

                    let sampler = Sampler::new(conn, self.settings.poll_interval, reporter.clone());
                    let entry = SamplerEntry {
                        canceller,
                        handle: tokio::spawn(sampler.run()),
                    };
                    if let Some(previous) = samplers.insert(name.clone(), entry) {
                        reporter
                            .warn(&name, format!("Replacing active sampler for {}", name))
                            .await;
                        previous.canceller.cancel();
                    }
                }
            }
        }

        tracing::info!("shutting down monitor");
        let mut summary = ShutdownSummary::default();

        // Supervisors are either sleeping in backoff or mid-attempt; neither
        // holds anything worth finishing.
        for handle in supervisors {
            if !handle.is_finished() {
                summary.supervisors_aborted += 1;
            }
            handle.abort();
        }
        for (name, entry) in samplers.drain() {
            tracing::debug!(server = %name, finished = entry.handle.is_finished(), "cancelling sampler");
            entry.canceller.cancel();
            summary.samplers_cancelled += 1;
        }

        let _ = shutdown_tx.send(true);
        match aggregator.await {
            Ok(view) => summary.targets_seen = view.len(),
            Err(e) => tracing::error!(error = %e, "aggregator task failed"),
        }

        summary
    }
}
