//! Messages flowing into the aggregator, and the handle producers use to send them.

use common::models::{LogEntry, ProcessSnapshot};
use tokio::sync::mpsc;

/// Input of the aggregator loop.
#[derive(Debug)]
pub enum Event {
    Snapshot(ProcessSnapshot),
    Log(LogEntry),
}

/// Producer-side handle of the aggregator channel.
///
/// Log helpers emit a `tracing` event and a [`LogEntry`] together, so the
/// process log and the on-screen log never diverge.
#[derive(Debug, Clone)]
pub struct Reporter {
    tx: mpsc::Sender<Event>,
}

impl Reporter {
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self { tx }
    }

    /// Creates a reporter and the receiving end the aggregator consumes.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }

    /// Forwards a snapshot; dropped silently once the aggregator has stopped.
    pub async fn snapshot(&self, snapshot: ProcessSnapshot) {
        if self.tx.send(Event::Snapshot(snapshot)).await.is_err() {
            tracing::debug!("aggregator stopped, snapshot dropped");
        }
    }

    pub async fn info(&self, server: &str, message: String) {
        tracing::info!(server, "{}", message);
        self.log(message).await;
    }

    pub async fn warn(&self, server: &str, message: String) {
        tracing::warn!(server, "{}", message);
        self.log(message).await;
    }

    async fn log(&self, message: String) {
        // Nothing left to display it once the aggregator is gone.
        let _ = self.tx.send(Event::Log(LogEntry::now(message))).await;
    }
}
