//! Fan-in of snapshots and log entries into the published view.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::models::{LogEntry, ProcessSnapshot, RenderFrame, StatusView};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};

use super::{Event, LogSink};

/// Receives every refresh the aggregator triggers.
pub trait FrameSink: Send + 'static {
    fn publish(&mut self, frame: Arc<RenderFrame>);
}

/// Most-recent-wins delivery: readers only ever see the latest frame.
impl FrameSink for watch::Sender<Arc<RenderFrame>> {
    fn publish(&mut self, frame: Arc<RenderFrame>) {
        self.send_replace(frame);
    }
}

/// Every frame, in order.
impl FrameSink for mpsc::UnboundedSender<Arc<RenderFrame>> {
    fn publish(&mut self, frame: Arc<RenderFrame>) {
        let _ = self.send(frame);
    }
}

/// Sole owner of the status view and the log sink.
///
/// Refresh rules:
/// - first snapshot for a target: immediately
/// - later snapshots: deferred to the next periodic tick
/// - log entry: immediately
/// - periodic tick: always
pub struct Aggregator<F: FrameSink> {
    view: StatusView,
    logs: LogSink,
    generation: u64,
    sink: F,
    refresh_interval: Duration,
}

impl<F: FrameSink> Aggregator<F> {
    pub fn new(sink: F, refresh_interval: Duration, log_capacity: usize) -> Self {
        Self {
            view: StatusView::new(),
            logs: LogSink::new(log_capacity),
            generation: 0,
            sink,
            refresh_interval,
        }
    }

    /// Processes events until shutdown is signalled or every producer is gone.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<Event>,
        mut shutdown: watch::Receiver<bool>,
    ) -> StatusView {
        let mut ticker = time::interval_at(
            Instant::now() + self.refresh_interval,
            self.refresh_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
                _ = ticker.tick() => self.refresh(),
            }
        }

        tracing::debug!(generation = self.generation, targets = self.view.len(), "aggregator stopped");
        self.view
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Snapshot(snapshot) => {
                if self.apply_snapshot(snapshot) {
                    self.refresh();
                }
            }
            Event::Log(entry) => self.apply_log(entry),
        }
    }

    /// Stores the snapshot. Returns `true` when it was the target's first one.
    fn apply_snapshot(&mut self, snapshot: ProcessSnapshot) -> bool {
        self.view.upsert(snapshot)
    }

    fn apply_log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
        self.refresh();
    }

    /// Publishes the current view and logs as a new frame.
    pub fn refresh(&mut self) {
        self.generation += 1;
        let frame = RenderFrame {
            generation: self.generation,
            rendered_at: Utc::now(),
            view: self.view.clone(),
            logs: self.logs.to_vec(),
        };
        self.sink.publish(Arc::new(frame));
    }

    #[cfg(test)]
    pub fn view(&self) -> &StatusView {
        &self.view
    }

    #[cfg(test)]
    pub fn logs(&self) -> &LogSink {
        &self.logs
    }
}
