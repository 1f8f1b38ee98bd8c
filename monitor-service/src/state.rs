//! Application state for the monitor's HTTP surface.

use std::sync::Arc;

use common::config::AppConfig;
use common::models::{RenderFrame, Target};
use tokio::sync::{mpsc, watch};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Targets as loaded from the target file, in file order.
    pub targets: Arc<Vec<Target>>,
    /// Latest frame published by the aggregator.
    pub frames: watch::Receiver<Arc<RenderFrame>>,
    /// Asks the monitor to quit.
    pub quit: mpsc::Sender<()>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        targets: Vec<Target>,
        frames: watch::Receiver<Arc<RenderFrame>>,
        quit: mpsc::Sender<()>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            targets: Arc::new(targets),
            frames,
            quit,
        }
    }

    /// Current frame without holding the watch lock.
    pub fn frame(&self) -> Arc<RenderFrame> {
        self.frames.borrow().clone()
    }
}
