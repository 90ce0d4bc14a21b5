use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::error::StagingError;

/// A staging store with periodic housekeeping.
#[async_trait]
pub trait Sweepable: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Flush pending expirations and delete orphaned files. Returns the
    /// number of files removed.
    async fn sweep(&self) -> Result<usize, StagingError>;
}

/// Background task that sweeps staging stores on a fixed interval.
pub struct Sweeper {
    targets: Vec<Arc<dyn Sweepable>>,
    period: Duration,
    shutdown_rx: mpsc::Receiver<()>,
}

impl Sweeper {
    /// Create a sweeper and the sender that stops it.
    #[must_use]
    pub fn new(period: Duration) -> (Self, mpsc::Sender<()>) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        (
            Self {
                targets: Vec::new(),
                period,
                shutdown_rx,
            },
            shutdown_tx,
        )
    }

    #[must_use]
    pub fn with_target(mut self, target: Arc<dyn Sweepable>) -> Self {
        self.targets.push(target);
        self
    }

    /// Sweep every target once. Returns the total number of files removed.
    pub async fn sweep_once(&self) -> usize {
        let mut removed = 0;
        for target in &self.targets {
            match target.sweep().await {
                Ok(n) => {
                    debug!(store = target.name(), removed = n, "staging sweep finished");
                    removed += n;
                }
                Err(e) => warn!(store = target.name(), error = %e, "staging sweep failed"),
            }
        }
        removed
    }

    /// Run until a shutdown message arrives or the sender is dropped.
    pub async fn run(mut self) {
        info!(period = ?self.period, targets = self.targets.len(), "staging sweeper started");
        let mut ticker = interval(self.period);
        // The first tick fires immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("staging sweeper received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = self.sweep_once().await;
                    if removed > 0 {
                        info!(removed, "staging sweep removed orphaned files");
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sweeper")
            .field("period", &self.period)
            .field("targets", &self.targets.iter().map(|t| t.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
