//! Per-partition progress events.
//!
//! Workers send events over an unbounded channel; a collector task logs them
//! and keeps running totals. The collector finishes once every sender is
//! dropped.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One unit of finished work.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A partition was opened and counted.
    Discovered { address: String, rows: usize },
    /// A partition address had no data.
    Skipped { address: String },
    /// A partition's rows were read and placed.
    Materialized { address: String, rows: usize },
    /// A partition's files were copied locally.
    Downloaded { address: String, bytes: u64 },
}

pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Running totals over all received events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressTotals {
    pub discovered: usize,
    pub skipped: usize,
    pub materialized: usize,
    pub downloaded: usize,
    pub rows_discovered: usize,
    pub rows_materialized: usize,
    pub bytes_downloaded: u64,
}

impl ProgressTotals {
    fn apply(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Discovered { rows, .. } => {
                self.discovered += 1;
                self.rows_discovered += rows;
            }
            ProgressEvent::Skipped { .. } => self.skipped += 1,
            ProgressEvent::Materialized { rows, .. } => {
                self.materialized += 1;
                self.rows_materialized += rows;
            }
            ProgressEvent::Downloaded { bytes, .. } => {
                self.downloaded += 1;
                self.bytes_downloaded += bytes;
            }
        }
    }
}

/// Receiving end of a progress channel.
#[derive(Debug)]
pub struct ProgressCollector {
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
}

/// Create a progress channel.
pub fn progress_channel() -> (ProgressSender, ProgressCollector) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, ProgressCollector { rx })
}

impl ProgressCollector {
    /// Consume events until all senders are gone.
    pub async fn run(mut self) -> ProgressTotals {
        let mut totals = ProgressTotals::default();
        while let Some(event) = self.rx.recv().await {
            totals.apply(&event);
            match &event {
                ProgressEvent::Discovered { address, rows } => {
                    debug!(address = %address, rows = rows, done = totals.discovered, "Partition counted");
                }
                ProgressEvent::Skipped { address } => {
                    debug!(address = %address, "Partition absent");
                }
                ProgressEvent::Materialized { address, rows } => {
                    info!(
                        address = %address,
                        rows = rows,
                        done = totals.materialized,
                        "Partition compiled"
                    );
                }
                ProgressEvent::Downloaded { address, bytes } => {
                    info!(address = %address, bytes = bytes, "Partition downloaded");
                }
            }
        }
        totals
    }

    /// Run the collector on the current runtime.
    pub fn spawn(self) -> JoinHandle<ProgressTotals> {
        tokio::spawn(self.run())
    }
}

/// Send an event if progress reporting is enabled.
pub(crate) fn emit(progress: &Option<ProgressSender>, event: ProgressEvent) {
    if let Some(tx) = progress {
        // The collector may have been dropped; progress is best effort.
        let _ = tx.send(event);
    }
}
