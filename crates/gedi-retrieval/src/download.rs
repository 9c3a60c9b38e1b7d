//! Copying whole partitions to local disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gedi_storage::DatasetStore;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::aggregator::join_in_order;
use crate::error::{Result, RetrievalError};
use crate::progress::{emit, ProgressEvent, ProgressSender};
use crate::reader::PartitionHandle;

/// Files written by a download.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub partitions: usize,
    pub files: Vec<PathBuf>,
    pub bytes: u64,
}

/// Copies the objects of opened partitions into a local directory.
///
/// Files are named `GEDI_<partition>_<path below the partition>` with `/`
/// replaced by `_`, so files from different partitions or subdirectories
/// never collide.
#[derive(Debug, Clone)]
pub struct PartitionDownloader {
    store: DatasetStore,
    workers: usize,
    progress: Option<ProgressSender>,
}

impl PartitionDownloader {
    pub fn new(store: DatasetStore, workers: usize) -> Self {
        Self {
            store,
            workers: workers.max(1),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Some(progress);
        self
    }

    #[instrument(skip_all, fields(partitions = handles.len(), out_dir = %out_dir.display()))]
    pub async fn download(&self, handles: &[PartitionHandle], out_dir: &Path) -> Result<DownloadReport> {
        tokio::fs::create_dir_all(out_dir).await?;
        let semaphore = Arc::new(Semaphore::new(self.workers));

        let tasks: Vec<JoinHandle<Result<(Vec<PathBuf>, u64)>>> = handles
            .iter()
            .cloned()
            .map(|handle| {
                let store = self.store.clone();
                let semaphore = semaphore.clone();
                let progress = self.progress.clone();
                let out_dir = out_dir.to_path_buf();
                tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| RetrievalError::Worker(e.to_string()))?;

                    let slug = handle.address().slug();
                    let prefix = store.path(&handle.address().path_suffix());
                    let mut files = Vec::new();
                    let mut bytes = 0;
                    for meta in handle.sources() {
                        let name = local_name(prefix.as_ref(), meta.location.as_ref());
                        let target = out_dir.join(format!("GEDI_{}_{}", slug, name));
                        bytes += store.download_to(&meta.location, &target).await?;
                        files.push(target);
                    }

                    emit(
                        &progress,
                        ProgressEvent::Downloaded {
                            address: handle.address().path_suffix(),
                            bytes,
                        },
                    );
                    Ok((files, bytes))
                })
            })
            .collect();

        let mut report = DownloadReport {
            partitions: handles.len(),
            ..Default::default()
        };
        for (files, bytes) in join_in_order(tasks).await? {
            report.files.extend(files);
            report.bytes += bytes;
        }

        info!(files = report.files.len(), bytes = report.bytes, "Download complete");
        Ok(report)
    }
}

/// Object path below `prefix`, flattened into a file name.
fn local_name(prefix: &str, location: &str) -> String {
    location
        .strip_prefix(prefix)
        .unwrap_or(location)
        .trim_start_matches('/')
        .replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name() {
        assert_eq!(
            local_name(
                "root/tile=000E_00N",
                "root/tile=000E_00N/year=2020/month=1/part-0.parquet"
            ),
            "year=2020_month=1_part-0.parquet"
        );
        assert_eq!(
            local_name("root/tile=000E_00N/year=2020/month=1", "root/tile=000E_00N/year=2020/month=1/a.parquet"),
            "a.parquet"
        );
    }
}
