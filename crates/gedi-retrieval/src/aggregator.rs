//! Ordered parallel aggregation of partitions into one dense table.
//!
//! Aggregation runs in two phases:
//!
//! 1. **Discovery** opens every address on a bounded worker pool. Absent
//!    partitions are dropped, the rest keep address order together with
//!    their row counts.
//! 2. **Materialization** allocates the full `rows x columns` buffer up
//!    front, gives each partition the slot starting at the prefix sum of
//!    the preceding row counts, and copies every worker's block into its
//!    slot as it completes. Output order is therefore address order no
//!    matter which worker finishes first.

use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, instrument};

use crate::columns::ColumnSelector;
use crate::config::{RetrievalConfig, DEFAULT_SEQUENTIAL_THRESHOLD};
use crate::error::{Result, RetrievalError};
use crate::partition::PartitionAddress;
use crate::progress::{emit, ProgressEvent, ProgressSender};
use crate::reader::{PartitionHandle, PartitionReader};
use crate::schema::DEFAULT_COLUMN_COUNT;
use crate::table::{dense_block, fill_dense, ColumnLabels, ResultTable};

/// Opened partitions in address order with their row offsets.
#[derive(Debug, Clone)]
pub struct Discovery {
    handles: Vec<PartitionHandle>,
    offsets: Vec<usize>,
    total_rows: usize,
    submitted: usize,
}

impl Discovery {
    fn new(handles: Vec<PartitionHandle>, submitted: usize) -> Self {
        let mut offsets = Vec::with_capacity(handles.len());
        let mut total_rows = 0;
        for handle in &handles {
            offsets.push(total_rows);
            total_rows += handle.row_count();
        }
        Self {
            handles,
            offsets,
            total_rows,
            submitted,
        }
    }

    pub fn handles(&self) -> &[PartitionHandle] {
        &self.handles
    }

    pub fn into_handles(self) -> Vec<PartitionHandle> {
        self.handles
    }

    /// First row of each partition in the aggregated table.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// Number of addresses submitted, including absent ones.
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Decoded schema of the first partition.
    pub fn schema(&self) -> Option<SchemaRef> {
        self.handles.first().map(PartitionHandle::schema)
    }
}

/// Reads partitions on a bounded pool and assembles them in address order.
#[derive(Debug, Clone)]
pub struct ParallelAggregator {
    reader: Arc<PartitionReader>,
    workers: usize,
    sequential_threshold: usize,
    progress: Option<ProgressSender>,
}

impl ParallelAggregator {
    pub fn new(reader: Arc<PartitionReader>, workers: usize) -> Self {
        Self {
            reader,
            workers: workers.max(1),
            sequential_threshold: DEFAULT_SEQUENTIAL_THRESHOLD,
            progress: None,
        }
    }

    pub fn from_config(reader: Arc<PartitionReader>, config: &RetrievalConfig) -> Self {
        Self::new(reader, config.workers()).with_sequential_threshold(config.sequential_threshold)
    }

    pub fn with_sequential_threshold(mut self, threshold: usize) -> Self {
        self.sequential_threshold = threshold;
        self
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn progress(&self) -> Option<&ProgressSender> {
        self.progress.as_ref()
    }

    /// Open every address and keep the ones that exist, in address order.
    #[instrument(skip_all, fields(addresses = addresses.len(), workers = self.workers))]
    pub async fn discover(&self, addresses: &[PartitionAddress]) -> Result<Discovery> {
        let semaphore = Arc::new(Semaphore::new(self.workers));

        let tasks: Vec<JoinHandle<Result<Option<PartitionHandle>>>> = addresses
            .iter()
            .cloned()
            .map(|address| {
                let reader = self.reader.clone();
                let semaphore = semaphore.clone();
                let progress = self.progress.clone();
                tokio::spawn(async move {
                    let _permit = acquire(&semaphore).await?;
                    let handle = reader.try_read(&address).await?;
                    let event = match &handle {
                        Some(h) => ProgressEvent::Discovered {
                            address: address.path_suffix(),
                            rows: h.row_count(),
                        },
                        None => ProgressEvent::Skipped {
                            address: address.path_suffix(),
                        },
                    };
                    emit(&progress, event);
                    Ok(handle)
                })
            })
            .collect();

        let handles: Vec<PartitionHandle> = join_in_order(tasks).await?.into_iter().flatten().collect();
        let discovery = Discovery::new(handles, addresses.len());

        debug!(
            found = discovery.handles.len(),
            rows = discovery.total_rows,
            "Discovery complete"
        );
        Ok(discovery)
    }

    /// Discover and materialize in one call.
    pub async fn aggregate(&self, addresses: &[PartitionAddress], selector: &ColumnSelector) -> Result<ResultTable> {
        let discovery = self.discover(addresses).await?;
        self.materialize(&discovery, selector).await
    }

    /// Read the selected columns of every discovered partition into one table.
    #[instrument(skip_all, fields(partitions = discovery.handles.len(), rows = discovery.total_rows))]
    pub async fn materialize(&self, discovery: &Discovery, selector: &ColumnSelector) -> Result<ResultTable> {
        let Some(first) = discovery.handles.first() else {
            let labels = match selector {
                ColumnSelector::All => ColumnLabels::Positional(DEFAULT_COLUMN_COUNT),
                ColumnSelector::Subset(names) => ColumnLabels::Named(names.clone()),
            };
            return Ok(ResultTable::empty(labels));
        };

        let columns = selector.resolve(&first.schema())?;
        let labels = match selector {
            ColumnSelector::All => ColumnLabels::Positional(columns.len()),
            ColumnSelector::Subset(_) => ColumnLabels::Named(columns.clone()),
        };

        info!(
            "compiling data from {} partitions, {} points",
            discovery.submitted,
            discovery.total_rows
        );

        let data = if discovery.submitted < self.sequential_threshold {
            self.materialize_sequential(discovery, &columns).await?
        } else {
            self.materialize_parallel(discovery, &columns).await?
        };

        metrics::counter!("gedi_points_retrieved_total").increment(discovery.total_rows as u64);
        Ok(ResultTable::from_parts(labels, discovery.total_rows, data))
    }

    async fn materialize_sequential(&self, discovery: &Discovery, columns: &[String]) -> Result<Vec<f64>> {
        let width = columns.len();
        let mut data = vec![0.0; discovery.total_rows * width];
        let slots = split_slots(&mut data, &discovery.handles, width);

        for (handle, slot) in discovery.handles.iter().zip(slots) {
            let batches = handle.collect(columns).await?;
            fill_dense(handle.address(), &batches, handle.row_count(), width, slot)?;
            emit(&self.progress, materialized(handle));
        }

        Ok(data)
    }

    async fn materialize_parallel(&self, discovery: &Discovery, columns: &[String]) -> Result<Vec<f64>> {
        let width = columns.len();
        let columns: Arc<[String]> = columns.into();
        let semaphore = Arc::new(Semaphore::new(self.workers));

        let tasks: Vec<JoinHandle<Result<Vec<f64>>>> = discovery
            .handles
            .iter()
            .cloned()
            .map(|handle| {
                let columns = columns.clone();
                let semaphore = semaphore.clone();
                let progress = self.progress.clone();
                tokio::spawn(async move {
                    let _permit = acquire(&semaphore).await?;
                    let batches = handle.collect(&columns).await?;
                    let block = dense_block(handle.address(), &batches, handle.row_count(), width)?;
                    emit(&progress, materialized(&handle));
                    Ok(block)
                })
            })
            .collect();
        let aborts: Vec<AbortHandle> = tasks.iter().map(JoinHandle::abort_handle).collect();

        let mut data = vec![0.0; discovery.total_rows * width];
        let mut slots: Vec<Option<&mut [f64]>> = split_slots(&mut data, &discovery.handles, width)
            .into_iter()
            .map(Some)
            .collect();

        let mut pending: FuturesUnordered<_> = tasks
            .into_iter()
            .enumerate()
            .map(|(index, task)| async move { (index, task.await) })
            .collect();

        while let Some((index, joined)) = pending.next().await {
            let block = match joined.map_err(RetrievalError::from).and_then(|r| r) {
                Ok(block) => block,
                Err(e) => {
                    abort_all(&aborts);
                    return Err(e);
                }
            };
            if let Some(slot) = slots[index].take() {
                slot.copy_from_slice(&block);
            }
        }
        drop(slots);

        Ok(data)
    }
}

fn materialized(handle: &PartitionHandle) -> ProgressEvent {
    ProgressEvent::Materialized {
        address: handle.address().path_suffix(),
        rows: handle.row_count(),
    }
}

async fn acquire(semaphore: &Arc<Semaphore>) -> Result<tokio::sync::OwnedSemaphorePermit> {
    semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| RetrievalError::Worker(e.to_string()))
}

/// Split `data` into one row-aligned slot per partition.
fn split_slots<'a>(data: &'a mut [f64], handles: &[PartitionHandle], width: usize) -> Vec<&'a mut [f64]> {
    let mut slots = Vec::with_capacity(handles.len());
    let mut rest = data;
    for handle in handles {
        let (slot, tail) = std::mem::take(&mut rest).split_at_mut(handle.row_count() * width);
        slots.push(slot);
        rest = tail;
    }
    slots
}

fn abort_all(aborts: &[AbortHandle]) {
    for handle in aborts {
        handle.abort();
    }
}

/// Await tasks in submission order; the first failure aborts the rest.
pub(crate) async fn join_in_order<T>(tasks: Vec<JoinHandle<Result<T>>>) -> Result<Vec<T>> {
    let aborts: Vec<AbortHandle> = tasks.iter().map(JoinHandle::abort_handle).collect();
    let mut results = Vec::with_capacity(tasks.len());

    for task in tasks {
        match task.await {
            Ok(Ok(value)) => results.push(value),
            Ok(Err(e)) => {
                abort_all(&aborts);
                return Err(e);
            }
            Err(e) => {
                abort_all(&aborts);
                return Err(e.into());
            }
        }
    }

    Ok(results)
}
