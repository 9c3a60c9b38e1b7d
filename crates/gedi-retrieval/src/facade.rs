//! High-level entry point: geometry and period in, points out.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use gedi_common::{tiles_for_geometry, Geometry, MonthRange, TileId, TimeBlock};
use gedi_storage::DatasetStore;
use tracing::{info, instrument, warn};

use crate::aggregator::{Discovery, ParallelAggregator};
use crate::columns::ColumnSelector;
use crate::config::RetrievalConfig;
use crate::download::{DownloadReport, PartitionDownloader};
use crate::error::{Result, RetrievalError};
use crate::partition::{resolve_addresses, PartitionAddress};
use crate::progress::{progress_channel, ProgressTotals};
use crate::query::BboxQuery;
use crate::reader::PartitionReader;
use crate::scanner::{ParquetScanner, PartitionScanner};
use crate::table::ResultTable;

/// Decides whether a retrieval of `n` points may proceed.
pub type ConfirmHook = Arc<dyn Fn(usize) -> bool + Send + Sync>;

/// Schema and size of the data matching a query.
#[derive(Debug, Clone)]
pub struct ScanSummary {
    /// Decoded schema, `None` when no partition exists.
    pub schema: Option<SchemaRef>,
    pub row_count: usize,
    /// Partitions that exist.
    pub partitions: usize,
    /// Addresses looked up.
    pub addresses: usize,
}

/// Retrieval of GEDI L2 points covering a geometry.
#[derive(Clone)]
pub struct GediL2 {
    geometry: Geometry,
    period: Option<MonthRange>,
    config: RetrievalConfig,
    reader: Arc<PartitionReader>,
    store: Option<DatasetStore>,
    confirm: ConfirmHook,
}

impl fmt::Debug for GediL2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GediL2")
            .field("geometry", &self.geometry.kind())
            .field("period", &self.period)
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for [`GediL2`].
pub struct GediL2Builder {
    geometry: Geometry,
    period: Option<MonthRange>,
    config: RetrievalConfig,
    scanner: Option<Arc<dyn PartitionScanner>>,
    store: Option<DatasetStore>,
    confirm: Option<ConfirmHook>,
}

impl GediL2Builder {
    /// Restrict to a date range. The full mission window means no restriction.
    pub fn period(mut self, period: MonthRange) -> Self {
        self.period = if period.is_mission() { None } else { Some(period) };
        self
    }

    pub fn config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    /// Read from an existing dataset store.
    pub fn store(mut self, store: DatasetStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a custom partition scanner instead of Parquet over the store.
    pub fn scanner(mut self, scanner: Arc<dyn PartitionScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    /// Hook consulted before retrieving more than the configured number of points.
    pub fn confirm<F>(mut self, hook: F) -> Self
    where
        F: Fn(usize) -> bool + Send + Sync + 'static,
    {
        self.confirm = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<GediL2> {
        self.config.validate().map_err(RetrievalError::Config)?;

        let store = match (self.store, &self.scanner) {
            (Some(store), _) => Some(store),
            (None, None) => Some(DatasetStore::new(&self.config.storage)?),
            (None, Some(_)) => None,
        };

        let scanner: Arc<dyn PartitionScanner> = match (self.scanner, &store) {
            (Some(scanner), _) => scanner,
            (None, Some(store)) => Arc::new(ParquetScanner::new(store.clone())),
            (None, None) => return Err(RetrievalError::config("no dataset store or scanner")),
        };

        Ok(GediL2 {
            geometry: self.geometry,
            period: self.period,
            config: self.config,
            reader: Arc::new(PartitionReader::new(scanner)),
            store,
            confirm: self.confirm.unwrap_or_else(|| Arc::new(|_| true)),
        })
    }
}

impl GediL2 {
    pub fn builder(geometry: Geometry) -> GediL2Builder {
        GediL2Builder {
            geometry,
            period: None,
            config: RetrievalConfig::default(),
            scanner: None,
            store: None,
            confirm: None,
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn period(&self) -> Option<&MonthRange> {
        self.period.as_ref()
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn tiles(&self) -> Result<Vec<TileId>> {
        Ok(tiles_for_geometry(&self.geometry)?)
    }

    /// Compressed time blocks, `None` without a period restriction.
    pub fn time_blocks(&self) -> Option<Vec<TimeBlock>> {
        self.period.as_ref().map(MonthRange::time_blocks)
    }

    pub fn addresses(&self) -> Result<Vec<PartitionAddress>> {
        let tiles = self.tiles()?;
        let blocks = self.time_blocks();
        Ok(resolve_addresses(&tiles, blocks.as_deref()))
    }

    fn aggregator(&self) -> (ParallelAggregator, Option<tokio::task::JoinHandle<ProgressTotals>>) {
        let aggregator = ParallelAggregator::from_config(self.reader.clone(), &self.config);
        if !self.config.progress {
            return (aggregator, None);
        }
        let (tx, collector) = progress_channel();
        (aggregator.with_progress(tx), Some(collector.spawn()))
    }

    async fn discover(&self) -> Result<Discovery> {
        let addresses = self.addresses()?;
        let (aggregator, progress) = self.aggregator();
        let discovery = aggregator.discover(&addresses).await?;
        drop(aggregator);
        finish_progress(progress).await;
        Ok(discovery)
    }

    /// Consult the confirmation hook for large point counts.
    fn check_confirmation(&self, n_points: usize) -> Result<()> {
        if n_points > self.config.confirm_threshold_points && !(self.confirm)(n_points) {
            warn!(points = n_points, "Retrieval declined");
            return Err(RetrievalError::Aborted { n_points });
        }
        Ok(())
    }

    /// Retrieve the selected columns of every point in the covering partitions.
    #[instrument(skip(self), fields(columns = %columns))]
    pub async fn retrieve(&self, columns: &ColumnSelector) -> Result<ResultTable> {
        let addresses = self.addresses()?;
        let (aggregator, progress) = self.aggregator();

        let discovery = aggregator.discover(&addresses).await?;
        self.check_confirmation(discovery.total_rows())?;

        let table = aggregator.materialize(&discovery, columns).await?;
        drop(aggregator);
        finish_progress(progress).await;

        info!(rows = table.n_rows(), width = table.width(), "Retrieval complete");
        Ok(table)
    }

    /// Count the points without reading column data.
    #[instrument(skip(self))]
    pub async fn scan(&self) -> Result<ScanSummary> {
        let addresses = self.addresses()?.len();
        let discovery = self.discover().await?;
        Ok(ScanSummary {
            schema: discovery.schema(),
            row_count: discovery.total_rows(),
            partitions: discovery.handles().len(),
            addresses,
        })
    }

    /// One lazy, box-filtered query per existing partition, in address order.
    pub async fn bbox_queries(&self, columns: &ColumnSelector) -> Result<Vec<BboxQuery>> {
        let bbox = self.geometry.envelope()?;
        let discovery = self.discover().await?;

        discovery
            .into_handles()
            .into_iter()
            .map(|handle| {
                let names = columns.resolve(&handle.schema())?;
                Ok(BboxQuery::new(handle, names, bbox))
            })
            .collect()
    }

    /// Copy every existing partition into `out_dir`.
    pub async fn download(&self, out_dir: &Path) -> Result<DownloadReport> {
        let store = self
            .store
            .clone()
            .ok_or_else(|| RetrievalError::config("download requires a dataset store"))?;

        let addresses = self.addresses()?;
        let (aggregator, progress) = self.aggregator();
        let discovery = aggregator.discover(&addresses).await?;
        self.check_confirmation(discovery.total_rows())?;

        let mut downloader = PartitionDownloader::new(store, aggregator.workers());
        if let Some(tx) = aggregator.progress().cloned() {
            downloader = downloader.with_progress(tx);
        }
        drop(aggregator);

        let report = downloader.download(discovery.handles(), out_dir).await?;
        drop(downloader);
        finish_progress(progress).await;
        Ok(report)
    }
}

async fn finish_progress(progress: Option<tokio::task::JoinHandle<ProgressTotals>>) {
    if let Some(handle) = progress {
        if let Ok(totals) = handle.await {
            info!(
                partitions = totals.discovered,
                skipped = totals.skipped,
                compiled = totals.materialized,
                "Progress summary"
            );
        }
    }
}
