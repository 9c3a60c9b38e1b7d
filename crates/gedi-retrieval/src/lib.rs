//! Tile resolution and ordered parallel retrieval of GEDI L2 points.
//!
//! A query geometry is reduced to 1x1 degree tiles, an optional date range
//! to year/month time blocks. Each (tile, block) pair names a partition of
//! the hive-partitioned Parquet dataset. Partitions are opened lazily,
//! counted, and then read on a bounded worker pool into one dense table
//! whose rows follow partition address order.
//!
//! # Example
//!
//! ```no_run
//! use gedi_common::{BoundingBox, Geometry, MonthRange};
//! use gedi_retrieval::{ColumnSelector, GediL2};
//!
//! # async fn run() -> gedi_retrieval::Result<()> {
//! let geometry = Geometry::from(BoundingBox::new(9.0, 47.0, 10.5, 48.0));
//! let gedi = GediL2::builder(geometry)
//!     .period(MonthRange::parse("2020-01-01", "2020-12-31")?)
//!     .build()?;
//!
//! let table = gedi
//!     .retrieve(&ColumnSelector::subset(["latitude", "longitude", "rh98"]))
//!     .await?;
//! println!("{} points", table.n_rows());
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod columns;
pub mod config;
pub mod download;
pub mod error;
pub mod facade;
pub mod partition;
pub mod progress;
pub mod query;
pub mod reader;
pub mod scanner;
pub mod schema;
pub mod table;

pub use aggregator::{Discovery, ParallelAggregator};
pub use columns::ColumnSelector;
pub use config::{resolve_workers, RetrievalConfig};
pub use download::{DownloadReport, PartitionDownloader};
pub use error::{Result, RetrievalError};
pub use facade::{ConfirmHook, GediL2, GediL2Builder, ScanSummary};
pub use partition::{resolve_addresses, PartitionAddress};
pub use progress::{progress_channel, ProgressCollector, ProgressEvent, ProgressSender, ProgressTotals};
pub use query::BboxQuery;
pub use reader::{PartitionHandle, PartitionReader};
pub use scanner::{LazyPartition, ParquetPartition, ParquetScanner, PartitionScanner};
pub use schema::{DecodingSchema, DEFAULT_COLUMN_COUNT, L2_V002};
pub use table::{ColumnLabels, ResultTable};
