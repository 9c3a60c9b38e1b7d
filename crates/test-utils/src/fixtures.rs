//! Common test fixtures for GEDI L2 tests.

use std::sync::Arc;

use gedi_storage::DatasetStore;
use object_store::memory::InMemory;

/// Dataset root used by in-memory fixtures.
pub const TEST_DATASET_ROOT: &str = "level2/gedi.test.parquet";

/// Common bounding box definitions for testing, as `(min_x, min_y, max_x, max_y)`.
pub mod bbox {
    /// Two by two degrees around the origin, four tiles.
    pub const ORIGIN: (f64, f64, f64, f64) = (-1.0, -1.0, 1.0, 1.0);
}

/// Tile ids covering [`bbox::ORIGIN`], longitude-major.
pub const ORIGIN_TILES: [&str; 4] = ["001W_01S", "001W_00N", "000E_01S", "000E_00N"];

/// An empty in-memory dataset.
pub fn memory_dataset() -> DatasetStore {
    DatasetStore::from_store(Arc::new(InMemory::new()), TEST_DATASET_ROOT)
}
