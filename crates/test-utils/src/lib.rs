//! Shared test utilities for the GEDI L2 workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic GEDI point batches with predictable values
//! - In-memory datasets seeded with Parquet partitions
//! - Common test fixtures
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{memory_dataset, point_batch, write_partition, PointSpec};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Assert that `left` is within a relative tolerance of `right` (default 1e-12).
#[macro_export]
macro_rules! assert_close {
    ($left:expr, $right:expr) => {
        $crate::assert_close!($left, $right, 1e-12)
    };
    ($left:expr, $right:expr, $rel:expr) => {{
        let (l, r): (f64, f64) = ($left, $right);
        assert!(
            (l - r).abs() <= $rel * r.abs(),
            "assertion failed: {} is not within relative {} of {}",
            l,
            $rel,
            r
        );
    }};
}
