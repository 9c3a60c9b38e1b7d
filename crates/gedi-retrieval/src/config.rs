//! Configuration for partition retrieval.

use std::path::Path;

use gedi_storage::ObjectStorageConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

/// Default worker setting: all available cores but five.
pub const DEFAULT_N_JOBS: i32 = -5;

/// Below this many partition addresses the data is materialized sequentially.
pub const DEFAULT_SEQUENTIAL_THRESHOLD: usize = 5;

/// Point count above which retrieval asks for confirmation.
pub const DEFAULT_CONFIRM_THRESHOLD: usize = 10_000_000;

/// Configuration for partition retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Object storage holding the dataset.
    pub storage: ObjectStorageConfig,

    /// Worker count. Positive values are used as is; negative values leave
    /// that many cores unused. Zero is rejected.
    pub n_jobs: i32,

    /// Partition count below which materialization runs sequentially.
    pub sequential_threshold: usize,

    /// Point count above which the confirmation hook is consulted.
    pub confirm_threshold_points: usize,

    /// Report per-partition progress.
    pub progress: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            storage: ObjectStorageConfig::default(),
            n_jobs: DEFAULT_N_JOBS,
            sequential_threshold: DEFAULT_SEQUENTIAL_THRESHOLD,
            confirm_threshold_points: DEFAULT_CONFIRM_THRESHOLD,
            progress: true,
        }
    }
}

impl RetrievalConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("GEDI_ENDPOINT") {
            config.storage.endpoint = val;
        }

        if let Ok(val) = std::env::var("GEDI_BUCKET") {
            config.storage.bucket = val;
        }

        if let Ok(val) = std::env::var("GEDI_REGION") {
            config.storage.region = val;
        }

        if let Ok(val) = std::env::var("GEDI_DATASET_ROOT") {
            config.storage.dataset_root = val;
        }

        if let Ok(val) = std::env::var("GEDI_ALLOW_HTTP") {
            config.storage.allow_http = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("GEDI_N_JOBS") {
            if let Ok(n) = val.parse() {
                config.n_jobs = n;
            }
        }

        if let Ok(val) = std::env::var("GEDI_SEQUENTIAL_THRESHOLD") {
            if let Ok(n) = val.parse() {
                config.sequential_threshold = n;
            }
        }

        if let Ok(val) = std::env::var("GEDI_CONFIRM_THRESHOLD") {
            if let Ok(n) = val.parse() {
                config.confirm_threshold_points = n;
            }
        }

        if let Ok(val) = std::env::var("GEDI_PROGRESS") {
            config.progress = parse_flag(&val);
        }

        config
    }

    /// Load configuration from a YAML file. Missing keys keep their defaults.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RetrievalError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| RetrievalError::config(format!("invalid YAML config: {}", e)))?;
        config.validate().map_err(RetrievalError::Config)?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.n_jobs == 0 {
            return Err("n_jobs must be non-zero".to_string());
        }

        if self.storage.dataset_root.trim_matches('/').is_empty() {
            return Err("storage.dataset_root must not be empty".to_string());
        }

        Ok(())
    }

    /// Worker count on this machine.
    pub fn workers(&self) -> usize {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        resolve_workers(self.n_jobs, available)
    }
}

/// Resolve a worker setting against the number of available cores.
///
/// `n > 0` is used as is, `n < 0` means `max(1, available - |n|)`. Zero is
/// treated as a single worker; [`RetrievalConfig::validate`] rejects it
/// before it gets here.
pub fn resolve_workers(n_jobs: i32, available: usize) -> usize {
    match n_jobs {
        n if n > 0 => n as usize,
        0 => 1,
        n => available.saturating_sub(n.unsigned_abs() as usize).max(1),
    }
}

fn parse_flag(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RetrievalConfig::default();
        assert_eq!(config.n_jobs, -5);
        assert_eq!(config.sequential_threshold, 5);
        assert_eq!(config.confirm_threshold_points, 10_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_workers() {
        assert_eq!(resolve_workers(4, 16), 4);
        assert_eq!(resolve_workers(32, 4), 32);
        assert_eq!(resolve_workers(-5, 16), 11);
        assert_eq!(resolve_workers(-5, 4), 1);
        assert_eq!(resolve_workers(-1, 1), 1);
    }

    #[test]
    fn test_zero_jobs_is_invalid() {
        let config = RetrievalConfig {
            n_jobs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
n_jobs: 8
storage:
  endpoint: http://localhost:9000
  allow_http: true
"#;
        let config = RetrievalConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.n_jobs, 8);
        assert_eq!(config.storage.endpoint, "http://localhost:9000");
        assert!(config.storage.allow_http);
        assert_eq!(config.storage.bucket, "gedi-ard");
        assert_eq!(config.sequential_threshold, 5);
    }

    #[test]
    fn test_yaml_rejects_zero_jobs() {
        let err = RetrievalConfig::from_yaml_str("n_jobs: 0").unwrap_err();
        assert!(matches!(err, RetrievalError::Config(_)));
    }
}
