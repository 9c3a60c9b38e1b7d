//! Object storage interface for the GEDI L2 dataset (S3 compatible, unsigned).

use std::path::Path as LocalPath;
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::{aws::AmazonS3Builder, path::Path, ObjectMeta, ObjectStore, PutPayload};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use crate::error::{StorageError, StorageResult};

/// Public endpoint hosting the dataset.
pub const DEFAULT_ENDPOINT: &str = "https://s3.eu-central-1.wasabisys.com";

/// Bucket holding the dataset.
pub const DEFAULT_BUCKET: &str = "gedi-ard";

/// Key prefix of the hive-partitioned L2 point dataset inside the bucket.
pub const DEFAULT_DATASET_ROOT: &str =
    "level2/gedi.l2v002_pnt_20190418_20230316_go_epsg.4326_v20231219.parquet";

/// Configuration for object storage connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStorageConfig {
    /// S3 endpoint URL
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Region passed to the S3 client
    pub region: String,
    /// Key prefix of the partitioned dataset
    pub dataset_root: String,
    /// Allow plain HTTP endpoints
    pub allow_http: bool,
    /// Send unsigned (anonymous) requests
    pub skip_signature: bool,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            bucket: DEFAULT_BUCKET.to_string(),
            region: "eu-central-1".to_string(),
            dataset_root: DEFAULT_DATASET_ROOT.to_string(),
            allow_http: false,
            skip_signature: true,
        }
    }
}

/// Read access to the partitioned dataset.
///
/// All paths handed to this type are relative to the dataset root.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    store: Arc<dyn ObjectStore>,
    root: String,
}

impl DatasetStore {
    /// Create an anonymous S3 client from config.
    pub fn new(config: &ObjectStorageConfig) -> StorageResult<Self> {
        let store = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_allow_http(config.allow_http)
            .with_skip_signature(config.skip_signature)
            .build()
            .map_err(|e| StorageError::Config(format!("Failed to create S3 client: {}", e)))?;

        Ok(Self::from_store(Arc::new(store), &config.dataset_root))
    }

    /// Wrap an existing store (local filesystem, in-memory, ...).
    pub fn from_store(store: Arc<dyn ObjectStore>, root: &str) -> Self {
        Self {
            store,
            root: root.trim_matches('/').to_string(),
        }
    }

    /// The underlying object store.
    pub fn inner(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Absolute object path for a suffix below the dataset root.
    pub fn path(&self, suffix: &str) -> Path {
        let suffix = suffix.trim_matches('/');
        if self.root.is_empty() {
            Path::from(suffix)
        } else if suffix.is_empty() {
            Path::from(self.root.as_str())
        } else {
            Path::from(format!("{}/{}", self.root, suffix))
        }
    }

    /// List every object below `prefix` (recursive).
    ///
    /// An absent prefix lists as empty; object stores have no directories.
    #[instrument(skip(self), fields(root = %self.root))]
    pub async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectMeta>> {
        let prefix_path = self.path(prefix);

        let mut objects: Vec<ObjectMeta> = self
            .store
            .list(Some(&prefix_path))
            .try_collect()
            .await
            .map_err(|e| StorageError::from_object_store(prefix_path.as_ref(), e))?;

        // Listing order is store specific.
        objects.sort_by(|a, b| a.location.cmp(&b.location));

        debug!(count = objects.len(), prefix = %prefix_path, "Listed objects");
        Ok(objects)
    }

    /// Metadata of a single object.
    pub async fn head(&self, location: &Path) -> StorageResult<ObjectMeta> {
        self.store
            .head(location)
            .await
            .map_err(|e| StorageError::from_object_store(location.as_ref(), e))
    }

    /// Check if an object exists.
    pub async fn exists(&self, location: &Path) -> StorageResult<bool> {
        match self.head(location).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Read a whole object.
    #[instrument(skip(self), fields(path = %location))]
    pub async fn get(&self, location: &Path) -> StorageResult<Bytes> {
        let result = self
            .store
            .get(location)
            .await
            .map_err(|e| StorageError::from_object_store(location.as_ref(), e))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::from_object_store(location.as_ref(), e))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    /// Write an object below the dataset root.
    pub async fn put(&self, suffix: &str, data: Bytes) -> StorageResult<()> {
        let location = self.path(suffix);
        debug!(size = data.len(), path = %location, "Writing object");

        self.store
            .put(&location, PutPayload::from(data))
            .await
            .map_err(|e| StorageError::from_object_store(location.as_ref(), e))?;

        Ok(())
    }

    /// Stream an object to a local file.
    ///
    /// Data lands in `<target>.partial` first and is renamed once complete,
    /// so an interrupted copy never leaves a truncated file under the final name.
    #[instrument(skip(self), fields(path = %location, target = %target.display()))]
    pub async fn download_to(&self, location: &Path, target: &LocalPath) -> StorageResult<u64> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let partial = target.with_extension("partial");
        let written = match self.write_partial(location, &partial).await {
            Ok(written) => written,
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        warn!(
                            error = %cleanup,
                            path = %partial.display(),
                            "Failed to remove partial download"
                        );
                    }
                }
                return Err(e);
            }
        };

        tokio::fs::rename(&partial, target).await?;

        debug!(bytes = written, "Downloaded object");
        Ok(written)
    }

    async fn write_partial(&self, location: &Path, partial: &LocalPath) -> StorageResult<u64> {
        let result = self
            .store
            .get(location)
            .await
            .map_err(|e| StorageError::from_object_store(location.as_ref(), e))?;

        let mut stream = result.into_stream();
        let mut file = tokio::fs::File::create(partial).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = stream
            .try_next()
            .await
            .map_err(|e| StorageError::from_object_store(location.as_ref(), e))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn memory_store(root: &str) -> DatasetStore {
        DatasetStore::from_store(Arc::new(InMemory::new()), root)
    }

    #[test]
    fn test_default_config() {
        let config = ObjectStorageConfig::default();
        assert_eq!(config.endpoint, "https://s3.eu-central-1.wasabisys.com");
        assert_eq!(config.bucket, "gedi-ard");
        assert!(config.skip_signature);
        assert!(config.dataset_root.starts_with("level2/"));
    }

    #[test]
    fn test_dataset_paths() {
        let store = memory_store("/level2/data.parquet/");
        assert_eq!(
            store.path("tile=000E_00N/year=2020").as_ref(),
            "level2/data.parquet/tile=000E_00N/year=2020"
        );
        assert_eq!(store.path("").as_ref(), "level2/data.parquet");

        let bare = memory_store("");
        assert_eq!(bare.path("tile=001W_01S").as_ref(), "tile=001W_01S");
    }

    #[tokio::test]
    async fn test_list_absent_prefix_is_empty() {
        let store = memory_store("root");
        store
            .put("tile=000E_00N/part-0.parquet", Bytes::from_static(b"abc"))
            .await
            .unwrap();

        assert_eq!(store.list("tile=000E_00N").await.unwrap().len(), 1);
        assert!(store.list("tile=001E_00N").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = memory_store("root");
        let err = store.get(&store.path("nope")).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!store.exists(&store.path("nope")).await.unwrap());
    }

    #[tokio::test]
    async fn test_download_to_local_file() {
        let store = memory_store("root");
        store
            .put("tile=000E_00N/part-0.parquet", Bytes::from_static(b"payload"))
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out").join("part-0.parquet");
        let written = store
            .download_to(&store.path("tile=000E_00N/part-0.parquet"), &target)
            .await
            .unwrap();

        assert_eq!(written, 7);
        assert_eq!(std::fs::read(&target).unwrap(), b"payload");
        assert!(!target.with_extension("partial").exists());
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_partial_file() {
        let store = memory_store("root");
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("part-0.parquet");
        let partial = target.with_extension("partial");
        std::fs::write(&partial, b"stale").unwrap();

        let err = store
            .download_to(&store.path("tile=000E_00N/part-0.parquet"), &target)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(!partial.exists());
        assert!(!target.exists());
    }
}
