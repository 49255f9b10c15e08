use crate::error::VaultError;
use crate::reference::ObjectRef;
use anyhow::{Result, anyhow};
use opendal::layers::{RetryLayer, TimeoutLayer};
use opendal::services::{Fs, S3};
use opendal::{ErrorKind, FuturesBytesStream, Metadata, Operator};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const BACKEND_TIMEOUT: Duration = Duration::from_secs(30);
const BACKEND_IO_TIMEOUT: Duration = Duration::from_secs(10);

/// Storage configuration
#[derive(Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub workspace: PathBuf,
}

#[derive(Clone)]
pub enum StorageBackend {
    Local,
    S3 {
        bucket: String,
        endpoint: Option<String>,
        region: Option<String>,
        access_key_id: String,
        secret_access_key: String,
    },
}

/// Read-side access to the blob backend. All operations are reads; this
/// service never writes to storage.
#[derive(Clone)]
pub struct StorageManager {
    operator: Operator,
    config: StorageConfig,
}

impl StorageManager {
    pub async fn new(config: StorageConfig) -> Result<Self> {
        let operator = match &config.backend {
            StorageBackend::Local => build_fs_operator(&config.workspace)?,
            StorageBackend::S3 {
                bucket,
                endpoint,
                region,
                access_key_id,
                secret_access_key,
            } => build_s3_operator(
                bucket,
                endpoint.as_deref(),
                region.as_deref(),
                access_key_id,
                secret_access_key,
            )?,
        };

        Ok(Self { operator, config })
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.config.backend, StorageBackend::S3 { .. })
    }

    pub fn backend_name(&self) -> &'static str {
        match self.config.backend {
            StorageBackend::Local => "local",
            StorageBackend::S3 { .. } => "s3",
        }
    }

    /// Size and content type of one object
    pub async fn stat(&self, object: &ObjectRef) -> Result<Metadata, VaultError> {
        let key = object.key();
        self.operator
            .stat(&key)
            .await
            .map_err(|error| read_error(&key, error))
    }

    /// Open a byte-range read stream over one object. Bytes flow through
    /// without whole-object buffering.
    pub async fn open_read(
        &self,
        object: &ObjectRef,
        range: Range<u64>,
    ) -> Result<FuturesBytesStream, VaultError> {
        let key = object.key();
        let reader = self
            .operator
            .reader(&key)
            .await
            .map_err(|error| read_error(&key, error))?;

        reader
            .into_bytes_stream(range)
            .await
            .map_err(|error| read_error(&key, error))
    }
}

fn read_error(key: &str, error: opendal::Error) -> VaultError {
    if error.kind() == ErrorKind::NotFound {
        VaultError::NotFound(key.to_string())
    } else {
        VaultError::BackendUnavailable(error.to_string())
    }
}

fn build_fs_operator(root: &Path) -> Result<Operator> {
    info!(root = ?root, "Building filesystem operator");

    let mut builder = Fs::default();
    builder = builder.root(
        root.to_str()
            .ok_or_else(|| anyhow!("Invalid root path: {:?}", root))?,
    );

    Ok(Operator::new(builder)?
        .layer(RetryLayer::new().with_max_times(3))
        .layer(
            TimeoutLayer::new()
                .with_timeout(BACKEND_TIMEOUT)
                .with_io_timeout(BACKEND_IO_TIMEOUT),
        )
        .finish())
}

fn build_s3_operator(
    bucket: &str,
    endpoint: Option<&str>,
    region: Option<&str>,
    access_key_id: &str,
    secret_access_key: &str,
) -> Result<Operator> {
    info!(
        bucket = %bucket,
        endpoint = ?endpoint,
        region = ?region,
        "Building S3 operator"
    );

    let mut builder = S3::default();
    builder = builder.bucket(bucket);
    builder = builder.access_key_id(access_key_id);
    builder = builder.secret_access_key(secret_access_key);

    if let Some(region) = region {
        builder = builder.region(region);
    }

    if let Some(endpoint) = endpoint {
        builder = builder.endpoint(endpoint);
    }

    Ok(Operator::new(builder)?
        .layer(RetryLayer::new().with_max_times(3))
        .layer(
            TimeoutLayer::new()
                .with_timeout(BACKEND_TIMEOUT)
                .with_io_timeout(BACKEND_IO_TIMEOUT),
        )
        .finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn temp_workspace() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("course-vault-storage-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(dir.join("videos")).unwrap();
        dir
    }

    async fn manager(workspace: &Path) -> StorageManager {
        StorageManager::new(StorageConfig {
            backend: StorageBackend::Local,
            workspace: workspace.to_path_buf(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_stat_and_ranged_read() {
        let workspace = temp_workspace();
        std::fs::write(workspace.join("videos/clip.mp4"), b"0123456789").unwrap();

        let storage = manager(&workspace).await;
        let object = ObjectRef::parse("videos/clip.mp4").unwrap();

        let meta = storage.stat(&object).await.unwrap();
        assert_eq!(meta.content_length(), 10);

        let mut stream = storage.open_read(&object, 2..6).await.unwrap();
        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, b"2345");

        std::fs::remove_dir_all(&workspace).ok();
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let workspace = temp_workspace();
        let storage = manager(&workspace).await;
        let object = ObjectRef::parse("videos/absent.mp4").unwrap();

        let result = storage.stat(&object).await;
        assert!(matches!(result, Err(VaultError::NotFound(_))));

        std::fs::remove_dir_all(&workspace).ok();
    }
}
