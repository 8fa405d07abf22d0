use std::sync::Arc;

use anyhow::Context;
use common::storage::ObjectStore;
use common::storage::filesystem::FilesystemObjectStore;
use common::storage::memory::MemoryObjectStore;
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};

/// Construct the object store selected by `config.backend`.
pub async fn init_object_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory object store; published content is lost on exit");
            Ok(Arc::new(MemoryObjectStore::new()))
        }
        StorageBackend::Filesystem => {
            let store = FilesystemObjectStore::new(config.path.clone(), config.max_object_size)
                .await
                .with_context(|| {
                    format!("Failed to open object store at {}", config.path.display())
                })?;
            info!(path = %config.path.display(), "Using filesystem object store");
            Ok(Arc::new(store))
        }
        StorageBackend::S3 => init_s3(config),
    }
}

#[cfg(feature = "object-storage")]
fn init_s3(config: &StorageConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    use common::storage::s3::{S3ObjectStore, S3Settings};

    let s3 = config
        .s3
        .as_ref()
        .context("storage.backend is s3 but [storage.s3] is not configured")?;
    let store = S3ObjectStore::new(&S3Settings {
        bucket: s3.bucket.clone(),
        region: s3.region.clone(),
        endpoint: s3.endpoint.clone(),
        access_key: s3.access_key.clone(),
        secret_key: s3.secret_key.clone(),
        path_style: s3.path_style,
    })
    .context("Failed to configure S3 object store")?;
    info!(bucket = %s3.bucket, endpoint = %s3.endpoint, "Using S3 object store");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "object-storage"))]
fn init_s3(_config: &StorageConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    anyhow::bail!("storage.backend is s3 but the `object-storage` feature is not enabled")
}
