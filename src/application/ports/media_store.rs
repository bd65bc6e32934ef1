use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::domain::MediaFileName;

/// Chunks of a stored artifact, read lazily.
pub type MediaStream = BoxStream<'static, Result<Bytes, MediaStoreError>>;

/// Durable blob storage for downloaded media.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Writes `data` under `name` and returns the local path of the artifact.
    async fn write(&self, name: &MediaFileName, data: Bytes) -> Result<String, MediaStoreError>;

    /// A missing artifact is reported here, before any chunk is produced.
    async fn open(&self, file_name: &str) -> Result<MediaStream, MediaStoreError>;

    /// Deleting an artifact that is already gone succeeds.
    async fn remove(&self, file_name: &str) -> Result<(), MediaStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MediaStoreError {
    #[error("write failed: {0}")]
    WriteFailed(String),
    #[error("read failed: {0}")]
    ReadFailed(String),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
