use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::local::LocalFileSystem;
use object_store::path::Path as StorePath;
use object_store::{ObjectStore, PutPayload};

use crate::application::ports::{MediaStore, MediaStoreError, MediaStream};
use crate::domain::MediaFileName;

/// Media directory on the local filesystem.
pub struct LocalMediaStore {
    inner: Arc<LocalFileSystem>,
    base_path: PathBuf,
}

impl LocalMediaStore {
    pub fn new(base_path: PathBuf) -> Result<Self, MediaStoreError> {
        std::fs::create_dir_all(&base_path)?;
        let base_path = std::fs::canonicalize(&base_path)?;
        let fs = LocalFileSystem::new_with_prefix(&base_path)
            .map_err(|e| MediaStoreError::WriteFailed(e.to_string()))?;
        Ok(Self {
            inner: Arc::new(fs),
            base_path,
        })
    }

    pub fn base_path(&self) -> &std::path::Path {
        &self.base_path
    }
}

fn validate_name(file_name: &str) -> Result<(), MediaStoreError> {
    let bad = file_name.is_empty()
        || file_name.starts_with('.')
        || file_name.contains(['/', '\\'])
        || file_name.contains("..");
    if bad {
        return Err(MediaStoreError::InvalidName(file_name.to_string()));
    }
    Ok(())
}

#[async_trait::async_trait]
impl MediaStore for LocalMediaStore {
    async fn write(&self, name: &MediaFileName, data: Bytes) -> Result<String, MediaStoreError> {
        validate_name(name.as_str())?;
        let size = data.len();
        self.inner
            .put(&StorePath::from(name.as_str()), PutPayload::from(data))
            .await
            .map_err(|e| MediaStoreError::WriteFailed(e.to_string()))?;

        let local_path = self.base_path.join(name.as_str());
        tracing::debug!(path = %local_path.display(), bytes = size, "Media written");
        Ok(local_path.display().to_string())
    }

    async fn open(&self, file_name: &str) -> Result<MediaStream, MediaStoreError> {
        validate_name(file_name)?;
        let result = self
            .inner
            .get(&StorePath::from(file_name))
            .await
            .map_err(|e| match e {
                object_store::Error::NotFound { .. } => {
                    MediaStoreError::NotFound(file_name.to_string())
                }
                other => MediaStoreError::ReadFailed(other.to_string()),
            })?;

        Ok(result
            .into_stream()
            .map_err(|e| MediaStoreError::ReadFailed(e.to_string()))
            .boxed())
    }

    async fn remove(&self, file_name: &str) -> Result<(), MediaStoreError> {
        validate_name(file_name)?;
        match self.inner.delete(&StorePath::from(file_name)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(MediaStoreError::WriteFailed(e.to_string())),
        }
    }
}
