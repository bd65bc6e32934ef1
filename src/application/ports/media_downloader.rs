use async_trait::async_trait;
use bytes::Bytes;

#[async_trait]
pub trait MediaDownloader: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, DownloadError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DownloadError {
    /// Connection drops, timeouts, 5xx and 429 responses.
    #[error("transient download failure: {0}")]
    Transient(String),
    #[error("download failed: {0}")]
    Permanent(String),
}

impl DownloadError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DownloadError::Transient(_))
    }
}
