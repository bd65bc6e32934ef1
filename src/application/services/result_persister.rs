use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;

use crate::application::ports::{DownloadError, MediaDownloader, MediaStore};
use crate::domain::{JobError, JobResult, MediaFileName, MediaItem};

use super::Backoff;

#[derive(Debug, Clone, Copy)]
pub struct DownloadPolicy {
    pub max_retries: u32,
    pub backoff: Backoff,
}

/// Copies provider-hosted media into durable storage.
pub struct ResultPersister {
    downloader: Arc<dyn MediaDownloader>,
    store: Arc<dyn MediaStore>,
    policy: DownloadPolicy,
}

impl ResultPersister {
    pub fn new(
        downloader: Arc<dyn MediaDownloader>,
        store: Arc<dyn MediaStore>,
        policy: DownloadPolicy,
    ) -> Self {
        Self {
            downloader,
            store,
            policy,
        }
    }

    /// Downloads every item concurrently and returns the result with
    /// `local_path` or a per-item `DownloadError` filled in. Item order is
    /// preserved.
    pub async fn persist(&self, provider: &str, mut result: JobResult) -> JobResult {
        let items = std::mem::take(&mut result.videos);
        result.videos = join_all(
            items
                .into_iter()
                .map(|item| self.persist_item(provider, item)),
        )
        .await;
        result
    }

    /// Deletes the stored artifacts of a result that will never be committed.
    pub async fn discard(&self, result: &JobResult) {
        for local_path in result.videos.iter().filter_map(|item| item.local_path.as_deref()) {
            let Some(file_name) = std::path::Path::new(local_path)
                .file_name()
                .and_then(|name| name.to_str())
            else {
                tracing::warn!(local_path, "Orphaned media has no file name; left in place");
                continue;
            };
            match self.store.remove(file_name).await {
                Ok(()) => tracing::info!(local_path, "Discarded uncommitted media"),
                Err(e) => {
                    tracing::warn!(local_path, error = %e, "Failed to discard orphaned media")
                }
            }
        }
    }

    #[tracing::instrument(skip(self, item), fields(index = item.index, url = %item.url))]
    async fn persist_item(&self, provider: &str, mut item: MediaItem) -> MediaItem {
        let bytes = match self.download_with_retry(&item.url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Media download failed");
                item.error = Some(JobError::download(e.to_string(), e.is_transient()));
                return item;
            }
        };

        let file_name = MediaFileName::generate(provider, item.index, &item.url);
        match self.store.write(&file_name, bytes).await {
            Ok(local_path) => {
                tracing::info!(local_path = %local_path, "Media persisted");
                item.local_path = Some(local_path);
            }
            Err(e) => {
                tracing::error!(error = %e, file_name = %file_name, "Failed to store media");
                item.error = Some(JobError::download(
                    format!("failed to store media: {e}"),
                    false,
                ));
            }
        }
        item
    }

    async fn download_with_retry(&self, url: &str) -> Result<Bytes, DownloadError> {
        let mut retries = 0;
        loop {
            match self.downloader.fetch(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_transient() && retries < self.policy.max_retries => {
                    let delay = self.policy.backoff.delay(retries);
                    retries += 1;
                    tracing::debug!(
                        error = %e,
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        "Transient download failure; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
