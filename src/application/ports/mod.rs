mod job_repository;
mod media_downloader;
mod media_store;
mod provider_adapter;
mod repository_error;

pub use job_repository::{JobFilter, JobOrdering, JobRepository, JobSortField};
pub use media_downloader::{DownloadError, MediaDownloader};
pub use media_store::{MediaStore, MediaStoreError, MediaStream};
pub use provider_adapter::{ProviderAdapter, ProviderError};
pub use repository_error::RepositoryError;
