use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};

use crate::application::ports::{DownloadError, MediaDownloader};

/// Fetches provider-hosted media over HTTP(S).
pub struct HttpMediaDownloader {
    client: Client,
}

impl HttpMediaDownloader {
    pub fn new(timeout: Duration) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DownloadError::Permanent(format!("http client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn classify(e: reqwest::Error) -> DownloadError {
    if e.is_connect() || e.is_timeout() || e.is_body() {
        DownloadError::Transient(e.to_string())
    } else {
        DownloadError::Permanent(e.to_string())
    }
}

#[async_trait]
impl MediaDownloader for HttpMediaDownloader {
    async fn fetch(&self, url: &str) -> Result<Bytes, DownloadError> {
        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let message = format!("HTTP {status} fetching {url}");
            return Err(if is_transient_status(status) {
                DownloadError::Transient(message)
            } else {
                DownloadError::Permanent(message)
            });
        }

        let bytes = response.bytes().await.map_err(classify)?;
        tracing::debug!(url, bytes = bytes.len(), "Media downloaded");
        Ok(bytes)
    }
}
