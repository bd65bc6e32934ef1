use async_trait::async_trait;

use crate::domain::{JobResult, Parameters, ProviderDescriptor, ProviderStatus};

/// Uniform interface to one remote video-generation backend.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn descriptor(&self) -> &ProviderDescriptor;

    /// Checks `parameters` against the model's schema and returns the
    /// normalized set to store and submit. Never touches the network.
    fn validate_parameters(
        &self,
        model: &str,
        parameters: &Parameters,
    ) -> Result<Parameters, ProviderError>;

    /// Creates the remote job and returns the provider's identifier for it.
    async fn submit(&self, model: &str, parameters: &Parameters) -> Result<String, ProviderError>;

    async fn fetch_status(&self, external_job_id: &str) -> Result<ProviderStatus, ProviderError>;

    /// Maps a success payload to canonical media items. Pure.
    fn normalize_result(
        &self,
        raw_payload: &serde_json::Value,
    ) -> Result<JobResult, ProviderError>;

    /// Best-effort remote cancellation. Returns whether the provider
    /// acknowledged it.
    async fn cancel(&self, _external_job_id: &str) -> Result<bool, ProviderError> {
        Ok(false)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("invalid parameters [{}]: {message}", .fields.join(", "))]
    Validation {
        fields: Vec<String>,
        message: String,
    },
    #[error("model not supported by provider: {0}")]
    UnsupportedModel(String),
    #[error("submission rejected: {message}")]
    Submission { message: String, retryable: bool },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("provider not configured: {0}")]
    Configuration(String),
}

impl ProviderError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ProviderError::Validation {
            fields: vec![field.to_string()],
            message: message.into(),
        }
    }

    /// Whether retrying the same call may succeed and cannot create a
    /// duplicate remote job.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Submission { retryable, .. } => *retryable,
            ProviderError::Transport(_) => true,
            _ => false,
        }
    }
}
