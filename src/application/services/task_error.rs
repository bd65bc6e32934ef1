use crate::application::ports::{ProviderError, RepositoryError};
use crate::domain::JobId;

use super::RegistryError;

/// Errors returned synchronously to callers of the orchestrator. Failures that
/// happen after a job is accepted are recorded on the job instead.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("invalid parameters [{}]: {message}", .fields.join(", "))]
    Validation { fields: Vec<String>, message: String },
    #[error("unknown model '{model}'{}", .provider.as_ref().map(|p| format!(" for provider '{}'", p)).unwrap_or_default())]
    UnknownModel {
        model: String,
        provider: Option<String>,
    },
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),
    #[error("model '{0}' is ambiguous across providers")]
    AmbiguousModel(String),
    #[error("task {0} not found")]
    TaskNotFound(JobId),
    #[error("task {0} is being updated concurrently; retry later")]
    Conflict(JobId),
    #[error("task store error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<RegistryError> for TaskError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::UnknownProvider(name) => Self::UnknownProvider(name),
            RegistryError::UnknownModel { model, provider } => {
                Self::UnknownModel { model, provider }
            }
            RegistryError::AmbiguousModel(model) => Self::AmbiguousModel(model),
        }
    }
}

impl TaskError {
    /// Maps a validation-time adapter error. Anything that is not a schema
    /// violation is reported against the model.
    pub(crate) fn from_validation(model: &str, provider: &str, e: ProviderError) -> Self {
        match e {
            ProviderError::Validation { fields, message } => Self::Validation { fields, message },
            ProviderError::UnsupportedModel(model) => Self::UnknownModel {
                model,
                provider: Some(provider.to_string()),
            },
            other => Self::Validation {
                fields: Vec::new(),
                message: format!("{model}: {other}"),
            },
        }
    }
}
