use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure kinds recorded on a job. These are data on the record, never
/// returned to a caller as control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobErrorKind {
    #[serde(rename = "ProviderSubmissionError")]
    ProviderSubmission,
    #[serde(rename = "ProviderTimeoutError")]
    ProviderTimeout,
    #[serde(rename = "ProviderFailureError")]
    ProviderFailure,
    #[serde(rename = "DownloadError")]
    Download,
}

impl JobErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobErrorKind::ProviderSubmission => "ProviderSubmissionError",
            JobErrorKind::ProviderTimeout => "ProviderTimeoutError",
            JobErrorKind::ProviderFailure => "ProviderFailureError",
            JobErrorKind::Download => "DownloadError",
        }
    }
}

impl fmt::Display for JobErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: JobErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl JobError {
    pub fn submission(message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind: JobErrorKind::ProviderSubmission,
            message: message.into(),
            retryable,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: JobErrorKind::ProviderTimeout,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn provider_failure(message: impl Into<String>) -> Self {
        Self {
            kind: JobErrorKind::ProviderFailure,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn download(message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind: JobErrorKind::Download,
            message: message.into(),
            retryable,
        }
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
