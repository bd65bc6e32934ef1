use std::fmt;

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderPhase {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl ProviderPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderPhase::Queued => "queued",
            ProviderPhase::Running => "running",
            ProviderPhase::Succeeded => "succeeded",
            ProviderPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for ProviderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation of a remote job. `detail` carries the provider's own error
/// text when `phase` is `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderStatus {
    pub phase: ProviderPhase,
    pub raw_payload: Value,
    pub detail: Option<String>,
}

impl ProviderStatus {
    pub fn new(phase: ProviderPhase, raw_payload: Value) -> Self {
        Self {
            phase,
            raw_payload,
            detail: None,
        }
    }

    pub fn failed(raw_payload: Value, detail: impl Into<String>) -> Self {
        Self {
            phase: ProviderPhase::Failed,
            raw_payload,
            detail: Some(detail.into()),
        }
    }
}
