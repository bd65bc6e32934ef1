use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::JobError;

/// One generated video in canonical form.
///
/// `url` is the provider-issued location and is time-limited; `local_path` is
/// the durable copy written by the result persister.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub index: u32,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl MediaItem {
    pub fn new(index: u32, url: impl Into<String>) -> Self {
        Self {
            index,
            url: url.into(),
            local_path: None,
            duration: None,
            metadata: Map::new(),
            error: None,
        }
    }

    pub fn with_duration(mut self, duration: Option<f64>) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.local_path.is_some() && self.error.is_none()
    }
}

/// Canonical success payload stored on a completed job.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobResult {
    pub videos: Vec<MediaItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl JobResult {
    pub fn new(videos: Vec<MediaItem>) -> Self {
        Self {
            videos,
            usage: None,
            metadata: Map::new(),
        }
    }

    pub fn persisted_count(&self) -> usize {
        self.videos.iter().filter(|v| v.is_persisted()).count()
    }
}
