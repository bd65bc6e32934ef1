use chrono::{DateTime, Utc};

use super::{JobError, JobId, JobResult, JobStatus, JobUpdate, Parameters};

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub model: String,
    pub provider: String,
    pub parameters: Parameters,
    pub status: JobStatus,
    pub external_job_id: Option<String>,
    pub attempt_count: u32,
    pub is_async: bool,
    pub version: u64,
    pub result: Option<JobResult>,
    pub error: Option<JobError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(model: String, provider: String, parameters: Parameters, is_async: bool) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            model,
            provider,
            parameters,
            status: JobStatus::Pending,
            external_job_id: None,
            attempt_count: 0,
            is_async,
            version: 1,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies `update` and bumps the version. Callers are expected to have
    /// checked the version and transition legality first.
    pub fn apply(&mut self, update: &JobUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(external_job_id) = &update.external_job_id {
            self.external_job_id = Some(external_job_id.clone());
        }
        if let Some(attempt_count) = update.attempt_count {
            self.attempt_count = attempt_count;
        }
        if let Some(result) = &update.result {
            self.result = Some(result.clone());
        }
        if let Some(error) = &update.error {
            self.error = Some(error.clone());
        }
        self.version += 1;
        self.updated_at = Utc::now();
    }
}
