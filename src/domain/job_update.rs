use super::{JobError, JobResult, JobStatus};

/// The set of fields a single compare-and-set write changes. Fields left as
/// `None` keep their stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub external_job_id: Option<String>,
    pub attempt_count: Option<u32>,
    pub result: Option<JobResult>,
    pub error: Option<JobError>,
}

impl JobUpdate {
    pub fn processing(external_job_id: impl Into<String>, attempt_count: u32) -> Self {
        Self {
            status: Some(JobStatus::Processing),
            external_job_id: Some(external_job_id.into()),
            attempt_count: Some(attempt_count),
            ..Self::default()
        }
    }

    pub fn completed(result: JobResult) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            result: Some(result),
            ..Self::default()
        }
    }

    pub fn failed(error: JobError) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn canceled() -> Self {
        Self {
            status: Some(JobStatus::Canceled),
            ..Self::default()
        }
    }

    pub fn attempts(attempt_count: u32) -> Self {
        Self {
            attempt_count: Some(attempt_count),
            ..Self::default()
        }
    }

    /// Status the record will have after this update, given its current one.
    pub fn target_status(&self, current: JobStatus) -> JobStatus {
        self.status.unwrap_or(current)
    }
}
