use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::domain::{Job, JobId, JobStatus, JobUpdate};

use super::RepositoryError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub model: Option<String>,
    pub provider: Option<String>,
}

impl JobFilter {
    pub fn matches(&self, job: &Job) -> bool {
        self.status.is_none_or(|s| job.status == s)
            && self.model.as_deref().is_none_or(|m| job.model == m)
            && self.provider.as_deref().is_none_or(|p| job.provider == p)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSortField {
    CreatedAt,
    UpdatedAt,
    Status,
    Model,
}

impl JobSortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobSortField::CreatedAt => "created_at",
            JobSortField::UpdatedAt => "updated_at",
            JobSortField::Status => "status",
            JobSortField::Model => "model",
        }
    }
}

/// Listing order written as `field` or `-field` (descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOrdering {
    pub field: JobSortField,
    pub descending: bool,
}

impl Default for JobOrdering {
    fn default() -> Self {
        Self {
            field: JobSortField::CreatedAt,
            descending: true,
        }
    }
}

impl FromStr for JobOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (descending, name) = match s.strip_prefix('-') {
            Some(name) => (true, name),
            None => (false, s),
        };
        let field = match name {
            "created_at" => JobSortField::CreatedAt,
            "updated_at" => JobSortField::UpdatedAt,
            "status" => JobSortField::Status,
            "model" => JobSortField::Model,
            other => {
                return Err(format!(
                    "Invalid ordering field: {other}. Expected one of: created_at, updated_at, status, model"
                ));
            }
        };
        Ok(Self { field, descending })
    }
}

impl fmt::Display for JobOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            f.write_str("-")?;
        }
        f.write_str(self.field.as_str())
    }
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &Job) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError>;

    /// Applies `update` only if the stored record is still at
    /// `expected_version`. Returns `false` when another writer got there first
    /// or the record does not exist.
    async fn compare_and_set(
        &self,
        id: JobId,
        expected_version: u64,
        update: &JobUpdate,
    ) -> Result<bool, RepositoryError>;

    /// Returns the page in `ordering` and the total number of matches.
    async fn list(
        &self,
        filter: &JobFilter,
        ordering: JobOrdering,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Job>, u64), RepositoryError>;

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, RepositoryError>;
}
