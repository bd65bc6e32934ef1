use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::application::ports::{
    JobFilter, JobOrdering, JobRepository, JobSortField, RepositoryError,
};
use crate::domain::{Job, JobId, JobStatus, JobUpdate};

/// Process-local job store. Used when no database is configured and in tests.
#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

fn compare(a: &Job, b: &Job, ordering: JobOrdering) -> Ordering {
    let primary = match ordering.field {
        JobSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        JobSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        JobSortField::Status => a.status.as_str().cmp(b.status.as_str()),
        JobSortField::Model => a.model.cmp(&b.model),
    };
    let primary = if ordering.descending {
        primary.reverse()
    } else {
        primary
    };
    primary.then_with(|| b.created_at.cmp(&a.created_at))
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create(&self, job: &Job) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "job {} already exists",
                job.id
            )));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn compare_and_set(
        &self,
        id: JobId,
        expected_version: u64,
        update: &JobUpdate,
    ) -> Result<bool, RepositoryError> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&id) {
            Some(job) if job.version == expected_version => {
                job.apply(update);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(
        &self,
        filter: &JobFilter,
        ordering: JobOrdering,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Job>, u64), RepositoryError> {
        let jobs = self.jobs.read().await;
        let mut matching: Vec<&Job> = jobs.values().filter(|job| filter.matches(job)).collect();
        matching.sort_by(|a, b| compare(a, b, ordering));

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, RepositoryError> {
        let filter = JobFilter {
            status: Some(status),
            ..JobFilter::default()
        };
        Ok(self
            .list(&filter, JobOrdering::default(), 0, u64::MAX)
            .await?
            .0)
    }
}
