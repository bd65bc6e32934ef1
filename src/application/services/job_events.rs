use tokio::sync::broadcast;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{JobId, JobStatus};

const EVENT_BUFFER: usize = 1024;

/// A committed status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    pub version: u64,
}

/// In-process broadcast of committed transitions.
#[derive(Clone)]
pub struct JobEvents {
    sender: broadcast::Sender<JobEvent>,
}

impl JobEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self { sender }
    }

    pub fn publish(&self, event: JobEvent) {
        tracing::debug!(
            job_id = %event.job_id,
            status = %event.status,
            version = event.version,
            "Job status committed"
        );
        // No subscribers is the normal case for async submissions.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> JobSubscription {
        JobSubscription {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for JobEvents {
    fn default() -> Self {
        Self::new()
    }
}

pub struct JobSubscription {
    receiver: broadcast::Receiver<JobEvent>,
}

impl JobSubscription {
    /// Next committed event, or `None` once the bus is gone. Lagged events are
    /// skipped.
    pub async fn next_event(&mut self) -> Option<JobEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Job event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Resolves once `job_id` reaches a terminal status. Falls back to the
    /// store when events were missed.
    pub async fn wait_terminal(
        &mut self,
        job_id: JobId,
        repository: &dyn JobRepository,
    ) -> Result<Option<JobStatus>, RepositoryError> {
        if let Some(status) = stored_terminal_status(job_id, repository).await? {
            return Ok(Some(status));
        }
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.job_id == job_id && event.status.is_terminal() => {
                    return Ok(Some(event.status));
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Job event subscriber lagged; re-reading store");
                    if let Some(status) = stored_terminal_status(job_id, repository).await? {
                        return Ok(Some(status));
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(None),
            }
        }
    }
}

async fn stored_terminal_status(
    job_id: JobId,
    repository: &dyn JobRepository,
) -> Result<Option<JobStatus>, RepositoryError> {
    Ok(repository
        .get_by_id(job_id)
        .await?
        .map(|job| job.status)
        .filter(JobStatus::is_terminal))
}
