use std::sync::Arc;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{Job, JobId, JobUpdate};

use super::{JobEvent, JobEvents};

const MAX_CONFLICT_RETRIES: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The write landed; holds the record as stored after it.
    Committed(Job),
    /// The record's current status does not allow this update.
    Rejected(Job),
    Missing,
    /// Other writers kept winning the compare-and-set.
    Conflicted,
}

/// Single entry point for every job write: checks transition legality against
/// the observed record, writes with compare-and-set on its version, and on a
/// lost race re-reads and re-checks before trying again.
pub struct JobTransitions {
    repository: Arc<dyn JobRepository>,
    events: JobEvents,
}

impl JobTransitions {
    pub fn new(repository: Arc<dyn JobRepository>, events: JobEvents) -> Self {
        Self { repository, events }
    }

    pub fn events(&self) -> &JobEvents {
        &self.events
    }

    /// `observed` skips the first read when the caller already holds the
    /// record it based the update on.
    pub async fn apply(
        &self,
        id: JobId,
        observed: Option<&Job>,
        update: JobUpdate,
    ) -> Result<TransitionOutcome, RepositoryError> {
        let mut current = match observed {
            Some(job) => job.clone(),
            None => match self.repository.get_by_id(id).await? {
                Some(job) => job,
                None => return Ok(TransitionOutcome::Missing),
            },
        };

        for attempt in 0..=MAX_CONFLICT_RETRIES {
            let target = update.target_status(current.status);
            if !current.status.can_transition_to(target) {
                return Ok(TransitionOutcome::Rejected(current));
            }

            if self
                .repository
                .compare_and_set(id, current.version, &update)
                .await?
            {
                let previous = current.status;
                current.apply(&update);
                if current.status != previous {
                    self.events.publish(JobEvent {
                        job_id: id,
                        status: current.status,
                        version: current.version,
                    });
                }
                return Ok(TransitionOutcome::Committed(current));
            }

            tracing::debug!(
                job_id = %id,
                expected_version = current.version,
                attempt,
                "Stale job version; re-reading before retry"
            );
            current = match self.repository.get_by_id(id).await? {
                Some(job) => job,
                None => return Ok(TransitionOutcome::Missing),
            };
        }

        tracing::warn!(job_id = %id, "Job update abandoned after repeated version conflicts");
        Ok(TransitionOutcome::Conflicted)
    }
}
