use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::application::ports::{JobRepository, ProviderAdapter, ProviderError};
use crate::domain::{Job, JobError, JobId, JobStatus, JobUpdate, Parameters};

use super::{
    Backoff, JobSubscription, JobTransitions, PollQueue, ProviderRegistry, TaskError,
    TransitionOutcome,
};

#[derive(Debug, Clone, Copy)]
pub struct DispatchPolicy {
    /// Background resubmissions after a retryable submit failure.
    pub submit_retries: u32,
    pub submit_backoff: Backoff,
    /// Upper bound on how long a synchronous submit blocks.
    pub max_sync_wait: Duration,
}

enum SubmitStep {
    Settled(JobStatus),
    Retry(ProviderError),
}

/// Validates requests, creates job records and hands them to the provider.
#[derive(Clone)]
pub struct TaskDispatcher {
    registry: Arc<ProviderRegistry>,
    repository: Arc<dyn JobRepository>,
    transitions: Arc<JobTransitions>,
    poll_queue: PollQueue,
    policy: DispatchPolicy,
}

impl TaskDispatcher {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        repository: Arc<dyn JobRepository>,
        transitions: Arc<JobTransitions>,
        poll_queue: PollQueue,
        policy: DispatchPolicy,
    ) -> Self {
        Self {
            registry,
            repository,
            transitions,
            poll_queue,
            policy,
        }
    }

    /// Creates and submits a job. Nothing is stored when resolution or
    /// validation fails.
    #[tracing::instrument(skip(self, parameters))]
    pub async fn submit(
        &self,
        model: &str,
        provider: Option<&str>,
        parameters: Parameters,
        is_async: bool,
    ) -> Result<JobId, TaskError> {
        let adapter = self.registry.resolve(provider, model)?;
        let provider_name = adapter.descriptor().provider_name().to_string();
        let parameters = adapter
            .validate_parameters(model, &parameters)
            .map_err(|e| TaskError::from_validation(model, &provider_name, e))?;

        let job = Job::new(model.to_string(), provider_name, parameters, is_async);
        self.repository.create(&job).await?;
        tracing::info!(job_id = %job.id, provider = %job.provider, "Job created");

        let subscription = (!is_async).then(|| self.transitions.events().subscribe());

        let allow_retry = self.policy.submit_retries > 0;
        if let SubmitStep::Retry(e) = self.attempt(&adapter, &job, 1, allow_retry).await? {
            tracing::warn!(
                job_id = %job.id,
                error = %e,
                retries = self.policy.submit_retries,
                "Retryable submission failure; scheduling resubmission"
            );
            let span = tracing::info_span!("resubmit_job", job_id = %job.id);
            let dispatcher = self.clone();
            tokio::spawn(dispatcher.resubmit(adapter, job.clone()).instrument(span));
        }

        if let Some(subscription) = subscription {
            self.wait_for_terminal(subscription, job.id).await;
        }

        Ok(job.id)
    }

    async fn attempt(
        &self,
        adapter: &Arc<dyn ProviderAdapter>,
        job: &Job,
        attempt: u32,
        allow_retry: bool,
    ) -> Result<SubmitStep, TaskError> {
        match adapter.submit(&job.model, &job.parameters).await {
            Ok(external_job_id) => {
                tracing::info!(job_id = %job.id, external_job_id = %external_job_id, attempt, "Provider accepted job");
                let update = JobUpdate::processing(external_job_id.clone(), attempt);
                match self.transitions.apply(job.id, None, update).await? {
                    TransitionOutcome::Committed(_) => {
                        self.poll_queue.enqueue(job.id).await;
                        Ok(SubmitStep::Settled(JobStatus::Processing))
                    }
                    TransitionOutcome::Rejected(current) => {
                        tracing::info!(
                            job_id = %job.id,
                            status = %current.status,
                            "Job settled before the provider accepted it; cancelling remote job"
                        );
                        forward_cancel(adapter.as_ref(), &external_job_id).await;
                        Ok(SubmitStep::Settled(current.status))
                    }
                    TransitionOutcome::Missing => Err(TaskError::TaskNotFound(job.id)),
                    TransitionOutcome::Conflicted => Err(TaskError::Conflict(job.id)),
                }
            }
            Err(e) if e.is_retryable() && allow_retry => {
                match self
                    .transitions
                    .apply(job.id, None, JobUpdate::attempts(attempt))
                    .await?
                {
                    TransitionOutcome::Rejected(current) => {
                        Ok(SubmitStep::Settled(current.status))
                    }
                    _ => Ok(SubmitStep::Retry(e)),
                }
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, attempt, "Submission failed");
                let update = JobUpdate {
                    attempt_count: Some(attempt),
                    ..JobUpdate::failed(JobError::submission(e.to_string(), e.is_retryable()))
                };
                match self.transitions.apply(job.id, None, update).await? {
                    TransitionOutcome::Committed(updated) => Ok(SubmitStep::Settled(updated.status)),
                    TransitionOutcome::Rejected(current) => {
                        Ok(SubmitStep::Settled(current.status))
                    }
                    TransitionOutcome::Missing => Err(TaskError::TaskNotFound(job.id)),
                    TransitionOutcome::Conflicted => Err(TaskError::Conflict(job.id)),
                }
            }
        }
    }

    async fn resubmit(self, adapter: Arc<dyn ProviderAdapter>, job: Job) {
        let last_attempt = self.policy.submit_retries + 1;
        for attempt in 2..=last_attempt {
            tokio::time::sleep(self.policy.submit_backoff.delay(attempt - 2)).await;

            match self.repository.get_by_id(job.id).await {
                Ok(Some(current)) if current.status != JobStatus::Pending => {
                    tracing::info!(status = %current.status, "Job no longer pending; resubmission abandoned");
                    return;
                }
                Ok(None) => return,
                Ok(Some(_)) => {}
                Err(e) => tracing::warn!(error = %e, "Could not re-read job before resubmission"),
            }

            match self
                .attempt(&adapter, &job, attempt, attempt < last_attempt)
                .await
            {
                Ok(SubmitStep::Settled(status)) => {
                    tracing::info!(attempt, status = %status, "Resubmission settled");
                    return;
                }
                Ok(SubmitStep::Retry(e)) => {
                    tracing::warn!(attempt, error = %e, "Resubmission failed; retrying");
                }
                Err(e) => {
                    tracing::error!(attempt, error = %e, "Resubmission aborted");
                    return;
                }
            }
        }
    }

    async fn wait_for_terminal(&self, mut subscription: JobSubscription, job_id: JobId) {
        let wait = subscription.wait_terminal(job_id, self.repository.as_ref());
        match tokio::time::timeout(self.policy.max_sync_wait, wait).await {
            Ok(Ok(Some(status))) => {
                tracing::debug!(job_id = %job_id, status = %status, "Synchronous job finished");
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => tracing::warn!(job_id = %job_id, error = %e, "Synchronous wait failed"),
            Err(_) => tracing::info!(
                job_id = %job_id,
                waited = ?self.policy.max_sync_wait,
                "Synchronous wait elapsed; returning job id"
            ),
        }
    }
}

/// Best-effort remote cancellation. Failures are logged only.
pub(crate) async fn forward_cancel(adapter: &dyn ProviderAdapter, external_job_id: &str) {
    match adapter.cancel(external_job_id).await {
        Ok(true) => tracing::info!(external_job_id, "Provider acknowledged cancellation"),
        Ok(false) => tracing::debug!(external_job_id, "Provider does not support cancellation"),
        Err(e) => tracing::warn!(external_job_id, error = %e, "Provider cancellation failed"),
    }
}
