use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::application::ports::{JobRepository, ProviderAdapter};
use crate::domain::{Job, JobError, JobId, JobStatus, JobUpdate, ProviderPhase};

use super::{Backoff, JobTransitions, ProviderRegistry, ResultPersister, TransitionOutcome};

/// Attempts at a terminal write before its downloaded media is discarded.
const TERMINAL_COMMIT_ATTEMPTS: u32 = 3;
const TERMINAL_COMMIT_PAUSE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct PollingPolicy {
    pub interval: Backoff,
    /// Total budget measured from job creation.
    pub max_duration: Duration,
    /// Consecutive status-fetch transport failures tolerated per job.
    pub max_transport_retries: u32,
    pub workers: usize,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTicket {
    pub job_id: JobId,
    pub transport_failures: u32,
}

impl PollTicket {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            transport_failures: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Another worker holds the job.
    Skipped,
    Rescheduled { ticket: PollTicket, delay: Duration },
    Finished(JobStatus),
    /// The record no longer exists.
    Dropped,
}

/// Sending half of the bounded poll channel.
#[derive(Clone)]
pub struct PollQueue {
    sender: mpsc::Sender<PollTicket>,
}

impl PollQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<PollTicket>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    pub async fn enqueue(&self, job_id: JobId) {
        self.send(PollTicket::new(job_id)).await;
    }

    pub async fn send(&self, ticket: PollTicket) {
        if self.sender.send(ticket).await.is_err() {
            tracing::warn!(job_id = %ticket.job_id, "Poll queue closed; ticket dropped");
        }
    }

    pub fn send_after(&self, ticket: PollTicket, delay: Duration) {
        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.send(ticket).await;
        });
    }
}

#[derive(Default)]
struct InFlightJobs {
    jobs: Mutex<HashSet<JobId>>,
}

impl InFlightJobs {
    fn try_claim(&self, job_id: JobId) -> Option<InFlightClaim<'_>> {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        if jobs.insert(job_id) {
            Some(InFlightClaim { owner: self, job_id })
        } else {
            None
        }
    }
}

struct InFlightClaim<'a> {
    owner: &'a InFlightJobs,
    job_id: JobId,
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        let mut jobs = self.owner.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.remove(&self.job_id);
    }
}

/// Drives processing jobs to a terminal status, one poll per ticket.
pub struct PollScheduler {
    registry: Arc<ProviderRegistry>,
    repository: Arc<dyn JobRepository>,
    transitions: Arc<JobTransitions>,
    persister: Arc<ResultPersister>,
    queue: PollQueue,
    policy: PollingPolicy,
    in_flight: InFlightJobs,
}

impl PollScheduler {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        repository: Arc<dyn JobRepository>,
        transitions: Arc<JobTransitions>,
        persister: Arc<ResultPersister>,
        queue: PollQueue,
        policy: PollingPolicy,
    ) -> Self {
        Self {
            registry,
            repository,
            transitions,
            persister,
            queue,
            policy,
            in_flight: InFlightJobs::default(),
        }
    }

    /// Starts `policy.workers` workers sharing one receiver.
    pub fn spawn_workers(
        self: &Arc<Self>,
        receiver: mpsc::Receiver<PollTicket>,
    ) -> Vec<JoinHandle<()>> {
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        (0..self.policy.workers.max(1))
            .map(|worker| {
                let scheduler = Arc::clone(self);
                let receiver = Arc::clone(&receiver);
                tokio::spawn(async move { scheduler.run(worker, receiver).await })
            })
            .collect()
    }

    async fn run(
        &self,
        worker: usize,
        receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<PollTicket>>>,
    ) {
        tracing::info!(worker, "Poll worker started");
        loop {
            let ticket = receiver.lock().await.recv().await;
            let Some(ticket) = ticket else { break };

            let span = tracing::info_span!(
                "poll_job",
                worker,
                job_id = %ticket.job_id,
                transport_failures = ticket.transport_failures,
            );
            match self.poll_once(ticket).instrument(span).await {
                PollOutcome::Rescheduled { ticket, delay } => self.queue.send_after(ticket, delay),
                PollOutcome::Finished(status) => {
                    tracing::debug!(job_id = %ticket.job_id, status = %status, "Polling finished");
                }
                PollOutcome::Skipped | PollOutcome::Dropped => {}
            }
        }
        tracing::info!(worker, "Poll worker stopped: channel closed");
    }

    /// Performs one step of the state machine for the ticket's job.
    pub async fn poll_once(&self, ticket: PollTicket) -> PollOutcome {
        let Some(_claim) = self.in_flight.try_claim(ticket.job_id) else {
            tracing::debug!(job_id = %ticket.job_id, "Job already being polled; dropping ticket");
            return PollOutcome::Skipped;
        };

        let job = match self.repository.get_by_id(ticket.job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::warn!(job_id = %ticket.job_id, "Polled job no longer exists");
                return PollOutcome::Dropped;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load job for polling");
                return self.reschedule(ticket, self.policy.interval.initial);
            }
        };

        if job.status.is_terminal() {
            return PollOutcome::Finished(job.status);
        }

        if self.budget_exhausted(&job) {
            let message = format!(
                "no terminal result within {}s",
                self.policy.max_duration.as_secs()
            );
            return self.fail(&job, JobError::timeout(message)).await;
        }

        let Some(external_job_id) = job.external_job_id.clone() else {
            // Submission still in flight.
            return self.reschedule(ticket, self.policy.interval.delay(job.attempt_count));
        };

        let adapter = match self.registry.resolve(Some(&job.provider), &job.model) {
            Ok(adapter) => adapter,
            Err(e) => return self.fail(&job, JobError::provider_failure(e.to_string())).await,
        };

        let status = match adapter.fetch_status(&external_job_id).await {
            Ok(status) => status,
            Err(e) => {
                let failures = ticket.transport_failures + 1;
                if failures > self.policy.max_transport_retries {
                    tracing::warn!(error = %e, failures, "Status polling retries exhausted");
                    let message = format!("status polling failed {failures} times: {e}");
                    return self.fail(&job, JobError::timeout(message)).await;
                }
                tracing::warn!(error = %e, failures, "Status fetch failed; will retry");
                let ticket = PollTicket {
                    transport_failures: failures,
                    ..ticket
                };
                return self.reschedule(ticket, self.policy.interval.delay(job.attempt_count));
            }
        };

        tracing::debug!(phase = %status.phase, attempt = job.attempt_count, "Provider status fetched");
        match status.phase {
            ProviderPhase::Queued | ProviderPhase::Running => self.record_attempt(&job).await,
            ProviderPhase::Failed => {
                let detail = status
                    .detail
                    .unwrap_or_else(|| "provider reported failure".to_string());
                self.fail(&job, JobError::provider_failure(detail)).await
            }
            ProviderPhase::Succeeded => self.finalize(&job, adapter, &status.raw_payload).await,
        }
    }

    fn budget_exhausted(&self, job: &Job) -> bool {
        let elapsed = (chrono::Utc::now() - job.created_at)
            .to_std()
            .unwrap_or_default();
        elapsed >= self.policy.max_duration
    }

    fn reschedule(&self, ticket: PollTicket, delay: Duration) -> PollOutcome {
        PollOutcome::Rescheduled { ticket, delay }
    }

    async fn record_attempt(&self, job: &Job) -> PollOutcome {
        let attempts = job.attempt_count + 1;
        match self
            .transitions
            .apply(job.id, Some(job), JobUpdate::attempts(attempts))
            .await
        {
            Ok(TransitionOutcome::Committed(updated)) => self.reschedule(
                PollTicket::new(job.id),
                self.policy.interval.delay(updated.attempt_count),
            ),
            Ok(TransitionOutcome::Rejected(current)) => PollOutcome::Finished(current.status),
            Ok(TransitionOutcome::Missing) => PollOutcome::Dropped,
            Ok(TransitionOutcome::Conflicted) => {
                self.reschedule(PollTicket::new(job.id), self.policy.interval.delay(attempts))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to record poll attempt");
                self.reschedule(PollTicket::new(job.id), self.policy.interval.delay(attempts))
            }
        }
    }

    async fn finalize(
        &self,
        job: &Job,
        adapter: Arc<dyn ProviderAdapter>,
        raw_payload: &Value,
    ) -> PollOutcome {
        let mut result = match adapter.normalize_result(raw_payload) {
            Ok(result) => result,
            Err(e) => {
                let message = format!("unusable success payload: {e}");
                return self.fail(job, JobError::provider_failure(message)).await;
            }
        };
        if result.videos.is_empty() {
            return self
                .fail(
                    job,
                    JobError::provider_failure("provider reported success without media"),
                )
                .await;
        }

        let requested_duration = job.parameters.get("duration").and_then(Value::as_f64);
        for item in result.videos.iter_mut().filter(|item| item.duration.is_none()) {
            item.duration = requested_duration;
        }

        let result = self.persister.persist(&job.provider, result).await;
        let update = if result.persisted_count() == 0 {
            let reasons: Vec<String> = result
                .videos
                .iter()
                .filter_map(|item| {
                    item.error
                        .as_ref()
                        .map(|e| format!("#{}: {}", item.index, e.message))
                })
                .collect();
            JobUpdate::failed(JobError::download(
                format!("all media downloads failed ({})", reasons.join("; ")),
                false,
            ))
        } else {
            tracing::info!(
                persisted = result.persisted_count(),
                total = result.videos.len(),
                "Job media persisted"
            );
            JobUpdate::completed(result)
        };

        self.commit_terminal(job, update).await
    }

    async fn fail(&self, job: &Job, error: JobError) -> PollOutcome {
        tracing::warn!(kind = %error.kind, message = %error.message, "Job failed");
        self.commit_terminal(job, JobUpdate::failed(error)).await
    }

    /// Writes a terminal update, retrying the same update on conflicts and
    /// store errors so a persisted result is never downloaded twice. Media
    /// that ends up attached to no record is removed from the store.
    async fn commit_terminal(&self, job: &Job, update: JobUpdate) -> PollOutcome {
        let mut observed = Some(job);
        for attempt in 1..=TERMINAL_COMMIT_ATTEMPTS {
            match self.transitions.apply(job.id, observed, update.clone()).await {
                Ok(TransitionOutcome::Committed(updated)) => {
                    return PollOutcome::Finished(updated.status);
                }
                Ok(TransitionOutcome::Rejected(current)) => {
                    tracing::info!(
                        status = %current.status,
                        "Job reached a terminal status concurrently; discarding poll result"
                    );
                    self.discard_media(&update).await;
                    return PollOutcome::Finished(current.status);
                }
                Ok(TransitionOutcome::Missing) => {
                    self.discard_media(&update).await;
                    return PollOutcome::Dropped;
                }
                Ok(TransitionOutcome::Conflicted) => {
                    tracing::warn!(attempt, "Terminal write kept conflicting");
                }
                Err(e) => {
                    tracing::error!(error = %e, attempt, "Failed to commit terminal status");
                }
            }
            observed = None;
            if attempt < TERMINAL_COMMIT_ATTEMPTS {
                tokio::time::sleep(TERMINAL_COMMIT_PAUSE * attempt).await;
            }
        }

        tracing::error!("Giving up on terminal write; job will be polled again");
        self.discard_media(&update).await;
        self.reschedule(PollTicket::new(job.id), self.policy.interval.initial)
    }

    async fn discard_media(&self, update: &JobUpdate) {
        if let Some(result) = &update.result {
            self.persister.discard(result).await;
        }
    }
}
