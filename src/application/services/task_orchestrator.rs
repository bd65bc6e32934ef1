use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::AbortHandle;

use crate::application::ports::{JobFilter, JobOrdering, JobRepository};
use crate::domain::{Job, JobError, JobId, JobResult, JobStatus, JobUpdate, Parameters};

use super::task_dispatcher::forward_cancel;
use super::{
    DispatchPolicy, JobEvents, JobSubscription, JobTransitions, PollQueue, PollScheduler,
    PollingPolicy, ProviderRegistry, ResultPersister, TaskDispatcher, TaskError,
    TransitionOutcome,
};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    pub dispatch: DispatchPolicy,
    pub polling: PollingPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskResultView {
    pub status: JobStatus,
    pub result: Option<JobResult>,
    pub error: Option<JobError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelOutcome {
    pub status: JobStatus,
    /// False when the job was already terminal.
    pub changed: bool,
}

/// One-based page request.
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    pub filter: JobFilter,
    pub ordering: JobOrdering,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct JobPage {
    pub jobs: Vec<Job>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    /// At least 1, also for an empty listing.
    pub total_pages: u64,
}

impl JobPage {
    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResumeReport {
    pub requeued: usize,
    pub abandoned: usize,
}

/// Entry point for the API layer. Owns the poll worker pool.
pub struct TaskOrchestrator {
    registry: Arc<ProviderRegistry>,
    repository: Arc<dyn JobRepository>,
    transitions: Arc<JobTransitions>,
    dispatcher: TaskDispatcher,
    poll_queue: PollQueue,
    workers: Vec<AbortHandle>,
}

impl TaskOrchestrator {
    /// Wires the components and spawns the poll workers. Must be called
    /// inside a tokio runtime.
    pub fn start(
        registry: Arc<ProviderRegistry>,
        repository: Arc<dyn JobRepository>,
        persister: Arc<ResultPersister>,
        config: OrchestratorConfig,
    ) -> Self {
        let transitions = Arc::new(JobTransitions::new(
            Arc::clone(&repository),
            JobEvents::new(),
        ));
        let (poll_queue, receiver) = PollQueue::channel(config.polling.queue_capacity);

        let scheduler = Arc::new(PollScheduler::new(
            Arc::clone(&registry),
            Arc::clone(&repository),
            Arc::clone(&transitions),
            persister,
            poll_queue.clone(),
            config.polling,
        ));
        let workers = scheduler
            .spawn_workers(receiver)
            .iter()
            .map(|handle| handle.abort_handle())
            .collect();

        let dispatcher = TaskDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&repository),
            Arc::clone(&transitions),
            poll_queue.clone(),
            config.dispatch,
        );

        tracing::info!(
            workers = config.polling.workers,
            providers = ?registry.provider_names(),
            "Task orchestrator started"
        );

        Self {
            registry,
            repository,
            transitions,
            dispatcher,
            poll_queue,
            workers,
        }
    }

    pub async fn submit(
        &self,
        model: &str,
        provider: Option<&str>,
        parameters: Parameters,
        is_async: bool,
    ) -> Result<JobId, TaskError> {
        self.dispatcher
            .submit(model, provider, parameters, is_async)
            .await
    }

    pub async fn get_job(&self, id: JobId) -> Result<Job, TaskError> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(TaskError::TaskNotFound(id))
    }

    pub async fn get_status(&self, id: JobId) -> Result<JobStatus, TaskError> {
        Ok(self.get_job(id).await?.status)
    }

    pub async fn get_result(&self, id: JobId) -> Result<TaskResultView, TaskError> {
        let job = self.get_job(id).await?;
        Ok(TaskResultView {
            status: job.status,
            result: job.result,
            error: job.error,
        })
    }

    /// Cancels a pending or processing job. Terminal jobs are reported as-is.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, id: JobId) -> Result<CancelOutcome, TaskError> {
        let job = self.get_job(id).await?;
        if job.status.is_terminal() {
            return Ok(CancelOutcome {
                status: job.status,
                changed: false,
            });
        }

        match self
            .transitions
            .apply(id, Some(&job), JobUpdate::canceled())
            .await?
        {
            TransitionOutcome::Committed(canceled) => {
                tracing::info!(job_id = %id, "Job canceled");
                if let Some(external_job_id) = &canceled.external_job_id {
                    match self
                        .registry
                        .resolve(Some(&canceled.provider), &canceled.model)
                    {
                        Ok(adapter) => forward_cancel(adapter.as_ref(), external_job_id).await,
                        Err(e) => tracing::warn!(error = %e, "No adapter to forward cancellation to"),
                    }
                }
                Ok(CancelOutcome {
                    status: canceled.status,
                    changed: true,
                })
            }
            TransitionOutcome::Rejected(current) => Ok(CancelOutcome {
                status: current.status,
                changed: false,
            }),
            TransitionOutcome::Missing => Err(TaskError::TaskNotFound(id)),
            TransitionOutcome::Conflicted => Err(TaskError::Conflict(id)),
        }
    }

    pub async fn list_jobs(&self, query: JobQuery) -> Result<JobPage, TaskError> {
        let page = query.page.unwrap_or(1).max(1);
        let page_size = query
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = u64::from(page - 1) * u64::from(page_size);

        let (jobs, total) = self
            .repository
            .list(&query.filter, query.ordering, offset, u64::from(page_size))
            .await?;
        Ok(JobPage {
            jobs,
            total,
            page,
            page_size,
            total_pages: total.div_ceil(u64::from(page_size)).max(1),
        })
    }

    pub fn catalog(&self) -> BTreeMap<String, Vec<String>> {
        self.registry.catalog()
    }

    pub fn subscribe(&self) -> JobSubscription {
        self.transitions.events().subscribe()
    }

    /// Restart recovery: re-enqueues processing jobs and fails pending jobs
    /// whose submission outcome was lost with the previous process.
    pub async fn resume_in_flight(&self) -> Result<ResumeReport, TaskError> {
        let mut report = ResumeReport::default();

        for job in self.repository.list_by_status(JobStatus::Processing).await? {
            self.poll_queue.enqueue(job.id).await;
            report.requeued += 1;
        }

        let pending = self.repository.list_by_status(JobStatus::Pending).await?;
        for job in pending.iter().filter(|job| job.external_job_id.is_none()) {
            let error = JobError::submission(
                "submission interrupted by a restart; remote outcome unknown",
                false,
            );
            if let TransitionOutcome::Committed(_) = self
                .transitions
                .apply(job.id, Some(job), JobUpdate::failed(error))
                .await?
            {
                report.abandoned += 1;
            }
        }

        tracing::info!(
            requeued = report.requeued,
            abandoned = report.abandoned,
            "Resumed in-flight jobs"
        );
        Ok(report)
    }

    /// Stops the poll workers. Jobs stay in the store and resume on restart.
    pub fn shutdown(&self) {
        for worker in &self.workers {
            worker.abort();
        }
        tracing::info!("Poll workers stopped");
    }
}
