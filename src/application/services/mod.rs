mod backoff;
mod job_events;
mod job_transitions;
mod poll_scheduler;
mod provider_registry;
mod result_persister;
mod task_dispatcher;
mod task_error;
mod task_orchestrator;

pub use backoff::Backoff;
pub use job_events::{JobEvent, JobEvents, JobSubscription};
pub use job_transitions::{JobTransitions, TransitionOutcome};
pub use poll_scheduler::{PollOutcome, PollQueue, PollScheduler, PollTicket, PollingPolicy};
pub use provider_registry::{ProviderRegistry, RegistryError};
pub use result_persister::{DownloadPolicy, ResultPersister};
pub use task_dispatcher::{DispatchPolicy, TaskDispatcher};
pub use task_error::TaskError;
pub use task_orchestrator::{
    CancelOutcome, DEFAULT_PAGE_SIZE, JobPage, JobQuery, MAX_PAGE_SIZE, OrchestratorConfig,
    ResumeReport, TaskOrchestrator, TaskResultView,
};
