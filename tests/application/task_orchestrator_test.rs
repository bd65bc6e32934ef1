use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use vidgen::application::ports::{JobFilter, JobRepository, MediaStore, ProviderAdapter};
use vidgen::application::services::{
    JobQuery, OrchestratorConfig, PollingPolicy, ProviderRegistry, ResultPersister, TaskError,
    TaskOrchestrator,
};
use vidgen::domain::{Job, JobErrorKind, JobId, JobStatus};
use vidgen::infrastructure::download::HttpMediaDownloader;
use vidgen::infrastructure::persistence::InMemoryJobRepository;
use vidgen::infrastructure::providers::{ALIYUN_DEFAULT_MODELS, AliyunAdapter};
use vidgen::infrastructure::storage::LocalMediaStore;

use crate::helpers::{
    FlakyDownloader, Harness, ScriptedProvider, fast_dispatch, fast_download, fast_polling,
    params, processing_job, spawn_mock_server, succeeded_status, wait_for_status,
};

fn provider() -> ScriptedProvider {
    ScriptedProvider::new("mock", &["mock-video", "mock-video-hd"])
}

async fn submit(harness: &Harness, model: &str) -> JobId {
    harness
        .orchestrator
        .submit(model, None, params(json!({ "prompt": "a cat on grass" })), true)
        .await
        .unwrap()
}

/// DashScope stand-in: one task that runs once, then succeeds with a video
/// served by the same server.
fn dashscope_router(status_polls: Arc<AtomicU32>) -> Router {
    async fn create_task(Json(body): Json<Value>) -> Json<Value> {
        assert_eq!(body["model"], "wanx2.1-t2v-turbo");
        assert_eq!(body["input"]["prompt"], "a cat on grass");
        Json(json!({
            "request_id": "req-1",
            "output": { "task_id": "task-1", "task_status": "PENDING" }
        }))
    }

    async fn task_status(
        State(polls): State<Arc<AtomicU32>>,
        headers: HeaderMap,
    ) -> Json<Value> {
        if polls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Json(json!({ "output": { "task_id": "task-1", "task_status": "RUNNING" } }));
        }
        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();
        Json(json!({
            "request_id": "req-2",
            "output": {
                "task_id": "task-1",
                "task_status": "SUCCEEDED",
                "video_url": format!("http://{host}/files/cat.mp4?Expires=1"),
                "orig_prompt": "a cat on grass"
            },
            "usage": { "video_duration": 5, "video_count": 1 }
        }))
    }

    Router::new()
        .route(
            "/api/v1/services/aigc/video-generation/video-synthesis",
            post(create_task),
        )
        .route("/api/v1/tasks/task-1", get(task_status))
        .route("/files/cat.mp4", get(|| async { "fake mp4 bytes" }))
        .with_state(status_polls)
}

#[tokio::test]
async fn given_aliyun_text_to_video_when_provider_succeeds_then_video_is_stored_locally() {
    let status_polls = Arc::new(AtomicU32::new(0));
    let base_url = spawn_mock_server(dashscope_router(status_polls.clone())).await;
    let media_dir = tempfile::tempdir().unwrap();

    let adapter: Arc<dyn ProviderAdapter> = Arc::new(AliyunAdapter::new(
        reqwest::Client::new(),
        &base_url,
        "sk-test",
        ALIYUN_DEFAULT_MODELS,
    ));
    let store: Arc<dyn MediaStore> =
        Arc::new(LocalMediaStore::new(media_dir.path().to_path_buf()).unwrap());
    let persister = Arc::new(ResultPersister::new(
        Arc::new(HttpMediaDownloader::new(Duration::from_secs(5)).unwrap()),
        store,
        fast_download(1),
    ));
    let repository: Arc<dyn JobRepository> = Arc::new(InMemoryJobRepository::new());
    let orchestrator = TaskOrchestrator::start(
        Arc::new(ProviderRegistry::new(vec![adapter])),
        repository,
        persister,
        OrchestratorConfig {
            dispatch: fast_dispatch(),
            polling: fast_polling(),
        },
    );

    let id = orchestrator
        .submit(
            "wanx2.1-t2v-turbo",
            Some("aliyun"),
            params(json!({ "prompt": "a cat on grass" })),
            true,
        )
        .await
        .unwrap();

    let early = orchestrator.get_status(id).await.unwrap();
    assert!(matches!(early, JobStatus::Pending | JobStatus::Processing));

    wait_for_status(&orchestrator, id, JobStatus::Completed).await;
    let view = orchestrator.get_result(id).await.unwrap();
    assert!(view.error.is_none());
    let result = view.result.unwrap();
    let video = &result.videos[0];
    assert!(video.url.starts_with("http://127.0.0.1:"));
    assert!(video.url.ends_with("/files/cat.mp4?Expires=1"));
    assert_eq!(video.duration, Some(5.0));
    let local_path = video.local_path.as_deref().unwrap();
    assert!(!local_path.is_empty());
    assert_eq!(std::fs::read(local_path).unwrap(), b"fake mp4 bytes");
    assert_eq!(result.metadata["request_id"], "req-2");
    assert!(status_polls.load(Ordering::SeqCst) >= 2);

    orchestrator.shutdown();
}

#[tokio::test]
async fn given_polling_past_budget_when_provider_never_finishes_then_job_times_out() {
    let harness = Harness::start_with(
        provider(),
        FlakyDownloader::reliable(),
        PollingPolicy {
            max_duration: Duration::from_millis(50),
            ..fast_polling()
        },
        fast_dispatch(),
    );

    let id = submit(&harness, "mock-video").await;

    let job = wait_for_status(&harness.orchestrator, id, JobStatus::Failed).await;
    assert_eq!(job.error.unwrap().kind, JobErrorKind::ProviderTimeout);
    assert!(job.result.is_none());
}

#[tokio::test]
async fn given_processing_job_when_canceled_then_canceled_and_forwarded_to_provider() {
    let harness = Harness::start(provider(), FlakyDownloader::reliable());
    let id = submit(&harness, "mock-video").await;

    let outcome = harness.orchestrator.cancel(id).await.unwrap();

    assert!(outcome.changed);
    assert_eq!(outcome.status, JobStatus::Canceled);
    assert_eq!(harness.provider.cancels(), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let view = harness.orchestrator.get_result(id).await.unwrap();
    assert_eq!(view.status, JobStatus::Canceled);
    assert!(view.result.is_none());
}

#[tokio::test]
async fn given_completed_job_when_canceled_then_status_reported_unchanged() {
    let harness = Harness::start(
        provider().then_always(succeeded_status(&["https://cdn/v.mp4"])),
        FlakyDownloader::reliable(),
    );
    let id = submit(&harness, "mock-video").await;
    wait_for_status(&harness.orchestrator, id, JobStatus::Completed).await;

    let outcome = harness.orchestrator.cancel(id).await.unwrap();

    assert!(!outcome.changed);
    assert_eq!(outcome.status, JobStatus::Completed);
    assert_eq!(harness.provider.cancels(), 0);
}

#[tokio::test]
async fn given_unknown_id_when_querying_then_task_not_found() {
    let harness = Harness::start(provider(), FlakyDownloader::reliable());
    let id = JobId::new();

    assert!(matches!(
        harness.orchestrator.get_status(id).await,
        Err(TaskError::TaskNotFound(missing)) if missing == id
    ));
    assert!(matches!(
        harness.orchestrator.get_result(id).await,
        Err(TaskError::TaskNotFound(_))
    ));
    assert!(matches!(
        harness.orchestrator.cancel(id).await,
        Err(TaskError::TaskNotFound(_))
    ));
}

#[tokio::test]
async fn given_completed_job_when_reading_result_then_result_without_error() {
    let harness = Harness::start(
        provider().then_always(succeeded_status(&["https://cdn/a.mp4", "https://cdn/b.mp4"])),
        FlakyDownloader::reliable(),
    );
    let id = submit(&harness, "mock-video").await;
    wait_for_status(&harness.orchestrator, id, JobStatus::Completed).await;

    let view = harness.orchestrator.get_result(id).await.unwrap();

    assert!(view.error.is_none());
    let videos = view.result.unwrap().videos;
    assert_eq!(videos.len(), 2);
    assert_ne!(videos[0].local_path, videos[1].local_path);
    assert_eq!(harness.store.file_names().len(), 2);
}

#[tokio::test]
async fn given_several_jobs_when_listing_then_filtered_and_paged_newest_first() {
    let harness = Harness::start(provider(), FlakyDownloader::reliable());
    let first = submit(&harness, "mock-video").await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = submit(&harness, "mock-video").await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    submit(&harness, "mock-video-hd").await;

    let page = harness
        .orchestrator
        .list_jobs(JobQuery {
            filter: JobFilter {
                model: Some("mock-video".to_string()),
                ..JobFilter::default()
            },
            page: Some(1),
            page_size: Some(1),
            ..JobQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.page_size, 1);
    assert_eq!(page.total_pages, 2);
    assert!(page.has_next());
    assert!(!page.has_previous());
    assert_eq!(page.jobs[0].id, second);

    let page = harness
        .orchestrator
        .list_jobs(JobQuery {
            filter: JobFilter {
                model: Some("mock-video".to_string()),
                ..JobFilter::default()
            },
            page: Some(2),
            page_size: Some(1),
            ..JobQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(page.jobs[0].id, first);
    assert!(!page.has_next());
    assert!(page.has_previous());

    let everything = harness
        .orchestrator
        .list_jobs(JobQuery::default())
        .await
        .unwrap();
    assert_eq!(everything.total, 3);
    assert_eq!(everything.page, 1);
    assert_eq!(everything.page_size, 20);

    let oldest_first = harness
        .orchestrator
        .list_jobs(JobQuery {
            ordering: "created_at".parse().unwrap(),
            ..JobQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(oldest_first.jobs[0].id, first);
}

#[tokio::test]
async fn given_oversized_page_request_when_listing_then_page_size_is_clamped() {
    let harness = Harness::start(provider(), FlakyDownloader::reliable());

    let page = harness
        .orchestrator
        .list_jobs(JobQuery {
            page: Some(0),
            page_size: Some(10_000),
            ..JobQuery::default()
        })
        .await
        .unwrap();

    assert_eq!(page.page, 1);
    assert_eq!(page.page_size, 100);
    assert_eq!(page.total_pages, 1);
    assert!(page.jobs.is_empty());
}

#[tokio::test]
async fn given_jobs_left_by_previous_process_when_resuming_then_processing_requeued_and_pending_abandoned()
 {
    let harness = Harness::start(
        provider().then_always(succeeded_status(&["https://cdn/v.mp4"])),
        FlakyDownloader::reliable(),
    );
    let processing = processing_job("mock", "mock-video");
    let pending = Job::new(
        "mock-video".to_string(),
        "mock".to_string(),
        params(json!({ "prompt": "x" })),
        true,
    );
    harness.repository.create(&processing).await.unwrap();
    harness.repository.create(&pending).await.unwrap();

    let report = harness.orchestrator.resume_in_flight().await.unwrap();

    assert_eq!(report.requeued, 1);
    assert_eq!(report.abandoned, 1);
    wait_for_status(&harness.orchestrator, processing.id, JobStatus::Completed).await;
    let abandoned = harness.orchestrator.get_job(pending.id).await.unwrap();
    assert_eq!(abandoned.status, JobStatus::Failed);
    assert_eq!(
        abandoned.error.unwrap().kind,
        JobErrorKind::ProviderSubmission
    );
}

#[tokio::test]
async fn given_orchestrator_when_listing_catalog_then_registered_models_are_grouped() {
    let harness = Harness::start(provider(), FlakyDownloader::reliable());

    let catalog = harness.orchestrator.catalog();

    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog["mock"], vec!["mock-video", "mock-video-hd"]);
}
