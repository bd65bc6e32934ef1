use serde_json::json;
use vidgen::application::ports::{JobFilter, JobOrdering, JobRepository, RepositoryError};
use vidgen::domain::{JobResult, JobStatus, JobUpdate, MediaItem};
use vidgen::infrastructure::persistence::InMemoryJobRepository;

use super::job_aged;

#[tokio::test]
async fn given_new_job_when_created_then_it_can_be_read_back() {
    let repository = InMemoryJobRepository::new();
    let job = job_aged("wanx2.1-t2v-turbo", "aliyun", JobStatus::Pending, 0);

    repository.create(&job).await.unwrap();

    let stored = repository.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.id, job.id);
    assert_eq!(stored.parameters["prompt"], json!("wanx2.1-t2v-turbo clip"));
    assert_eq!(repository.len().await, 1);
}

#[tokio::test]
async fn given_existing_id_when_created_again_then_constraint_violation() {
    let repository = InMemoryJobRepository::new();
    let job = job_aged("m", "p", JobStatus::Pending, 0);
    repository.create(&job).await.unwrap();

    let err = repository.create(&job).await.unwrap_err();

    assert!(matches!(err, RepositoryError::ConstraintViolation(_)));
}

#[tokio::test]
async fn given_current_version_when_compare_and_set_then_update_applied_and_version_bumped() {
    let repository = InMemoryJobRepository::new();
    let job = job_aged("m", "p", JobStatus::Pending, 0);
    repository.create(&job).await.unwrap();

    let applied = repository
        .compare_and_set(job.id, job.version, &JobUpdate::processing("ext-9", 1))
        .await
        .unwrap();

    assert!(applied);
    let stored = repository.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Processing);
    assert_eq!(stored.external_job_id.as_deref(), Some("ext-9"));
    assert_eq!(stored.version, job.version + 1);
}

#[tokio::test]
async fn given_stale_version_when_compare_and_set_then_nothing_changes() {
    let repository = InMemoryJobRepository::new();
    let job = job_aged("m", "p", JobStatus::Pending, 0);
    repository.create(&job).await.unwrap();
    repository
        .compare_and_set(job.id, job.version, &JobUpdate::processing("ext-1", 1))
        .await
        .unwrap();

    let result = JobResult::new(vec![MediaItem::new(0, "https://cdn/a.mp4")]);
    let applied = repository
        .compare_and_set(job.id, job.version, &JobUpdate::completed(result))
        .await
        .unwrap();

    assert!(!applied);
    let stored = repository.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Processing);
    assert!(stored.result.is_none());
}

#[tokio::test]
async fn given_unknown_id_when_compare_and_set_then_false() {
    let repository = InMemoryJobRepository::new();
    let job = job_aged("m", "p", JobStatus::Pending, 0);

    let applied = repository
        .compare_and_set(job.id, 1, &JobUpdate::canceled())
        .await
        .unwrap();

    assert!(!applied);
}

#[tokio::test]
async fn given_mixed_jobs_when_listing_then_filtered_newest_first_with_total() {
    let repository = InMemoryJobRepository::new();
    let oldest = job_aged("cogvideox-2", "zhipuai", JobStatus::Completed, 30);
    let middle = job_aged("cogvideox-2", "zhipuai", JobStatus::Completed, 20);
    let newest = job_aged("cogvideox-2", "zhipuai", JobStatus::Completed, 10);
    let other = job_aged("wanx2.1-t2v-plus", "aliyun", JobStatus::Failed, 5);
    for job in [&oldest, &middle, &newest, &other] {
        repository.create(job).await.unwrap();
    }
    let filter = JobFilter {
        provider: Some("zhipuai".to_string()),
        ..JobFilter::default()
    };

    let (first_page, total) = repository.list(&filter, JobOrdering::default(), 0, 2).await.unwrap();
    let (second_page, _) = repository.list(&filter, JobOrdering::default(), 2, 2).await.unwrap();

    assert_eq!(total, 3);
    let ids: Vec<_> = first_page.iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![newest.id, middle.id]);
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].id, oldest.id);
}

#[tokio::test]
async fn given_offset_beyond_matches_when_listing_then_empty_page_with_total() {
    let repository = InMemoryJobRepository::new();
    repository
        .create(&job_aged("m", "p", JobStatus::Pending, 0))
        .await
        .unwrap();

    let (page, total) = repository
        .list(&JobFilter::default(), JobOrdering::default(), 40, 20)
        .await
        .unwrap();

    assert!(page.is_empty());
    assert_eq!(total, 1);
}

#[tokio::test]
async fn given_jobs_in_several_states_when_listing_by_status_then_only_that_status() {
    let repository = InMemoryJobRepository::new();
    let processing = job_aged("m", "p", JobStatus::Processing, 3);
    for job in [
        &processing,
        &job_aged("m", "p", JobStatus::Pending, 2),
        &job_aged("m", "p", JobStatus::Canceled, 1),
    ] {
        repository.create(job).await.unwrap();
    }

    let found = repository
        .list_by_status(JobStatus::Processing)
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, processing.id);
}

#[tokio::test]
async fn given_explicit_ordering_when_listing_then_jobs_follow_it() {
    let repository = InMemoryJobRepository::new();
    let older = job_aged("wanx2.1-t2v-plus", "aliyun", JobStatus::Processing, 20);
    let newer = job_aged("cogvideox-2", "zhipuai", JobStatus::Completed, 10);
    repository.create(&older).await.unwrap();
    repository.create(&newer).await.unwrap();

    let oldest_first: JobOrdering = "created_at".parse().unwrap();
    let by_model_desc: JobOrdering = "-model".parse().unwrap();
    let (ascending, _) = repository
        .list(&JobFilter::default(), oldest_first, 0, 10)
        .await
        .unwrap();
    let (by_model, _) = repository
        .list(&JobFilter::default(), by_model_desc, 0, 10)
        .await
        .unwrap();

    assert_eq!(ascending[0].id, older.id);
    assert_eq!(by_model[0].model, "wanx2.1-t2v-plus");
}
