use serde_json::json;
use vidgen::domain::{
    Job, JobError, JobErrorKind, JobResult, JobStatus, JobUpdate, MediaItem, Parameters,
};

fn new_job() -> Job {
    Job::new(
        "wanx2.1-t2v-turbo".to_string(),
        "aliyun".to_string(),
        Parameters::new(),
        true,
    )
}

#[test]
fn given_new_job_when_created_then_is_pending_at_version_one() {
    let job = new_job();

    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.version, 1);
    assert_eq!(job.attempt_count, 0);
    assert!(job.external_job_id.is_none());
    assert_eq!(job.created_at, job.updated_at);
}

#[test]
fn given_processing_update_when_applied_then_fields_change_and_version_bumps() {
    let mut job = new_job();

    job.apply(&JobUpdate::processing("task-42", 1));

    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(job.external_job_id.as_deref(), Some("task-42"));
    assert_eq!(job.attempt_count, 1);
    assert_eq!(job.version, 2);
}

#[test]
fn given_attempt_update_when_applied_then_status_is_kept() {
    let mut job = new_job();
    job.apply(&JobUpdate::processing("task-42", 1));

    job.apply(&JobUpdate::attempts(7));

    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(job.external_job_id.as_deref(), Some("task-42"));
    assert_eq!(job.attempt_count, 7);
}

#[test]
fn given_failed_update_when_applied_then_error_is_recorded() {
    let mut job = new_job();

    job.apply(&JobUpdate::failed(JobError::timeout("too slow")));

    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.unwrap();
    assert_eq!(error.kind, JobErrorKind::ProviderTimeout);
    assert!(!error.retryable);
}

#[test]
fn given_update_without_status_when_asking_target_then_current_is_returned() {
    let update = JobUpdate::attempts(3);
    assert_eq!(update.target_status(JobStatus::Processing), JobStatus::Processing);
    assert_eq!(
        JobUpdate::canceled().target_status(JobStatus::Processing),
        JobStatus::Canceled
    );
}

#[test]
fn given_job_error_when_serialized_then_kind_uses_error_type_name() {
    let error = JobError::download("404", false);

    let value = serde_json::to_value(&error).unwrap();

    assert_eq!(
        value,
        json!({ "kind": "DownloadError", "message": "404", "retryable": false })
    );
}

#[test]
fn given_result_with_mixed_items_when_counting_then_only_stored_items_count() {
    let mut stored = MediaItem::new(0, "https://cdn/a.mp4");
    stored.local_path = Some("/media/a.mp4".to_string());
    let mut broken = MediaItem::new(1, "https://cdn/b.mp4");
    broken.error = Some(JobError::download("gone", false));
    let pending = MediaItem::new(2, "https://cdn/c.mp4");

    let result = JobResult::new(vec![stored, broken, pending]);

    assert_eq!(result.persisted_count(), 1);
}

#[test]
fn given_media_item_when_serialized_then_empty_optionals_are_omitted() {
    let item = MediaItem::new(0, "https://cdn/a.mp4").with_duration(Some(5.0));

    let value = serde_json::to_value(&item).unwrap();

    assert_eq!(
        value,
        json!({ "index": 0, "url": "https://cdn/a.mp4", "duration": 5.0 })
    );
}
