use axum::http::{Method, StatusCode};
use serde_json::{Value, json};
use vidgen::application::ports::{ProviderAdapter, ProviderError};
use vidgen::domain::ProviderPhase;
use vidgen::infrastructure::providers::{ZHIPUAI_DEFAULT_MODELS, ZhipuAiAdapter};

use super::{closed_port_url, header, p, recording_server};

fn adapter(base_url: &str) -> ZhipuAiAdapter {
    ZhipuAiAdapter::new(
        reqwest::Client::new(),
        base_url,
        "zp-test",
        ZHIPUAI_DEFAULT_MODELS,
    )
}

fn offline() -> ZhipuAiAdapter {
    ZhipuAiAdapter::with_defaults(reqwest::Client::new(), "zp-test")
}

fn minimal_request(model: &str) -> Value {
    if model.ends_with("-start-end") {
        json!({ "image_url": ["https://x/first.png", "https://x/last.png"] })
    } else if model.ends_with("-reference") {
        json!({ "image_url": ["https://x/ref.png"] })
    } else if model.ends_with("-image") {
        json!({ "image_url": "https://x/ref.png" })
    } else {
        json!({ "prompt": "a cat on grass" })
    }
}

#[test]
fn given_every_default_model_when_validating_then_empty_rejected_and_minimal_accepted() {
    let adapter = offline();

    for model in ZHIPUAI_DEFAULT_MODELS {
        let err = adapter.validate_parameters(model, &p(json!({}))).unwrap_err();
        assert!(
            matches!(err, ProviderError::Validation { .. }),
            "{model}: {err:?}"
        );
        assert!(
            adapter.validate_parameters(model, &p(minimal_request(model))).is_ok(),
            "{model} should accept a minimal request"
        );
    }
}

#[test]
fn given_start_end_model_when_frame_count_is_wrong_then_rejected() {
    let adapter = offline();

    for images in [json!(["https://x/1.png"]), json!(["a", "b", "c"])] {
        let err = adapter
            .validate_parameters("viduq1-start-end", &p(json!({ "image_url": images })))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation { ref fields, .. } if fields == &["image_url"]));
    }
}

#[test]
fn given_reference_model_when_more_than_three_images_then_rejected() {
    let err = offline()
        .validate_parameters(
            "vidu2-reference",
            &p(json!({ "image_url": ["a", "b", "c", "d"], "prompt": "x" })),
        )
        .unwrap_err();

    assert!(matches!(err, ProviderError::Validation { .. }));
}

#[test]
fn given_reference_model_when_image_url_is_a_bare_string_then_rejected() {
    let err = offline()
        .validate_parameters(
            "vidu2-reference",
            &p(json!({ "image_url": "https://x/ref.png", "prompt": "x" })),
        )
        .unwrap_err();

    assert!(matches!(err, ProviderError::Validation { ref fields, .. } if fields == &["image_url"]));
}

#[test]
fn given_source_image_alias_when_validating_image_model_then_renamed() {
    let validated = offline()
        .validate_parameters(
            "viduq1-image",
            &p(json!({ "source_image": "https://x/cat.png" })),
        )
        .unwrap();

    assert_eq!(validated["image_url"], "https://x/cat.png");
    assert!(!validated.contains_key("source_image"));
}

#[tokio::test]
async fn given_cogvideox_request_when_submitting_then_only_family_fields_are_sent() {
    let (base_url, recorded) = recording_server(
        StatusCode::OK,
        json!({ "id": "8f1e-task", "model": "cogvideox-2", "task_status": "PROCESSING" }),
    )
    .await;
    let parameters = p(json!({
        "prompt": "a cat on grass",
        "quality": "speed",
        "with_audio": true,
        "style": "anime",
        "request_id": "client-42"
    }));

    let id = adapter(&base_url)
        .submit("cogvideox-2", &parameters)
        .await
        .unwrap();

    assert_eq!(id, "8f1e-task");
    let requests = recorded.lock().unwrap();
    let request = &requests[0];
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path, "/api/paas/v4/videos/generations");
    assert_eq!(header(request, "authorization"), Some("Bearer zp-test"));
    assert_eq!(
        request.body,
        json!({
            "model": "cogvideox-2",
            "prompt": "a cat on grass",
            "quality": "speed",
            "with_audio": true,
            "request_id": "client-42"
        })
    );
}

#[tokio::test]
async fn given_start_end_request_when_submitting_then_both_frames_are_sent() {
    let (base_url, recorded) =
        recording_server(StatusCode::OK, json!({ "id": "vidu-1" })).await;
    let parameters = p(json!({
        "image_url": ["https://x/first.png", "https://x/last.png"],
        "duration": 4,
        "movement_amplitude": "auto"
    }));

    adapter(&base_url)
        .submit("vidu2-start-end", &parameters)
        .await
        .unwrap();

    let body = &recorded.lock().unwrap()[0].body;
    assert_eq!(
        body["image_url"],
        json!(["https://x/first.png", "https://x/last.png"])
    );
    assert_eq!(body["duration"], 4);
    assert_eq!(body["movement_amplitude"], "auto");
}

#[tokio::test]
async fn given_response_without_id_when_submitting_then_final_submission_error() {
    let (base_url, _) = recording_server(StatusCode::OK, json!({ "task_status": "FAIL" })).await;

    let err = adapter(&base_url)
        .submit("cogvideox-2", &p(json!({ "prompt": "x" })))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Submission { retryable: false, .. }));
}

#[tokio::test]
async fn given_service_unavailable_when_submitting_then_retryable() {
    let (base_url, _) =
        recording_server(StatusCode::SERVICE_UNAVAILABLE, json!({ "error": "busy" })).await;

    let err = adapter(&base_url)
        .submit("cogvideox-2", &p(json!({ "prompt": "x" })))
        .await
        .unwrap_err();

    assert!(err.is_retryable());
}

#[tokio::test]
async fn given_missing_api_key_when_submitting_then_configuration_error() {
    let adapter = ZhipuAiAdapter::new(
        reqwest::Client::new(),
        &closed_port_url(),
        "  ",
        ZHIPUAI_DEFAULT_MODELS,
    );

    let err = adapter
        .submit("cogvideox-2", &p(json!({ "prompt": "x" })))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Configuration(_)));
}

#[tokio::test]
async fn given_task_states_when_fetching_status_then_mapped_to_phases() {
    for (task_status, phase) in [
        ("PROCESSING", ProviderPhase::Running),
        ("SUCCESS", ProviderPhase::Succeeded),
        ("FAIL", ProviderPhase::Failed),
        ("SUBMITTED", ProviderPhase::Queued),
    ] {
        let (base_url, recorded) =
            recording_server(StatusCode::OK, json!({ "task_status": task_status })).await;

        let status = adapter(&base_url).fetch_status("8f1e-task").await.unwrap();

        assert_eq!(status.phase, phase, "{task_status}");
        assert_eq!(
            recorded.lock().unwrap()[0].path,
            "/api/paas/v4/async-result/8f1e-task"
        );
    }
}

#[tokio::test]
async fn given_failed_task_when_fetching_status_then_detail_is_error_message() {
    let (base_url, _) = recording_server(
        StatusCode::OK,
        json!({ "task_status": "FAIL", "error": { "code": "1301", "message": "unsafe content" } }),
    )
    .await;

    let status = adapter(&base_url).fetch_status("t").await.unwrap();

    assert_eq!(status.detail.as_deref(), Some("unsafe content"));
}

#[tokio::test]
async fn given_unreachable_endpoint_when_fetching_status_then_transport_error() {
    let err = adapter(&closed_port_url())
        .fetch_status("t")
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Transport(_)));
}

#[test]
fn given_video_results_when_normalizing_then_items_with_cover_metadata() {
    let payload = json!({
        "model": "cogvideox-2",
        "request_id": "req-5",
        "task_status": "SUCCESS",
        "video_result": [
            { "url": "https://aigc-files.bigmodel.cn/a.mp4", "cover_image_url": "https://aigc-files.bigmodel.cn/a.png" },
            { "url": "" },
            { "url": "https://aigc-files.bigmodel.cn/b.mp4" }
        ]
    });

    let result = offline().normalize_result(&payload).unwrap();

    assert_eq!(result.videos.len(), 2);
    assert_eq!(result.videos[0].url, "https://aigc-files.bigmodel.cn/a.mp4");
    assert_eq!(
        result.videos[0].metadata["cover_image_url"],
        "https://aigc-files.bigmodel.cn/a.png"
    );
    assert!(result.videos[1].metadata.is_empty());
    assert_ne!(result.videos[0].index, result.videos[1].index);
    assert_eq!(result.metadata["request_id"], "req-5");
}

#[test]
fn given_payload_without_video_result_when_normalizing_then_invalid_response() {
    let err = offline()
        .normalize_result(&json!({ "task_status": "SUCCESS" }))
        .unwrap_err();

    assert!(matches!(err, ProviderError::InvalidResponse(_)));
}

#[tokio::test]
async fn given_remote_task_when_canceling_then_not_supported() {
    let acknowledged = offline().cancel("8f1e-task").await.unwrap();

    assert!(!acknowledged);
}
