use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use vidgen::application::ports::{DownloadError, MediaDownloader};
use vidgen::infrastructure::download::HttpMediaDownloader;

use crate::helpers::spawn_mock_server;

async fn media_server() -> String {
    let router = Router::new()
        .route("/ok.mp4", get(|| async { b"\x00\x00\x00\x18ftypmp42".to_vec() }))
        .route("/busy.mp4", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
        .route("/throttled.mp4", get(|| async { StatusCode::TOO_MANY_REQUESTS }))
        .route("/gone.mp4", get(|| async { StatusCode::NOT_FOUND }))
        .route("/denied.mp4", get(|| async { StatusCode::FORBIDDEN }))
        .route(
            "/slow.mp4",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                b"late".to_vec()
            }),
        );
    spawn_mock_server(router).await
}

fn downloader() -> HttpMediaDownloader {
    HttpMediaDownloader::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn given_reachable_media_when_fetching_then_body_bytes_are_returned() {
    let base_url = media_server().await;

    let bytes = downloader()
        .fetch(&format!("{base_url}/ok.mp4"))
        .await
        .unwrap();

    assert_eq!(&bytes[..], b"\x00\x00\x00\x18ftypmp42");
}

#[tokio::test]
async fn given_server_errors_when_fetching_then_transient() {
    let base_url = media_server().await;

    for path in ["busy.mp4", "throttled.mp4"] {
        let err = downloader()
            .fetch(&format!("{base_url}/{path}"))
            .await
            .unwrap_err();
        assert!(err.is_transient(), "{path}: {err:?}");
    }
}

#[tokio::test]
async fn given_client_errors_when_fetching_then_permanent() {
    let base_url = media_server().await;

    for path in ["gone.mp4", "denied.mp4"] {
        let err = downloader()
            .fetch(&format!("{base_url}/{path}"))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Permanent(_)), "{path}: {err:?}");
    }
}

#[tokio::test]
async fn given_closed_port_when_fetching_then_transient() {
    let url = format!("{}/clip.mp4", crate::infrastructure::providers::closed_port_url());

    let err = downloader().fetch(&url).await.unwrap_err();

    assert!(err.is_transient());
}

#[tokio::test]
async fn given_injected_client_with_short_timeout_when_media_is_slow_then_transient() {
    let base_url = media_server().await;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let err = HttpMediaDownloader::with_client(client)
        .fetch(&format!("{base_url}/slow.mp4"))
        .await
        .unwrap_err();

    assert!(err.is_transient(), "{err:?}");
}
