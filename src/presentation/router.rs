use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::infrastructure::observability::request_id_middleware;
use crate::presentation::handlers::{
    all_models_handler, cancel_task_handler, create_task_handler, download_handler,
    health_handler, list_tasks_handler, models_handler, provider_models_handler,
    task_result_handler, task_status_handler,
};
use crate::presentation::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/tasks",
            post(create_task_handler).get(list_tasks_handler),
        )
        .route("/api/tasks/{task_id}/status", get(task_status_handler))
        .route("/api/tasks/{task_id}/result", get(task_result_handler))
        .route("/api/tasks/{task_id}/cancel", post(cancel_task_handler))
        .route("/api/models", get(models_handler))
        .route("/api/models/all", get(all_models_handler))
        .route(
            "/api/models/by-provider/{provider_name}",
            get(provider_models_handler),
        )
        .route("/api/download/{file_name}", get(download_handler))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
