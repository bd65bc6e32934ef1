use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::Uri;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::api_response::{ApiError, success};
use crate::application::ports::{JobFilter, JobOrdering};
use crate::application::services::{JobPage, JobQuery};
use crate::domain::{Job, JobError, JobId, JobResult, JobStatus, Parameters};
use crate::presentation::state::AppState;

fn default_async() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub model: Option<String>,
    pub provider: Option<String>,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default = "default_async")]
    pub is_async: bool,
}

#[derive(Debug, Serialize)]
pub struct TaskCreatedResponse {
    pub task_id: String,
}

#[derive(Debug, Serialize)]
pub struct TaskStatusResponse {
    pub task_id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TaskResultResponse {
    pub task_id: String,
    pub status: JobStatus,
    pub result: Option<JobResult>,
    pub error: Option<JobError>,
}

#[derive(Debug, Serialize)]
pub struct TaskCancelResponse {
    pub task_id: String,
    pub status: JobStatus,
    pub canceled: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// `field` or `-field`; defaults to `-created_at`.
    pub ordering: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskListItem {
    pub task_id: String,
    pub model: String,
    pub provider: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for TaskListItem {
    fn from(job: Job) -> Self {
        Self {
            task_id: job.id.to_string(),
            model: job.model,
            provider: job.provider,
            status: job.status,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub items: Vec<TaskListItem>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
}

fn parse_task_id(raw: &str) -> Result<JobId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid task ID: {raw}")))
}

#[tracing::instrument(skip(state, payload))]
pub async fn create_task_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    tracing::debug!(model = ?request.model, provider = ?request.provider, "Create task request");

    // A request without a model falls back to the configured default pair.
    let (model, provider) = match request.model {
        Some(model) => (model, request.provider),
        None => (
            state.providers.default_model.clone(),
            request
                .provider
                .or_else(|| Some(state.providers.default_provider.clone())),
        ),
    };

    let task_id = state
        .orchestrator
        .submit(
            &model,
            provider.as_deref(),
            request.parameters,
            request.is_async,
        )
        .await?;

    Ok(success(
        TaskCreatedResponse {
            task_id: task_id.to_string(),
        },
        "Task created",
    ))
}

pub async fn task_status_handler(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Response, ApiError> {
    let job = state.orchestrator.get_job(parse_task_id(&task_id)?).await?;
    Ok(success(
        TaskStatusResponse {
            task_id: job.id.to_string(),
            status: job.status,
            created_at: job.created_at,
            updated_at: job.updated_at,
        },
        "Task status",
    ))
}

pub async fn task_result_handler(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_task_id(&task_id)?;
    let view = state.orchestrator.get_result(id).await?;
    Ok(success(
        TaskResultResponse {
            task_id: id.to_string(),
            status: view.status,
            result: view.result,
            error: view.error,
        },
        "Task result",
    ))
}

#[tracing::instrument(skip(state))]
pub async fn cancel_task_handler(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_task_id(&task_id)?;
    let outcome = state.orchestrator.cancel(id).await?;
    let message = if outcome.changed {
        "Task canceled"
    } else {
        "Task already finished"
    };
    Ok(success(
        TaskCancelResponse {
            task_id: id.to_string(),
            status: outcome.status,
            canceled: outcome.changed,
        },
        message,
    ))
}

/// Link to another page of the same listing, keeping every filter.
fn page_link(
    path: &str,
    query: &ListTasksQuery,
    page: &JobPage,
    ordering: JobOrdering,
    target: u32,
) -> Option<String> {
    let mut url = reqwest::Url::parse("http://localhost/").ok()?;
    url.set_path(path);
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in [
            ("status", &query.status),
            ("model", &query.model),
            ("provider", &query.provider),
        ] {
            if let Some(value) = value {
                pairs.append_pair(key, value);
            }
        }
        pairs
            .append_pair("page_size", &page.page_size.to_string())
            .append_pair("ordering", &ordering.to_string())
            .append_pair("page", &target.to_string());
    }
    Some(format!("{}?{}", url.path(), url.query().unwrap_or_default()))
}

pub async fn list_tasks_handler(
    State(state): State<AppState>,
    uri: Uri,
    query: Result<Query<ListTasksQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<JobStatus>)
        .transpose()
        .map_err(ApiError::bad_request)?;
    let ordering = query
        .ordering
        .as_deref()
        .map(str::parse::<JobOrdering>)
        .transpose()
        .map_err(ApiError::bad_request)?
        .unwrap_or_default();

    let page = state
        .orchestrator
        .list_jobs(JobQuery {
            filter: JobFilter {
                status,
                model: query.model.clone(),
                provider: query.provider.clone(),
            },
            ordering,
            page: query.page,
            page_size: query.page_size,
        })
        .await?;

    let next = page
        .has_next()
        .then(|| page_link(uri.path(), &query, &page, ordering, page.page + 1))
        .flatten();
    let previous = page
        .has_previous()
        .then(|| page_link(uri.path(), &query, &page, ordering, page.page - 1))
        .flatten();

    Ok(success(
        TaskListResponse {
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages,
            next,
            previous,
            items: page.jobs.into_iter().map(TaskListItem::from).collect(),
        },
        "Task list",
    ))
}
