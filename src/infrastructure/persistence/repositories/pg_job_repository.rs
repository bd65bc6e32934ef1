use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;
use uuid::Uuid;

use crate::application::ports::{
    JobFilter, JobOrdering, JobRepository, JobSortField, RepositoryError,
};
use crate::domain::{Job, JobError, JobId, JobResult, JobStatus, JobUpdate, Parameters};

const JOB_COLUMNS: &str = "id, model, provider, parameters, status, external_job_id, \
     attempt_count, is_async, version, result, error, created_at, updated_at";

const FILTER_CLAUSE: &str = "($1::text IS NULL OR status = $1) \
     AND ($2::text IS NULL OR model = $2) \
     AND ($3::text IS NULL OR provider = $3)";

/// Column names come from a closed set, never from request text.
fn order_clause(ordering: JobOrdering) -> String {
    let column = match ordering.field {
        JobSortField::CreatedAt => "created_at",
        JobSortField::UpdatedAt => "updated_at",
        JobSortField::Status => "status",
        JobSortField::Model => "model",
    };
    let direction = if ordering.descending { "DESC" } else { "ASC" };
    format!("{column} {direction}, created_at DESC, id")
}

pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    model: String,
    provider: String,
    parameters: Json<Parameters>,
    status: String,
    external_job_id: Option<String>,
    attempt_count: i32,
    is_async: bool,
    version: i64,
    result: Option<Json<JobResult>>,
    error: Option<Json<JobError>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = RepositoryError;

    fn try_from(r: JobRow) -> Result<Self, Self::Error> {
        let status = r
            .status
            .parse::<JobStatus>()
            .map_err(RepositoryError::Serialization)?;

        Ok(Job {
            id: JobId::from_uuid(r.id),
            model: r.model,
            provider: r.provider,
            parameters: r.parameters.0,
            status,
            external_job_id: r.external_job_id,
            attempt_count: u32::try_from(r.attempt_count).unwrap_or_default(),
            is_async: r.is_async,
            version: u64::try_from(r.version)
                .map_err(|e| RepositoryError::Serialization(e.to_string()))?,
            result: r.result.map(|json| json.0),
            error: r.error.map(|json| json.0),
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl JobRepository for PgJobRepository {
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn create(&self, job: &Job) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, model, provider, parameters, status, external_job_id,
                              attempt_count, is_async, version, result, error, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(&job.model)
        .bind(&job.provider)
        .bind(Json(&job.parameters))
        .bind(job.status.as_str())
        .bind(&job.external_job_id)
        .bind(i32::try_from(job.attempt_count).unwrap_or(i32::MAX))
        .bind(job.is_async)
        .bind(to_i64(job.version))
        .bind(job.result.as_ref().map(Json))
        .bind(job.error.as_ref().map(Json))
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::ConstraintViolation(db.to_string())
            }
            other => RepositoryError::QueryFailed(other.to_string()),
        })?;

        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        let row: Option<JobRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        row.map(Job::try_from).transpose()
    }

    #[instrument(skip(self, update), fields(job_id = %id, status = ?update.status))]
    async fn compare_and_set(
        &self,
        id: JobId,
        expected_version: u64,
        update: &JobUpdate,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = COALESCE($3, status),
                external_job_id = COALESCE($4, external_job_id),
                attempt_count = COALESCE($5, attempt_count),
                result = COALESCE($6, result),
                error = COALESCE($7, error),
                version = version + 1,
                updated_at = $8
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(to_i64(expected_version))
        .bind(update.status.map(|s| s.as_str()))
        .bind(&update.external_job_id)
        .bind(
            update
                .attempt_count
                .map(|n| i32::try_from(n).unwrap_or(i32::MAX)),
        )
        .bind(update.result.as_ref().map(Json))
        .bind(update.error.as_ref().map(Json))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        filter: &JobFilter,
        ordering: JobOrdering,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Job>, u64), RepositoryError> {
        let status = filter.status.map(|s| s.as_str());

        let count_sql = format!("SELECT COUNT(*) FROM jobs WHERE {FILTER_CLAUSE}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(status)
            .bind(&filter.model)
            .bind(&filter.provider)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        let page_sql = format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE {FILTER_CLAUSE} \
             ORDER BY {} LIMIT $4 OFFSET $5",
            order_clause(ordering)
        );
        let rows: Vec<JobRow> = sqlx::query_as(&page_sql)
            .bind(status)
            .bind(&filter.model)
            .bind(&filter.provider)
            .bind(to_i64(limit))
            .bind(to_i64(offset))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        let jobs = rows
            .into_iter()
            .map(Job::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((jobs, u64::try_from(total).unwrap_or_default()))
    }

    #[instrument(skip(self), fields(status = %status))]
    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, RepositoryError> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE status = $1 ORDER BY created_at DESC"
        );
        let rows: Vec<JobRow> = sqlx::query_as(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        rows.into_iter().map(Job::try_from).collect()
    }
}
