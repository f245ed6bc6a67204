use crate::Error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use models::{Job, JobId, JobStatus};
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;

/// Durable job storage: CRUD plus the optimistic transitions the worker
/// pipeline relies on (§4.3).
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert(&self, job: &Job) -> Result<(), Error>;
    async fn get(&self, job_id: &JobId) -> Result<Option<Job>, Error>;
    async fn list_for_user(&self, user_id: uuid::Uuid, limit: i64) -> Result<Vec<Job>, Error>;

    /// Atomically claims a job for processing, moving it to `validating`
    /// and stamping `started_at`/bumping `attempts`. Also matches jobs
    /// already in `processing` so a redelivered message (queue retry after
    /// a transient failure) can be reclaimed by the next attempt. Returns
    /// `None` if the job no longer exists or has already reached a
    /// terminal or cancelled state.
    async fn claim(&self, job_id: &JobId) -> Result<Option<Job>, Error>;

    /// Updates progress/current_step for a job that is actively processing.
    async fn update_progress(
        &self,
        job_id: &JobId,
        status: JobStatus,
        progress: u8,
        current_step: Option<&str>,
    ) -> Result<(), Error>;

    /// Records the probed source dimensions/duration once the worker has
    /// downloaded and inspected the input (§4.2 step 3 "Probe"). Informational
    /// only — never gates a transition.
    async fn record_input_metadata(
        &self,
        job_id: &JobId,
        size_bytes: u64,
        duration_sec: f64,
    ) -> Result<(), Error>;

    /// Idempotently writes a terminal outcome. Returns whether the row
    /// actually transitioned: `false` means the job had already reached a
    /// terminal state (e.g. it was cancelled before this callback arrived),
    /// and the caller must not treat its side effects (ledger finalize) as
    /// having happened.
    async fn finish_completed(
        &self,
        job_id: &JobId,
        output_url: &str,
        output_filename: &str,
        output_size_bytes: u64,
        processing_time_ms: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, Error>;

    async fn finish_failed(
        &self,
        job_id: &JobId,
        error_message: &str,
        error_code: &str,
    ) -> Result<bool, Error>;

    async fn cancel(&self, job_id: &JobId, user_id: uuid::Uuid) -> Result<bool, Error>;

    /// Jobs stuck in a non-terminal state past their deadline, for the
    /// stale-job sweeper (§4.3) to fail out.
    async fn sweep_stale(&self, older_than: DateTime<Utc>, limit: i64) -> Result<Vec<Job>, Error>;
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_job(row: sqlx::postgres::PgRow) -> Result<Job, Error> {
    let job_id: String = row.try_get("job_id")?;
    let job_id = JobId::try_from(job_id).map_err(|e| Error::Other(anyhow::anyhow!(e)))?;
    let metadata: serde_json::Value = row.try_get("metadata")?;
    let metadata: BTreeMap<String, serde_json::Value> = match metadata {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    };

    Ok(Job {
        job_id,
        user_id: row.try_get("user_id")?,
        platform: row.try_get("platform")?,
        processing_mode: row.try_get("processing_mode")?,
        crop_pixels: row.try_get::<i32, _>("crop_pixels")? as u32,
        crop_position: row.try_get("crop_position")?,
        input_url: row.try_get("input_url")?,
        input_blob_url: row.try_get("input_blob_url")?,
        input_filename: row.try_get("input_filename")?,
        input_size_bytes: row
            .try_get::<Option<i64>, _>("input_size_bytes")?
            .map(|v| v as u64),
        input_duration_sec: row.try_get("input_duration_sec")?,
        status: row.try_get("status")?,
        progress: row.try_get::<i16, _>("progress")? as u8,
        current_step: row.try_get("current_step")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        processing_time_ms: row.try_get("processing_time_ms")?,
        attempts: row.try_get::<i32, _>("attempts")? as u32,
        output_url: row.try_get("output_url")?,
        output_filename: row.try_get("output_filename")?,
        output_size_bytes: row
            .try_get::<Option<i64>, _>("output_size_bytes")?
            .map(|v| v as u64),
        expires_at: row.try_get("expires_at")?,
        error_message: row.try_get("error_message")?,
        error_code: row.try_get("error_code")?,
        webhook_url: row.try_get("webhook_url")?,
        batch_id: row.try_get("batch_id")?,
        metadata,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const SELECT_COLUMNS: &str = "job_id, user_id, platform, processing_mode, crop_pixels, \
    crop_position, input_url, input_blob_url, input_filename, input_size_bytes, \
    input_duration_sec, status, progress, current_step, started_at, completed_at, \
    processing_time_ms, attempts, output_url, output_filename, output_size_bytes, \
    expires_at, error_message, error_code, webhook_url, batch_id, metadata, \
    created_at, updated_at";

#[async_trait]
impl Store for PgStore {
    async fn insert(&self, job: &Job) -> Result<(), Error> {
        let metadata = serde_json::Value::Object(job.metadata.clone().into_iter().collect());
        sqlx::query(
            "INSERT INTO jobs (
                job_id, user_id, platform, processing_mode, crop_pixels, crop_position,
                input_url, input_blob_url, input_filename, input_size_bytes,
                input_duration_sec, status, progress, current_step, attempts,
                webhook_url, batch_id, metadata, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $19)",
        )
        .bind(job.job_id.as_str())
        .bind(job.user_id)
        .bind(job.platform)
        .bind(job.processing_mode)
        .bind(job.crop_pixels as i32)
        .bind(job.crop_position)
        .bind(&job.input_url)
        .bind(&job.input_blob_url)
        .bind(&job.input_filename)
        .bind(job.input_size_bytes.map(|v| v as i64))
        .bind(job.input_duration_sec)
        .bind(job.status)
        .bind(job.progress as i16)
        .bind(&job.current_step)
        .bind(job.attempts as i32)
        .bind(&job.webhook_url)
        .bind(&job.batch_id)
        .bind(metadata)
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> Result<Option<Job>, Error> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM jobs WHERE job_id = $1"
        ))
        .bind(job_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_job).transpose()
    }

    async fn list_for_user(&self, user_id: uuid::Uuid, limit: i64) -> Result<Vec<Job>, Error> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM jobs WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_job).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn claim(&self, job_id: &JobId) -> Result<Option<Job>, Error> {
        let row = sqlx::query(&format!(
            "UPDATE jobs SET
                status = 'validating',
                started_at = COALESCE(started_at, now()),
                attempts = attempts + 1,
                updated_at = now()
             WHERE job_id = $1 AND status IN ('queued', 'validating', 'processing')
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(job_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_job).transpose()
    }

    async fn update_progress(
        &self,
        job_id: &JobId,
        status: JobStatus,
        progress: u8,
        current_step: Option<&str>,
    ) -> Result<(), Error> {
        sqlx::query(
            "UPDATE jobs SET status = $2, progress = $3, current_step = $4, updated_at = now()
             WHERE job_id = $1 AND status NOT IN ('completed', 'failed', 'cancelled')",
        )
        .bind(job_id.as_str())
        .bind(status)
        .bind(progress as i16)
        .bind(current_step)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_input_metadata(
        &self,
        job_id: &JobId,
        size_bytes: u64,
        duration_sec: f64,
    ) -> Result<(), Error> {
        sqlx::query(
            "UPDATE jobs SET input_size_bytes = $2, input_duration_sec = $3, updated_at = now()
             WHERE job_id = $1 AND status NOT IN ('completed', 'failed', 'cancelled')",
        )
        .bind(job_id.as_str())
        .bind(size_bytes as i64)
        .bind(duration_sec)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn finish_completed(
        &self,
        job_id: &JobId,
        output_url: &str,
        output_filename: &str,
        output_size_bytes: u64,
        processing_time_ms: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, Error> {
        let result = sqlx::query(
            "UPDATE jobs SET
                status = 'completed',
                progress = 100,
                current_step = NULL,
                output_url = $2,
                output_filename = $3,
                output_size_bytes = $4,
                processing_time_ms = $5,
                completed_at = now(),
                expires_at = $6,
                updated_at = now()
             WHERE job_id = $1 AND status NOT IN ('completed', 'failed', 'cancelled')",
        )
        .bind(job_id.as_str())
        .bind(output_url)
        .bind(output_filename)
        .bind(output_size_bytes as i64)
        .bind(processing_time_ms)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn finish_failed(
        &self,
        job_id: &JobId,
        error_message: &str,
        error_code: &str,
    ) -> Result<bool, Error> {
        let result = sqlx::query(
            "UPDATE jobs SET
                status = 'failed',
                error_message = $2,
                error_code = $3,
                completed_at = now(),
                updated_at = now()
             WHERE job_id = $1 AND status NOT IN ('completed', 'failed', 'cancelled')",
        )
        .bind(job_id.as_str())
        .bind(error_message)
        .bind(error_code)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn cancel(&self, job_id: &JobId, user_id: uuid::Uuid) -> Result<bool, Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'cancelled', completed_at = now(), updated_at = now()
             WHERE job_id = $1 AND user_id = $2 AND status NOT IN ('completed', 'failed', 'cancelled')",
        )
        .bind(job_id.as_str())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn sweep_stale(&self, older_than: DateTime<Utc>, limit: i64) -> Result<Vec<Job>, Error> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM jobs
             WHERE status NOT IN ('completed', 'failed', 'cancelled') AND updated_at < $1
             ORDER BY updated_at ASC
             LIMIT $2"
        ))
        .bind(older_than)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        let jobs: Vec<Job> = rows.into_iter().map(row_to_job).collect::<Result<_, _>>()?;
        if !jobs.is_empty() {
            tracing::warn!(count = jobs.len(), "swept stale jobs");
        }
        Ok(jobs)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn select_columns_line_up_with_row_to_job() {
        // Every column row_to_job reads must appear in the shared projection,
        // or claim()/get()/sweep_stale() would silently diverge.
        for col in [
            "job_id",
            "user_id",
            "platform",
            "processing_mode",
            "status",
            "progress",
            "metadata",
            "created_at",
            "updated_at",
        ] {
            assert!(SELECT_COLUMNS.contains(col), "missing column {col}");
        }
    }
}
