//! `POST /api/internal/jobs/:id/complete` — the worker's terminal-state
//! callback (§4.1). Idempotent by job_id; finalizes or releases credits
//! and updates the row.

use crate::auth::check_internal_secret;
use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Json;
use chrono::{Duration as ChronoDuration, Utc};
use models::{CompleteJobCallback, ErrorKind, JobId, JobOutcome};

pub async fn complete_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(job_id): Path<JobId>,
    Json(callback): Json<CompleteJobCallback>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_internal_secret(&headers, &state.config.internal_callback_secret)?;

    if callback.job_id != job_id {
        return Err(AppError::Kind(ErrorKind::validation(
            "JOB_ID_MISMATCH",
            "path job_id does not match callback body",
        )));
    }

    let job = state.store.get(&job_id).await?.ok_or(AppError::NotFound)?;

    match callback.outcome {
        JobOutcome::Completed {
            output_url,
            output_filename,
            output_size_bytes,
            processing_time_ms,
            effective_backend,
        } => {
            let expires_at = Utc::now() + ChronoDuration::days(state.config.retention_days);
            let transitioned = state
                .store
                .finish_completed(
                    &job_id,
                    &output_url,
                    &output_filename,
                    output_size_bytes,
                    processing_time_ms,
                    expires_at,
                )
                .await?;

            if transitioned {
                finalize_with_retry(&state, job.user_id, &job_id, effective_backend.cost() as i64).await;
            } else {
                tracing::info!(%job_id, "completion callback arrived for a job already in a terminal state, skipping finalize");
            }
        }
        JobOutcome::Failed {
            error_message,
            error_code,
        } => {
            let transitioned = state
                .store
                .finish_failed(
                    &job_id,
                    &error_message,
                    error_code.as_deref().unwrap_or("WORKER_FAILURE"),
                )
                .await?;
            if transitioned {
                state.ledger.release(job.user_id, &job_id).await?;
            }
        }
    }

    Ok(Json(serde_json::json!({ "job_id": job_id, "acknowledged": true })))
}

/// Converts the credit hold into a final charge, retrying up to 3 times
/// with increasing backoff (§4.2 "Finalize"). A persistent failure is
/// logged durably but never reverts the job's already-completed status —
/// the job row and the ledger are allowed to diverge transiently, to be
/// reconciled out of band.
async fn finalize_with_retry(state: &AppState, user_id: uuid::Uuid, job_id: &JobId, amount: i64) {
    const MAX_ATTEMPTS: u32 = 3;
    for attempt in 0..MAX_ATTEMPTS {
        match state.ledger.finalize(user_id, job_id, amount).await {
            Ok(()) => return,
            Err(err) if attempt + 1 < MAX_ATTEMPTS => {
                tracing::warn!(job_id = %job_id, attempt, error = %err, "ledger finalize failed, retrying");
                tokio::time::sleep(std::time::Duration::from_millis(200 * 2u64.pow(attempt))).await;
            }
            Err(err) => {
                tracing::error!(job_id = %job_id, error = %err, "ledger finalize failed after all retries, job remains completed");
            }
        }
    }
}
