//! `/api/v1/jobs*` handlers (§6): create by URL, create by upload, batch
//! create, query, download, cancel.

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;
use crate::submit::{submit_job, InputSource};
use axum::extract::{Multipart, Path, State};
use axum::response::Json;
use models::{
    BatchSubmitRequest, DownloadResponse, ErrorKind, JobDescriptorResponse, JobId,
    SubmitJobRequest, SubmitJobResponse,
};
use std::collections::BTreeMap;

const MAX_UPLOAD_CONTENT_TYPES: &[&str] = &["video/"];

pub async fn create_by_url(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<SubmitJobRequest>,
) -> Result<Json<SubmitJobResponse>, AppError> {
    let response = submit_job(&state, user_id, req, InputSource::Remote, None).await?;
    Ok(Json(response))
}

pub async fn create_by_upload(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<SubmitJobResponse>, AppError> {
    let mut bytes: Option<bytes::Bytes> = None;
    let mut content_type = String::new();
    let mut filename = String::from("upload.mp4");
    let mut req = SubmitJobRequest {
        video_url: String::new(),
        platform: None,
        processing_mode: None,
        crop_pixels: None,
        crop_position: None,
        webhook_url: None,
        metadata: BTreeMap::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Kind(ErrorKind::validation("INVALID_MULTIPART", e.to_string())))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| "video/mp4".to_string());
                filename = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| filename.clone());
                let data = field.bytes().await.map_err(|e| {
                    AppError::Kind(ErrorKind::validation("INVALID_MULTIPART", e.to_string()))
                })?;
                if data.len() as u64 > state.config.max_upload_bytes {
                    return Err(AppError::Kind(ErrorKind::validation(
                        "UPLOAD_TOO_LARGE",
                        format!(
                            "upload of {} bytes exceeds the {}-byte limit",
                            data.len(),
                            state.config.max_upload_bytes
                        ),
                    )));
                }
                bytes = Some(data);
            }
            "platform" => req.platform = Some(field_text(field).await?),
            "processing_mode" => {
                let text = field_text(field).await?;
                req.processing_mode = Some(serde_json::from_value(serde_json::Value::String(text)).map_err(
                    |_| AppError::Kind(ErrorKind::validation("INVALID_PROCESSING_MODE", "unrecognized processing_mode")),
                )?);
            }
            "crop_pixels" => {
                let text = field_text(field).await?;
                req.crop_pixels = Some(text.parse().map_err(|_| {
                    AppError::Kind(ErrorKind::validation("INVALID_CROP_PIXELS", "crop_pixels must be a non-negative integer"))
                })?);
            }
            "webhook_url" => req.webhook_url = Some(field_text(field).await?),
            _ => {}
        }
    }

    let bytes = bytes.ok_or_else(|| {
        AppError::Kind(ErrorKind::validation("MISSING_FILE", "multipart body must include a `file` field"))
    })?;

    if !MAX_UPLOAD_CONTENT_TYPES.iter().any(|prefix| content_type.starts_with(prefix)) {
        return Err(AppError::Kind(ErrorKind::validation(
            "UNSUPPORTED_CONTENT_TYPE",
            format!("content-type {content_type:?} is not a supported video type"),
        )));
    }

    let source = InputSource::Uploaded {
        bytes,
        content_type,
        filename,
    };
    let response = submit_job(&state, user_id, req, source, None).await?;
    Ok(Json(response))
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Kind(ErrorKind::validation("INVALID_MULTIPART", e.to_string())))
}

pub async fn create_batch(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<BatchSubmitRequest>,
) -> Result<Json<Vec<SubmitJobResponse>>, AppError> {
    if req.jobs.is_empty() {
        return Err(AppError::Kind(ErrorKind::validation(
            "EMPTY_BATCH",
            "batch must contain at least one job",
        )));
    }
    if req.jobs.len() > state.config.max_batch_size {
        return Err(AppError::Kind(ErrorKind::validation(
            "BATCH_TOO_LARGE",
            format!(
                "batch of {} exceeds the {}-job limit",
                req.jobs.len(),
                state.config.max_batch_size
            ),
        )));
    }

    let batch_id = uuid::Uuid::new_v4().to_string();
    let mut responses = Vec::with_capacity(req.jobs.len());
    for job_req in req.jobs {
        let response = submit_job(
            &state,
            user_id,
            job_req,
            InputSource::Remote,
            Some(batch_id.clone()),
        )
        .await?;
        responses.push(response);
    }
    Ok(Json(responses))
}

pub async fn get_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<JobId>,
) -> Result<Json<JobDescriptorResponse>, AppError> {
    let job = state.store.get(&job_id).await?.ok_or(AppError::NotFound)?;
    if job.user_id != user_id {
        return Err(AppError::NotFound);
    }

    let progress = if job.progress > 0 {
        job.progress
    } else {
        job.status.default_progress()
    };

    Ok(Json(JobDescriptorResponse {
        job_id: job.job_id,
        status: job.status,
        progress,
        current_step: job.current_step,
        platform: job.platform,
        processing_mode: job.processing_mode,
        input_url: job.input_url,
        output_url: job.output_url,
        output_filename: job.output_filename,
        expires_at: job.expires_at,
        error_message: job.error_message,
        started_at: job.started_at,
        completed_at: job.completed_at,
        processing_time_ms: job.processing_time_ms,
    }))
}

pub async fn download_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<JobId>,
) -> Result<Json<DownloadResponse>, AppError> {
    let job = state.store.get(&job_id).await?.ok_or(AppError::NotFound)?;
    if job.user_id != user_id {
        return Err(AppError::NotFound);
    }
    let output_url = job.output_url.ok_or_else(|| {
        AppError::Kind(ErrorKind::validation(
            "NOT_READY",
            "job has no output yet",
        ))
    })?;
    Ok(Json(DownloadResponse {
        output_url,
        expires_at: job.expires_at,
    }))
}

pub async fn cancel_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<JobId>,
) -> Result<Json<serde_json::Value>, AppError> {
    let job = state.store.get(&job_id).await?.ok_or(AppError::NotFound)?;
    if job.user_id != user_id {
        return Err(AppError::NotFound);
    }
    if job.status.is_terminal() {
        return Err(AppError::Kind(ErrorKind::validation(
            "ALREADY_TERMINAL",
            "job has already reached a terminal state",
        )));
    }

    // The queue has no by-job-id removal primitive, so there is nothing to
    // actively dequeue here; if a worker has already claimed the item, its
    // read-before-write check on the job row honors this cancellation
    // instead (§5 "Cancellation and timeouts").
    let cancelled = state.store.cancel(&job_id, user_id).await?;
    if cancelled {
        state.ledger.release(user_id, &job_id).await?;
    }

    Ok(Json(serde_json::json!({ "job_id": job_id, "status": "cancelled" })))
}
