//! The reserve → durable-insert → enqueue sequence (§4.1 "Ordering and
//! atomicity") shared by the single, batch, and upload submission routes.

use crate::error::AppError;
use crate::state::AppState;
use chrono::{Duration as ChronoDuration, Utc};
use models::{
    CropPosition, Job, JobId, JobStatus, Platform, PlatformPreset, ProcessingMode,
    SubmitJobRequest, SubmitJobResponse,
};

/// Where the source video comes from. A JSON submission carries a
/// `video_url`; a multipart upload is staged to the inputs bucket first and
/// the resulting presigned URL stands in as `input_url` (§6 "Upload").
pub enum InputSource {
    Remote,
    Uploaded {
        bytes: bytes::Bytes,
        content_type: String,
        filename: String,
    },
}

/// Resolves the effective platform preset for a request: an explicit
/// override always wins; otherwise the named platform's preset (§4.1
/// "Platform resolution").
fn resolve_preset(req: &SubmitJobRequest) -> (Platform, u32, CropPosition) {
    let platform = req
        .platform
        .as_deref()
        .map(Platform::resolve)
        .unwrap_or(Platform::Custom);
    let PlatformPreset {
        crop_pixels: preset_pixels,
        crop_position: preset_position,
        ..
    } = platform.preset();

    (
        platform,
        req.crop_pixels.unwrap_or(preset_pixels),
        req.crop_position.unwrap_or(preset_position),
    )
}

pub async fn submit_job(
    state: &AppState,
    user_id: uuid::Uuid,
    req: SubmitJobRequest,
    source: InputSource,
    batch_id: Option<String>,
) -> Result<SubmitJobResponse, AppError> {
    let (platform, crop_pixels, crop_position) = resolve_preset(&req);
    let processing_mode = req.processing_mode.unwrap_or(ProcessingMode::Crop);

    let (input_url, input_filename) = match source {
        InputSource::Remote => {
            netguard::validate_url(&req.video_url, &state.config.ssrf_policy).await?;
            (req.video_url.clone(), None)
        }
        InputSource::Uploaded {
            bytes,
            content_type,
            filename,
        } => {
            let staging_id = JobId::generate();
            let key = format!("uploads/{staging_id}/{filename}");
            state
                .blobs
                .put(store::Bucket::Inputs, &key, bytes, &content_type)
                .await
                .map_err(|e| AppError::Other(anyhow::anyhow!(e)))?;
            let url = state
                .blobs
                .presigned_get_url(
                    store::Bucket::Inputs,
                    &key,
                    std::time::Duration::from_secs(86_400),
                )
                .await
                .map_err(|e| AppError::Other(anyhow::anyhow!(e)))?;
            (url, Some(filename))
        }
    };

    let job_id = JobId::generate();
    let cost = processing_mode.requested_cost() as i64;

    state.ledger.reserve(user_id, &job_id, cost).await?;

    let now = Utc::now();
    let job = Job {
        job_id: job_id.clone(),
        user_id,
        platform,
        processing_mode,
        crop_pixels,
        crop_position,
        input_url,
        input_blob_url: None,
        input_filename,
        input_size_bytes: None,
        input_duration_sec: None,
        status: JobStatus::Queued,
        progress: 0,
        current_step: None,
        started_at: None,
        completed_at: None,
        processing_time_ms: None,
        attempts: 0,
        output_url: None,
        output_filename: None,
        output_size_bytes: None,
        expires_at: None,
        error_message: None,
        error_code: None,
        webhook_url: req.webhook_url,
        batch_id,
        metadata: req.metadata,
        created_at: now,
        updated_at: now,
    };

    if let Err(err) = state.store.insert(&job).await {
        // Durable insert failed after reserve: compensate and surface 5xx.
        let _ = state.ledger.release(user_id, &job_id).await;
        return Err(AppError::Other(anyhow::anyhow!(err)));
    }

    if let Err(err) = state.queue.enqueue(&job_id).await {
        // Enqueue failed after a successful insert: release the hold and
        // remove the row so it doesn't linger in `queued` with no consumer.
        // If the delete itself fails the stale-job sweeper will catch it.
        let _ = state.ledger.release(user_id, &job_id).await;
        let _ = state.store.cancel(&job_id, user_id).await;
        tracing::warn!(job_id = %job_id, error = %err, "enqueue failed after durable insert, compensating");
        return Err(AppError::QueueUnavailable);
    }

    Ok(SubmitJobResponse {
        job_id,
        status: JobStatus::Queued,
        crop_pixels,
        crop_position,
        credits_charged: cost as u32,
        created_at: now,
        estimated_completion: now + ChronoDuration::minutes(5),
    })
}
