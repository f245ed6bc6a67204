//! The six-stage pipeline a claimed job runs through (§4.2): claim, download,
//! probe, transform, upload, finalize. Each stage advances `progress` on the
//! durable row before doing its work, so a client polling `GET /jobs/:id`
//! mid-run sees the milestones spec'd there, not just `processing`/50.

pub mod callback;
pub mod scratch;

use crate::error::StageError;
use crate::state::AppState;
use chrono::Utc;
use models::{Job, JobId, JobOutcome, JobStatus};
use scratch::ScratchDir;
use std::time::Instant;
use store::Bucket;

/// What the caller (the dequeue loop in `main.rs`) should do with the queue
/// delivery once `run` returns.
pub enum Disposition {
    /// Terminal one way or another; ack the delivery.
    Ack,
    /// A transient failure occurred; nack so the queue can retry/backoff.
    Retry(anyhow::Error),
}

/// Runs a single claimed job end to end. Never panics on a stage failure —
/// every `StageError` is either resolved into a terminal callback (and
/// `Disposition::Ack`) or bubbled up as `Disposition::Retry`.
pub async fn run(state: &AppState, job_id: &JobId) -> Disposition {
    let started = Instant::now();

    let job = match state.store.claim(job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            tracing::info!(%job_id, "job no longer claimable, dropping delivery");
            return Disposition::Ack;
        }
        Err(err) => return Disposition::Retry(err.into()),
    };

    match run_stages(state, &job, started).await {
        Ok(outcome) => {
            callback::deliver(state, job_id, outcome.clone()).await;
            notify(state, &job, outcome).await;
            Disposition::Ack
        }
        Err(StageError::Terminal { code, message }) => {
            tracing::warn!(%job_id, code, %message, "job failed terminally");
            let outcome = JobOutcome::Failed {
                error_message: message,
                error_code: Some(code.to_string()),
            };
            callback::deliver(state, job_id, outcome.clone()).await;
            notify(state, &job, outcome).await;
            Disposition::Ack
        }
        Err(StageError::Transient(err)) => {
            tracing::warn!(%job_id, error = %err, "job failed transiently, leaving for retry");
            Disposition::Retry(err)
        }
    }
}

async fn run_stages(
    state: &AppState,
    job: &Job,
    started: Instant,
) -> Result<JobOutcome, StageError> {
    let scratch = ScratchDir::create(&job.job_id)?;

    // Stage 2: download.
    state
        .store
        .update_progress(&job.job_id, JobStatus::Processing, 10, Some("downloading"))
        .await?;
    // `download::download` only returns `Ok` once a candidate has already
    // passed `is_valid_video`; an HTML-login-page response surfaces as
    // `download::Error::ContentNotVideo` via the `?` above instead.
    let downloaded = download::download(&state.http, &job.input_url, &state.config.download).await?;

    state
        .blobs
        .put(
            Bucket::Inputs,
            &input_key(&job.job_id, &downloaded.filename),
            downloaded.bytes.clone(),
            "application/octet-stream",
        )
        .await?;

    // Stage 3: probe.
    state
        .store
        .update_progress(&job.job_id, JobStatus::Processing, 30, Some("probing"))
        .await?;
    let input_path = scratch.input_path(&downloaded.filename);
    tokio::fs::write(&input_path, &downloaded.bytes).await?;
    let media = transform::probe(&state.config.ffprobe_binary, &input_path).await?;
    state
        .store
        .record_input_metadata(&job.job_id, downloaded.bytes.len() as u64, media.duration_sec)
        .await?;

    // Stage 4: transform.
    state
        .store
        .update_progress(&job.job_id, JobStatus::Processing, 40, Some("transforming"))
        .await?;
    let inpaint_client = if transform::InpaintClient::configured(&state.config.inpaint_backend_url) {
        state
            .config
            .inpaint_backend_url
            .clone()
            .map(|url| transform::InpaintClient::new(state.http.clone(), url))
    } else {
        None
    };
    let output_filename = ensure_mp4_extension(&downloaded.filename);
    let output_path = scratch.output_path(&output_filename);
    let outcome = transform::run(
        job.processing_mode,
        inpaint_client.as_ref(),
        &state.config.ffmpeg_binary,
        &input_path,
        &output_path,
        downloaded.bytes.clone(),
        media,
        job.crop_pixels,
        job.crop_position,
    )
    .await?;

    // Stage 5: upload.
    state
        .store
        .update_progress(&job.job_id, JobStatus::Processing, 70, Some("uploading"))
        .await?;
    let output_bytes = bytes::Bytes::from(tokio::fs::read(&output_path).await?);
    let output_size_bytes = output_bytes.len() as u64;
    let output_key = output_key(&job.job_id, &output_filename);
    state
        .blobs
        .put(Bucket::Processed, &output_key, output_bytes, "video/mp4")
        .await?;
    let output_url = state
        .blobs
        .presigned_get_url(Bucket::Processed, &output_key, PRESIGNED_URL_TTL)
        .await?;

    // Stage 6: finalize (the row write and ledger op happen on the
    // submitter's side of the callback; see `pipeline::callback`).
    state
        .store
        .update_progress(&job.job_id, JobStatus::Processing, 90, Some("finalizing"))
        .await?;

    Ok(JobOutcome::Completed {
        output_url,
        output_filename,
        output_size_bytes,
        processing_time_ms: started.elapsed().as_millis() as i64,
        effective_backend: outcome.backend,
    })
}

const PRESIGNED_URL_TTL: std::time::Duration = std::time::Duration::from_secs(24 * 3600);

async fn notify(state: &AppState, job: &Job, outcome: JobOutcome) {
    let mut job = job.clone();
    job.updated_at = Utc::now();
    match outcome {
        JobOutcome::Completed {
            output_url,
            output_filename,
            output_size_bytes,
            processing_time_ms,
            ..
        } => {
            job.status = JobStatus::Completed;
            job.progress = 100;
            job.output_url = Some(output_url);
            job.output_filename = Some(output_filename);
            job.output_size_bytes = Some(output_size_bytes);
            job.processing_time_ms = Some(processing_time_ms);
            job.completed_at = Some(job.updated_at);
        }
        JobOutcome::Failed {
            error_message,
            error_code,
        } => {
            job.status = JobStatus::Failed;
            job.error_message = Some(error_message);
            job.error_code = error_code;
            job.completed_at = Some(job.updated_at);
        }
    }
    state.notifier.notify(&job).await;
}

fn input_key(job_id: &JobId, filename: &str) -> String {
    format!("inputs/{job_id}/{filename}")
}

fn output_key(job_id: &JobId, filename: &str) -> String {
    format!("processed/{job_id}/{filename}")
}

/// The output is always re-encoded as mp4 (§4.2 step 5); swaps whatever
/// extension the source had for `.mp4` rather than appending a second one.
fn ensure_mp4_extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => format!("{stem}.mp4"),
        _ => format!("{filename}.mp4"),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn swaps_extension_for_mp4() {
        assert_eq!(ensure_mp4_extension("clip.mov"), "clip.mp4");
        assert_eq!(ensure_mp4_extension("clip.webm"), "clip.mp4");
        assert_eq!(ensure_mp4_extension("clip"), "clip.mp4");
        assert_eq!(ensure_mp4_extension(".hidden"), ".hidden.mp4");
    }

    #[test]
    fn keys_are_namespaced_by_job() {
        let id: JobId = "job_AAAAAAAAAAAA".parse().unwrap();
        assert_eq!(input_key(&id, "a.mp4"), "inputs/job_AAAAAAAAAAAA/a.mp4");
        assert_eq!(output_key(&id, "a.mp4"), "processed/job_AAAAAAAAAAAA/a.mp4");
    }
}
