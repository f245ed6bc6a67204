//! Wire-format request/response bodies for the Submitter's HTTP surface (§6).

use crate::{CropPosition, EffectiveBackend, JobId, JobStatus, Platform, ProcessingMode};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SubmitJobRequest {
    pub video_url: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub processing_mode: Option<ProcessingMode>,
    #[serde(default)]
    pub crop_pixels: Option<u32>,
    #[serde(default)]
    pub crop_position: Option<CropPosition>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct BatchSubmitRequest {
    pub jobs: Vec<SubmitJobRequest>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SubmitJobResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub crop_pixels: u32,
    pub crop_position: CropPosition,
    pub credits_charged: u32,
    pub created_at: DateTime<Utc>,
    pub estimated_completion: DateTime<Utc>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct JobDescriptorResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    pub current_step: Option<String>,
    pub platform: Platform,
    pub processing_mode: ProcessingMode,
    pub input_url: String,
    pub output_url: Option<String>,
    pub output_filename: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub processing_time_ms: Option<i64>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DownloadResponse {
    pub output_url: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Payload the worker posts back to `/api/internal/jobs/:id/complete` (§4.1).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CompleteJobCallback {
    pub job_id: JobId,
    pub outcome: JobOutcome,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Completed {
        output_url: String,
        output_filename: String,
        output_size_bytes: u64,
        processing_time_ms: i64,
        /// The backend that actually produced the output, used to compute
        /// the final charge (§4.2 "Charging rule") regardless of what
        /// `processing_mode` was requested.
        effective_backend: EffectiveBackend,
    },
    Failed {
        error_message: String,
        error_code: Option<String>,
    },
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PlatformDescriptor {
    pub platform: Platform,
    pub crop_pixels: u32,
    pub crop_position: CropPosition,
}
