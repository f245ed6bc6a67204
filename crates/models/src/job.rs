use crate::JobId;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A known source platform, used to resolve default crop parameters.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    TikTok,
    Sora,
    Pika,
    Runway,
    Custom,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::TikTok,
        Platform::Sora,
        Platform::Pika,
        Platform::Runway,
        Platform::Custom,
    ];

    /// Parses a platform name, falling back to `Custom` for anything unrecognized.
    pub fn resolve(name: &str) -> Platform {
        match name.to_ascii_lowercase().as_str() {
            "tiktok" => Platform::TikTok,
            "sora" => Platform::Sora,
            "pika" => Platform::Pika,
            "runway" => Platform::Runway,
            _ => Platform::Custom,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::TikTok => "tiktok",
            Platform::Sora => "sora",
            Platform::Pika => "pika",
            Platform::Runway => "runway",
            Platform::Custom => "custom",
        }
    }

    /// The closed preset table referenced by §3/§6. Defaults supply
    /// `crop_pixels`/`crop_position` unless the caller overrides them.
    pub fn preset(&self) -> PlatformPreset {
        let (crop_pixels, crop_position) = match self {
            Platform::TikTok => (140, CropPosition::Bottom),
            Platform::Sora => (120, CropPosition::Bottom),
            Platform::Pika => (50, CropPosition::Bottom),
            Platform::Runway => (80, CropPosition::Bottom),
            Platform::Custom => (0, CropPosition::Bottom),
        };
        PlatformPreset {
            platform: *self,
            crop_pixels,
            crop_position,
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct PlatformPreset {
    pub platform: Platform,
    pub crop_pixels: u32,
    pub crop_position: CropPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CropPosition {
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    Crop,
    Inpaint,
    Auto,
}

impl ProcessingMode {
    /// The credit cost for *requesting* this mode. The worker ultimately
    /// charges for the backend that actually ran (§4.2), which may differ
    /// from this when `Auto` falls through to crop.
    pub fn requested_cost(&self) -> u32 {
        match self {
            ProcessingMode::Inpaint => 2,
            ProcessingMode::Crop | ProcessingMode::Auto => 1,
        }
    }
}

/// The backend that actually produced the output, used to compute the
/// final credit charge (§4.2 "Charging rule").
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveBackend {
    Crop,
    Inpaint,
}

impl EffectiveBackend {
    pub fn cost(&self) -> u32 {
        match self {
            EffectiveBackend::Crop => 1,
            EffectiveBackend::Inpaint => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Validating,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Derived progress (J-invariants) for statuses that don't carry an
    /// explicit stored progress value.
    pub fn default_progress(&self) -> u8 {
        match self {
            JobStatus::Queued | JobStatus::Validating => 0,
            JobStatus::Processing => 50,
            JobStatus::Completed => 100,
            JobStatus::Failed | JobStatus::Cancelled => 0,
        }
    }
}

/// The central, durably-persisted job entity (§3).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub user_id: uuid::Uuid,

    pub platform: Platform,
    pub processing_mode: ProcessingMode,
    pub crop_pixels: u32,
    pub crop_position: CropPosition,

    pub input_url: String,
    pub input_blob_url: Option<String>,
    pub input_filename: Option<String>,
    pub input_size_bytes: Option<u64>,
    pub input_duration_sec: Option<f64>,

    pub status: JobStatus,
    pub progress: u8,
    pub current_step: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub processing_time_ms: Option<i64>,
    pub attempts: u32,

    pub output_url: Option<String>,
    pub output_filename: Option<String>,
    pub output_size_bytes: Option<u64>,
    pub expires_at: Option<DateTime<Utc>>,

    pub error_message: Option<String>,
    pub error_code: Option<String>,

    pub webhook_url: Option<String>,
    pub batch_id: Option<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Asserts the (J1)-(J3) invariants hold for a job that has reached a
    /// quiescent, terminal state. Used by tests and by the store layer
    /// before committing a terminal write.
    pub fn check_terminal_invariants(&self) -> Result<(), String> {
        match self.status {
            JobStatus::Completed => {
                if self.output_url.is_none() {
                    return Err("completed job missing output_url".into());
                }
                if self.output_filename.is_none() {
                    return Err("completed job missing output_filename".into());
                }
                if self.completed_at.is_none() {
                    return Err("completed job missing completed_at".into());
                }
                if self.progress != 100 {
                    return Err("completed job must have progress=100".into());
                }
            }
            JobStatus::Failed => {
                if self.error_message.is_none() {
                    return Err("failed job missing error_message".into());
                }
            }
            _ => {}
        }
        Ok(())
    }
}
