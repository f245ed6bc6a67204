//! Dependency probes for the Lifecycle Controller's readiness gate, plus
//! the bounded self-test suite behind `/diagnostics` (§4.3): queue ping,
//! durable-store query, blob-list, media-toolchain version, env-var
//! presence, scratch-dir writability. Only the worker exposes the latter.

use async_trait::async_trait;
use lifecycle::DiagnosticCheck;
use lifecycle::DependencyProbe;
use std::sync::Arc;
use store::{BlobStore, Bucket, Store};
use tokio::process::Command;

pub struct StoreProbe {
    pub store: Arc<dyn Store>,
}

#[async_trait]
impl DependencyProbe for StoreProbe {
    fn name(&self) -> &'static str {
        "durable-store"
    }
    fn required(&self) -> bool {
        true
    }
    async fn check(&self) -> Result<(), String> {
        // Any zero-cost read exercises the pool without depending on a
        // specific job existing.
        self.store
            .list_for_user(uuid::Uuid::nil(), 1)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

pub struct QueueProbe {
    pub queue: Arc<dyn queue::WorkQueue>,
}

#[async_trait]
impl DependencyProbe for QueueProbe {
    fn name(&self) -> &'static str {
        "work-queue"
    }
    fn required(&self) -> bool {
        true
    }
    async fn check(&self) -> Result<(), String> {
        self.queue
            .dead_letter_depth()
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

pub struct BlobProbe {
    pub blobs: Arc<dyn BlobStore>,
}

#[async_trait]
impl DependencyProbe for BlobProbe {
    fn name(&self) -> &'static str {
        "blob-store"
    }
    fn required(&self) -> bool {
        true
    }
    async fn check(&self) -> Result<(), String> {
        // A presign of a key that need not exist still round-trips through
        // the client's credentials and bucket configuration.
        self.blobs
            .presigned_get_url(Bucket::Inputs, "diagnostics/probe", std::time::Duration::from_secs(60))
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Checks the durable store round-trips, independent of readiness debounce.
pub struct StoreDiagnostic {
    pub store: Arc<dyn Store>,
}

#[async_trait]
impl DiagnosticCheck for StoreDiagnostic {
    fn name(&self) -> &'static str {
        "durable-store-query"
    }
    async fn run(&self) -> Result<(), String> {
        self.store
            .list_for_user(uuid::Uuid::nil(), 1)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

pub struct QueueDiagnostic {
    pub queue: Arc<dyn queue::WorkQueue>,
}

#[async_trait]
impl DiagnosticCheck for QueueDiagnostic {
    fn name(&self) -> &'static str {
        "queue-ping"
    }
    async fn run(&self) -> Result<(), String> {
        self.queue
            .dead_letter_depth()
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

pub struct BlobDiagnostic {
    pub blobs: Arc<dyn BlobStore>,
}

#[async_trait]
impl DiagnosticCheck for BlobDiagnostic {
    fn name(&self) -> &'static str {
        "blob-list"
    }
    async fn run(&self) -> Result<(), String> {
        self.blobs
            .presigned_get_url(Bucket::Processed, "diagnostics/probe", std::time::Duration::from_secs(60))
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Shells out to the configured media toolchain binaries with `-version`,
/// so a broken/missing ffmpeg-class install surfaces here instead of as a
/// mid-job `TOOLCHAIN_FAILED` surprise.
pub struct ToolchainDiagnostic {
    pub ffmpeg_binary: String,
    pub ffprobe_binary: String,
}

#[async_trait]
impl DiagnosticCheck for ToolchainDiagnostic {
    fn name(&self) -> &'static str {
        "media-toolchain-version"
    }
    async fn run(&self) -> Result<(), String> {
        for binary in [&self.ffmpeg_binary, &self.ffprobe_binary] {
            let status = Command::new(binary)
                .arg("-version")
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .status()
                .await
                .map_err(|e| format!("{binary}: {e}"))?;
            if !status.success() {
                return Err(format!("{binary} -version exited with {status}"));
            }
        }
        Ok(())
    }
}

/// Confirms the process can actually carve out and write to a per-job
/// scratch directory the way every pipeline run will.
pub struct ScratchDirDiagnostic;

#[async_trait]
impl DiagnosticCheck for ScratchDirDiagnostic {
    fn name(&self) -> &'static str {
        "scratch-dir-writable"
    }
    async fn run(&self) -> Result<(), String> {
        let dir = tempfile::Builder::new()
            .prefix("watermark-diagnostic-")
            .tempdir()
            .map_err(|e| e.to_string())?;
        tokio::fs::write(dir.path().join("probe"), b"ok")
            .await
            .map_err(|e| e.to_string())
    }
}

/// Confirms the handful of env vars with no safe default were actually
/// supplied, rather than letting a blank string silently reach a stage.
pub struct RequiredConfigDiagnostic {
    pub submitter_callback_url: String,
    pub database_url: String,
    pub redis_url: String,
}

#[async_trait]
impl DiagnosticCheck for RequiredConfigDiagnostic {
    fn name(&self) -> &'static str {
        "required-config-present"
    }
    async fn run(&self) -> Result<(), String> {
        let missing: Vec<&str> = [
            ("submitter-callback-url", &self.submitter_callback_url),
            ("database-url", &self.database_url),
            ("redis-url", &self.redis_url),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("missing required config: {}", missing.join(", ")))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn scratch_dir_diagnostic_passes_on_a_writable_filesystem() {
        assert!(ScratchDirDiagnostic.run().await.is_ok());
    }

    #[tokio::test]
    async fn required_config_diagnostic_flags_blank_values() {
        let check = RequiredConfigDiagnostic {
            submitter_callback_url: "https://submitter.internal".to_string(),
            database_url: String::new(),
            redis_url: "redis://localhost".to_string(),
        };
        let err = check.run().await.unwrap_err();
        assert!(err.contains("database-url"));
        assert!(!err.contains("redis-url"));
    }

    #[tokio::test]
    async fn required_config_diagnostic_passes_when_all_set() {
        let check = RequiredConfigDiagnostic {
            submitter_callback_url: "https://submitter.internal".to_string(),
            database_url: "postgres://localhost/db".to_string(),
            redis_url: "redis://localhost".to_string(),
        };
        assert!(check.run().await.is_ok());
    }
}
