//! Per-job scratch directory (§5 "Scoped resources"): exclusively owned by
//! the handling worker for the attempt, removed on every exit path. Backed
//! by `tempfile::TempDir`, whose `Drop` impl does the actual removal, so a
//! panic mid-pipeline still cleans up.

use models::JobId;
use std::path::{Path, PathBuf};

pub struct ScratchDir {
    dir: tempfile::TempDir,
}

impl ScratchDir {
    pub fn create(job_id: &JobId) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("watermark-{job_id}-"))
            .tempdir()?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn input_path(&self, filename: &str) -> PathBuf {
        self.dir.path().join(format!("input-{filename}"))
    }

    pub fn output_path(&self, filename: &str) -> PathBuf {
        self.dir.path().join(format!("output-{filename}"))
    }
}
