//! Dependency probes the submitter declares to the Lifecycle Controller
//! (§4.3): the durable store and the work queue are both required.

use async_trait::async_trait;
use lifecycle::DependencyProbe;
use std::sync::Arc;

pub struct StoreProbe {
    pub pool: sqlx::PgPool,
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
        sqlx::query("SELECT 1")
            .execute(&self.pool)
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
