mod callback;
mod jobs;
mod platforms;
mod status;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status::status))
        .route("/api/v1/platforms", get(platforms::list_platforms))
        .route("/api/v1/jobs", post(jobs::create_by_url))
        .route("/api/v1/jobs/upload", post(jobs::create_by_upload))
        .route("/api/v1/jobs/batch", post(jobs::create_batch))
        .route("/api/v1/jobs/:id", get(jobs::get_job).delete(jobs::cancel_job))
        .route("/api/v1/jobs/:id/download", get(jobs::download_job))
        .route(
            "/api/internal/jobs/:id/complete",
            post(callback::complete_job),
        )
        .with_state(state)
}
