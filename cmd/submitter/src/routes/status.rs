//! `GET /status` (§6): an aggregate view for dashboards/ops, distinct from
//! the machine-checkable `/healthz`/`/readyz` pair.

use crate::state::AppState;
use axum::extract::State;
use axum::response::Json;

#[derive(serde::Serialize)]
struct StatusBody {
    state: &'static str,
    uptime_ms: u64,
    dead_letter_depth: u64,
    instance_id: String,
    build_version: String,
    build_commit: String,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusBody> {
    let dead_letter_depth = state.queue.dead_letter_depth().await.unwrap_or(0);
    Json(StatusBody {
        state: state.lifecycle.state().as_str(),
        uptime_ms: state.lifecycle.uptime().as_millis() as u64,
        dead_letter_depth,
        instance_id: state.config.instance_id.clone(),
        build_version: state.config.build_version.clone(),
        build_commit: state.config.build_commit.clone(),
    })
}
