//! The axum router fragment shared by both the Submitter and the Worker
//! (§4.3, §6): `/healthz`, `/readyz`, `/capabilities`, and an optional
//! `/diagnostics` for processes that run self-tests.

use crate::announce::Announcer;
use crate::probe::ProbeRegistry;
use crate::state::{Lifecycle, State as LifecycleState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use models::CapabilitiesDescriptor;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct HealthContext {
    pub lifecycle: Lifecycle,
    pub probes: Arc<ProbeRegistry>,
    pub capabilities: Arc<dyn Fn() -> CapabilitiesDescriptor + Send + Sync>,
    /// When set, a transition into `ready` triggers a capabilities
    /// announcement (§4.3 "on entering ready"). `None` for processes that
    /// don't announce (none currently, but kept optional for testability).
    pub announcer: Option<Announcer>,
}

/// An optional bounded self-test suite (§4.3 "Diagnostics"): queue ping,
/// durable-store query, blob-list, media-toolchain version, env-var
/// presence, scratch-dir writability. Only the worker wires this up.
#[async_trait::async_trait]
pub trait DiagnosticCheck: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DiagnosticResult {
    pub name: &'static str,
    pub verdict: Verdict,
    pub latency_ms: u64,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DiagnosticsReport {
    pub verdict: Verdict,
    pub checks: Vec<DiagnosticResult>,
}

pub fn health_router(ctx: HealthContext) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/capabilities", get(capabilities))
        .with_state(ctx)
}

/// Adds `/diagnostics` to a router already carrying `HealthContext`, for
/// processes (the worker) that run self-tests. `checks` is boxed once at
/// startup and shared behind an `Arc`.
pub fn diagnostics_router(checks: Arc<Vec<Box<dyn DiagnosticCheck>>>) -> Router {
    Router::new()
        .route("/diagnostics", get(diagnostics))
        .with_state(checks)
}

#[derive(serde::Serialize)]
struct LivenessBody {
    state: &'static str,
    uptime_ms: u64,
}

async fn healthz(State(ctx): State<HealthContext>) -> Json<LivenessBody> {
    Json(LivenessBody {
        state: ctx.lifecycle.state().as_str(),
        uptime_ms: ctx.lifecycle.uptime().as_millis() as u64,
    })
}

#[derive(serde::Serialize)]
struct ReadinessBody {
    state: &'static str,
    checks: Vec<crate::probe::DependencyCheck>,
}

async fn readyz(State(ctx): State<HealthContext>) -> impl IntoResponse {
    let checks = ctx.probes.run().await;
    let all_up = ProbeRegistry::all_required_up(&checks);

    // Readiness probing only ever moves the machine between
    // starting/ready/degraded; stopping/stopped/crashed are driven by the
    // process lifecycle itself and must not be overridden by a probe tick.
    if matches!(
        ctx.lifecycle.state(),
        LifecycleState::Starting | LifecycleState::Ready | LifecycleState::Degraded
    ) {
        let next_state = if all_up {
            LifecycleState::Ready
        } else {
            LifecycleState::Degraded
        };
        let entered_ready = ctx.lifecycle.transition(
            next_state,
            if all_up {
                "all required dependencies up"
            } else {
                "a required dependency is down"
            },
        ) && next_state == LifecycleState::Ready;

        if entered_ready {
            if let Some(announcer) = &ctx.announcer {
                announcer.announce(&(ctx.capabilities)(), "ready").await;
            }
        }
    }

    let status = if ctx.lifecycle.state() == LifecycleState::Ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = ReadinessBody {
        state: ctx.lifecycle.state().as_str(),
        checks,
    };
    (status, Json(body))
}

#[derive(serde::Serialize)]
struct CapabilitiesBody {
    #[serde(flatten)]
    descriptor: CapabilitiesDescriptor,
    state: &'static str,
    uptime_ms: u64,
}

async fn capabilities(State(ctx): State<HealthContext>) -> Json<CapabilitiesBody> {
    Json(CapabilitiesBody {
        descriptor: (ctx.capabilities)(),
        state: ctx.lifecycle.state().as_str(),
        uptime_ms: ctx.lifecycle.uptime().as_millis() as u64,
    })
}

async fn diagnostics(
    State(checks): State<Arc<Vec<Box<dyn DiagnosticCheck>>>>,
) -> Json<DiagnosticsReport> {
    let mut results = Vec::with_capacity(checks.len());
    let mut overall = Verdict::Pass;

    for check in checks.iter() {
        let started = std::time::Instant::now();
        let outcome = tokio::time::timeout(Duration::from_secs(10), check.run()).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let (verdict, detail) = match outcome {
            Ok(Ok(())) => (Verdict::Pass, None),
            Ok(Err(detail)) => (Verdict::Fail, Some(detail)),
            Err(_) => (Verdict::Fail, Some("timed out".to_string())),
        };
        if verdict == Verdict::Fail {
            overall = Verdict::Fail;
        } else if verdict == Verdict::Warn && overall == Verdict::Pass {
            overall = Verdict::Warn;
        }

        results.push(DiagnosticResult {
            name: check.name(),
            verdict,
            latency_ms,
            detail,
        });
    }

    Json(DiagnosticsReport {
        verdict: overall,
        checks: results,
    })
}
