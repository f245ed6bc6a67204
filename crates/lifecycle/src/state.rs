//! The process-wide lifecycle state machine (§4.3): `starting → ready ⇄
//! degraded → stopping → stopped | crashed`. Every transition emits a
//! structured log record carrying the run ID and process uptime.

use models::RunId;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    Starting,
    Ready,
    Degraded,
    Stopping,
    Stopped,
    Crashed,
}

impl State {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => State::Starting,
            1 => State::Ready,
            2 => State::Degraded,
            3 => State::Stopping,
            4 => State::Stopped,
            _ => State::Crashed,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            State::Starting => 0,
            State::Ready => 1,
            State::Degraded => 2,
            State::Stopping => 3,
            State::Stopped => 4,
            State::Crashed => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            State::Starting => "starting",
            State::Ready => "ready",
            State::Degraded => "degraded",
            State::Stopping => "stopping",
            State::Stopped => "stopped",
            State::Crashed => "crashed",
        }
    }
}

/// Shared, cheaply-cloneable handle to the process's lifecycle state.
#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<Inner>,
}

struct Inner {
    service_name: &'static str,
    run_id: RunId,
    started_at: Instant,
    state: AtomicU8,
}

impl Lifecycle {
    pub fn new(service_name: &'static str, run_id: RunId) -> Self {
        let lifecycle = Self {
            inner: Arc::new(Inner {
                service_name,
                run_id,
                started_at: Instant::now(),
                state: AtomicU8::new(State::Starting.to_u8()),
            }),
        };
        lifecycle.log_transition("startup", State::Starting, State::Starting, "process starting");
        lifecycle
    }

    pub fn state(&self) -> State {
        State::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.inner.started_at.elapsed()
    }

    pub fn run_id(&self) -> &RunId {
        &self.inner.run_id
    }

    /// Transitions to `next` if it differs from the current state, logging
    /// a structured record either way is wasteful, so only transitions
    /// that change state are logged. Returns whether the state actually
    /// changed, so callers can gate one-shot side effects (e.g. a
    /// capabilities announcement) on a real transition.
    pub fn transition(&self, next: State, reason: &str) -> bool {
        let previous = State::from_u8(self.inner.state.swap(next.to_u8(), Ordering::SeqCst));
        let changed = previous != next;
        if changed {
            self.log_transition("state_change", previous, next, reason);
        }
        changed
    }

    fn log_transition(&self, event: &str, previous: State, next: State, reason: &str) {
        tracing::info!(
            target: "lifecycle",
            service = self.inner.service_name,
            event,
            state = next.as_str(),
            previous_state = previous.as_str(),
            reason,
            run_id = %self.inner.run_id,
            uptime_ms = self.uptime().as_millis() as u64,
            "lifecycle transition"
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn starts_in_starting_state() {
        let lifecycle = Lifecycle::new("test-service", RunId::generate());
        assert_eq!(lifecycle.state(), State::Starting);
    }

    #[test]
    fn transition_updates_state() {
        let lifecycle = Lifecycle::new("test-service", RunId::generate());
        lifecycle.transition(State::Ready, "dependencies healthy");
        assert_eq!(lifecycle.state(), State::Ready);
    }

    #[test]
    fn repeated_transition_to_same_state_is_a_no_op() {
        let lifecycle = Lifecycle::new("test-service", RunId::generate());
        lifecycle.transition(State::Ready, "first");
        lifecycle.transition(State::Ready, "second");
        assert_eq!(lifecycle.state(), State::Ready);
    }
}
