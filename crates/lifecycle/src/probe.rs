//! Per-dependency debounce (§4.3): a dependency flips `down → up` only
//! after two consecutive successes, and `up → down` only after two
//! consecutive failures. Single flaky probes are absorbed without moving
//! the overall state machine.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

const DEBOUNCE_THRESHOLD: u32 = 2;

#[async_trait]
pub trait DependencyProbe: Send + Sync {
    fn name(&self) -> &'static str;
    fn required(&self) -> bool;
    async fn check(&self) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyState {
    Up,
    Down,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DependencyCheck {
    pub name: &'static str,
    pub required: bool,
    pub state: DependencyState,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

struct Debounce {
    state: DependencyState,
    consecutive_successes: u32,
    consecutive_failures: u32,
    last_error: Option<String>,
}

impl Default for Debounce {
    fn default() -> Self {
        Self {
            // A dependency starts "down" until it has proven itself up;
            // this keeps `ready` from being reachable before any probe runs.
            state: DependencyState::Down,
            consecutive_successes: 0,
            consecutive_failures: 0,
            last_error: None,
        }
    }
}

pub struct ProbeRegistry {
    probes: Vec<Box<dyn DependencyProbe>>,
    debounce: Mutex<BTreeMap<&'static str, Debounce>>,
}

impl ProbeRegistry {
    pub fn new(probes: Vec<Box<dyn DependencyProbe>>) -> Self {
        Self {
            probes,
            debounce: Mutex::new(BTreeMap::new()),
        }
    }

    /// Runs every declared probe once, updates each dependency's debounce
    /// counters, and returns the resulting per-dependency checks.
    pub async fn run(&self) -> Vec<DependencyCheck> {
        let mut results = Vec::with_capacity(self.probes.len());
        for probe in &self.probes {
            let outcome = probe.check().await;
            let check = self.record(probe.as_ref(), outcome);
            results.push(check);
        }
        results
    }

    fn record(&self, probe: &dyn DependencyProbe, outcome: Result<(), String>) -> DependencyCheck {
        let mut guard = self.debounce.lock().unwrap();
        let entry = guard.entry(probe.name()).or_default();

        match outcome {
            Ok(()) => {
                entry.consecutive_failures = 0;
                entry.consecutive_successes += 1;
                entry.last_error = None;
                if entry.consecutive_successes >= DEBOUNCE_THRESHOLD {
                    entry.state = DependencyState::Up;
                }
            }
            Err(err) => {
                entry.consecutive_successes = 0;
                entry.consecutive_failures += 1;
                entry.last_error = Some(err);
                if entry.consecutive_failures >= DEBOUNCE_THRESHOLD {
                    entry.state = DependencyState::Down;
                }
            }
        }

        DependencyCheck {
            name: probe.name(),
            required: probe.required(),
            state: entry.state,
            consecutive_failures: entry.consecutive_failures,
            last_error: entry.last_error.clone(),
        }
    }

    /// Whether every *required* dependency is currently up, for computing
    /// the overall `ready`/`degraded` transition.
    pub fn all_required_up(checks: &[DependencyCheck]) -> bool {
        checks
            .iter()
            .filter(|c| c.required)
            .all(|c| c.state == DependencyState::Up)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyProbe {
        call_count: AtomicUsize,
        fail_on_calls: Vec<usize>,
    }

    #[async_trait]
    impl DependencyProbe for FlakyProbe {
        fn name(&self) -> &'static str {
            "flaky"
        }
        fn required(&self) -> bool {
            true
        }
        async fn check(&self) -> Result<(), String> {
            let call = self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_calls.contains(&call) {
                Err("simulated failure".to_string())
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn requires_two_consecutive_successes_to_flip_up() {
        let registry = ProbeRegistry::new(vec![Box::new(FlakyProbe {
            call_count: AtomicUsize::new(0),
            fail_on_calls: vec![],
        })]);

        let first = registry.run().await;
        assert_eq!(first[0].state, DependencyState::Down);

        let second = registry.run().await;
        assert_eq!(second[0].state, DependencyState::Up);
    }

    #[tokio::test]
    async fn single_failure_does_not_flip_an_up_dependency_down() {
        let registry = ProbeRegistry::new(vec![Box::new(FlakyProbe {
            call_count: AtomicUsize::new(0),
            fail_on_calls: vec![2],
        })]);

        registry.run().await;
        let checks = registry.run().await;
        assert_eq!(checks[0].state, DependencyState::Up);

        // Third call fails once; a single failure shouldn't flip it down.
        let checks = registry.run().await;
        assert_eq!(checks[0].state, DependencyState::Up);
    }
}
