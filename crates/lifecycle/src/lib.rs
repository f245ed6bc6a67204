//! The Lifecycle & Health Controller (§4.3), embedded in both the
//! Submitter and the Worker: the `starting → ready ⇄ degraded → stopping →
//! stopped|crashed` state machine, per-dependency debounced health probing,
//! capabilities announcement, and the axum router exposing the health
//! endpoints.

pub mod announce;
pub mod probe;
pub mod router;
mod state;

pub use announce::Announcer;
pub use probe::{DependencyCheck, DependencyProbe, DependencyState, ProbeRegistry};
pub use router::{diagnostics_router, health_router, DiagnosticCheck, DiagnosticResult, DiagnosticsReport, HealthContext, Verdict};
pub use state::{Lifecycle, State};
