//! Delivers the terminal outcome to the Submitter's internal callback
//! (§4.1 "Worker callback endpoint"). The Submitter owns the actual
//! ledger finalize/release; this module's retry loop just makes sure the
//! callback POST itself survives a flaky network hop before the worker
//! gives up and lets the durable row sit for the stale-job sweeper.

use crate::state::AppState;
use models::{CompleteJobCallback, JobId, JobOutcome};

const MAX_ATTEMPTS: u32 = 3;

pub async fn deliver(state: &AppState, job_id: &JobId, outcome: JobOutcome) {
    let body = CompleteJobCallback {
        job_id: job_id.clone(),
        outcome,
    };
    let url = format!(
        "{}/api/internal/jobs/{job_id}/complete",
        state.config.submitter_callback_url.trim_end_matches('/')
    );

    for attempt in 0..MAX_ATTEMPTS {
        let mut request = state.http.post(&url).json(&body).timeout(std::time::Duration::from_secs(15));
        if let Some(secret) = &state.config.internal_callback_secret {
            request = request.header("X-Internal-Secret", secret);
        }

        match request.send().await {
            Ok(resp) if resp.status().is_success() => return,
            Ok(resp) => {
                tracing::warn!(
                    %job_id,
                    attempt,
                    status = resp.status().as_u16(),
                    "submitter rejected completion callback"
                );
            }
            Err(err) => {
                tracing::warn!(%job_id, attempt, error = %err, "completion callback request failed");
            }
        }

        if attempt + 1 < MAX_ATTEMPTS {
            tokio::time::sleep(std::time::Duration::from_millis(200 * 2u64.pow(attempt))).await;
        }
    }

    tracing::error!(%job_id, "completion callback failed after all retries, durable row is now out of sync with the submitter's view");
}
