//! Webhook fan-out on terminal job states (§4.2 "Webhook fan-out"). Delivery
//! is fire-and-forget: no retry, no at-least-once guarantee. Failures are
//! logged and must never block the caller's state transition.

use hmac::{Hmac, Mac};
use models::{Job, JobStatus};
use sha2::Sha256;

#[derive(Debug, Clone, serde::Serialize)]
pub struct WebhookPayload<'a> {
    pub job_id: &'a str,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

impl<'a> WebhookPayload<'a> {
    pub fn for_job(job: &'a Job) -> Self {
        Self {
            job_id: job.job_id.as_str(),
            status: job.status,
            output_url: job.output_url.as_deref(),
            processing_time_ms: job.processing_time_ms,
            error: job.error_message.as_deref(),
        }
    }
}

#[derive(Clone)]
pub struct WebhookSender {
    http: reqwest::Client,
    signing_secret: Option<String>,
}

impl WebhookSender {
    pub fn new(http: reqwest::Client, signing_secret: Option<String>) -> Self {
        Self {
            http,
            signing_secret,
        }
    }

    /// Delivers the payload if `job.webhook_url` is set and `job.status` is
    /// terminal. Never returns an error to the caller; failures are logged
    /// at `warn` and otherwise swallowed (§4.2, §7 "invisible to the user").
    pub async fn deliver(&self, job: &Job) {
        let Some(webhook_url) = job.webhook_url.as_deref() else {
            return;
        };
        if !job.status.is_terminal() {
            return;
        }

        let payload = WebhookPayload::for_job(job);
        let body = match serde_json::to_vec(&payload) {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(job_id = %job.job_id, error = %err, "failed to encode webhook payload");
                return;
            }
        };

        let mut req = self
            .http
            .post(webhook_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .timeout(std::time::Duration::from_secs(10));

        if let Some(secret) = &self.signing_secret {
            req = req.header("X-Webhook-Signature", sign(secret, &body));
        }

        match req.body(body).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!(job_id = %job.job_id, webhook_url, "webhook delivered");
            }
            Ok(resp) => {
                tracing::warn!(
                    job_id = %job.job_id,
                    webhook_url,
                    status = resp.status().as_u16(),
                    "webhook endpoint rejected delivery"
                );
            }
            Err(err) => {
                tracing::warn!(job_id = %job.job_id, webhook_url, error = %err, "webhook delivery failed");
            }
        }
    }
}

fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts a key of any length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod test {
    use super::*;
    use models::{CropPosition, Platform, ProcessingMode};

    fn sample_job(status: JobStatus, webhook_url: Option<&str>) -> Job {
        Job {
            job_id: "job_AAAAAAAAAAAA".parse().unwrap(),
            user_id: uuid::Uuid::nil(),
            platform: Platform::Sora,
            processing_mode: ProcessingMode::Crop,
            crop_pixels: 120,
            crop_position: CropPosition::Bottom,
            input_url: "https://example.test/a.mp4".to_string(),
            input_blob_url: None,
            input_filename: None,
            input_size_bytes: None,
            input_duration_sec: None,
            status,
            progress: if status == JobStatus::Completed { 100 } else { 0 },
            current_step: None,
            started_at: None,
            completed_at: None,
            processing_time_ms: None,
            attempts: 1,
            output_url: None,
            output_filename: None,
            output_size_bytes: None,
            expires_at: None,
            error_message: None,
            error_code: None,
            webhook_url: webhook_url.map(str::to_string),
            batch_id: None,
            metadata: Default::default(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn skips_delivery_when_no_webhook_configured() {
        let sender = WebhookSender::new(reqwest::Client::new(), None);
        // No HTTP call should be attempted; absence of a panic/hang is the assertion.
        sender.deliver(&sample_job(JobStatus::Completed, None)).await;
    }

    #[tokio::test]
    async fn skips_delivery_for_non_terminal_status() {
        let sender = WebhookSender::new(reqwest::Client::new(), None);
        sender
            .deliver(&sample_job(JobStatus::Processing, Some("http://127.0.0.1:1/hook")))
            .await;
    }

    #[test]
    fn signature_is_deterministic() {
        let a = sign("secret", b"payload");
        let b = sign("secret", b"payload");
        assert_eq!(a, b);
        assert_ne!(a, sign("other-secret", b"payload"));
    }
}
