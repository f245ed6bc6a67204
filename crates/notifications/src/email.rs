//! Per-user email notification fan-out on terminal job states (§4.2
//! "Notification fan-out"). Templates follow the same wrapper-plus-partial
//! structure this codebase's own `notifications` crate uses for alert
//! emails, just with two terminal states (`completed`, `failed`) instead of
//! fired/resolved alert pairs.

use handlebars::Handlebars;
use models::{Job, JobStatus};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("template registration failed")]
    Template(#[from] handlebars::TemplateError),

    #[error("template render failed")]
    Render(#[from] handlebars::RenderError),

    #[error("mail provider request failed")]
    Request(#[source] reqwest::Error),

    #[error("mail provider returned status {0}")]
    ProviderStatus(reqwest::StatusCode),
}

#[derive(Debug, Clone, serde::Serialize)]
struct JobEmailContext<'a> {
    job_id: &'a str,
    input_filename: Option<&'a str>,
    output_url: Option<&'a str>,
    error_message: Option<&'a str>,
    processing_time_ms: Option<i64>,
}

impl<'a> JobEmailContext<'a> {
    fn for_job(job: &'a Job) -> Self {
        Self {
            job_id: job.job_id.as_str(),
            input_filename: job.input_filename.as_deref(),
            output_url: job.output_url.as_deref(),
            error_message: job.error_message.as_deref(),
            processing_time_ms: job.processing_time_ms,
        }
    }
}

pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

/// Owns the handlebars registry. Mirrors the teacher's `Renderer`: one
/// `Handlebars` instance, templates registered once at construction, a
/// `email_wrapper` partial every per-event template renders into.
pub struct Renderer {
    hb: Handlebars<'static>,
}

const WRAPPER: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family: Helvetica, Arial, sans-serif;">
  <div style="max-width: 560px; margin: 0 auto; padding: 20px;">
    {{> (lookup this "body_template_name")}}
    <p style="color: #888; font-size: 13px;">Job <code>{{job_id}}</code></p>
  </div>
</body>
</html>"#;

const COMPLETED_SUBJECT: &str = "Your video is ready";
const COMPLETED_BODY: &str = r#"<p>Your watermark removal job finished processing.</p>
{{#if output_url}}<p><a href="{{output_url}}">Download the result</a></p>{{/if}}"#;

const FAILED_SUBJECT: &str = "Your video could not be processed";
const FAILED_BODY: &str = r#"<p>We couldn't finish processing your video.</p>
{{#if error_message}}<p>{{error_message}}</p>{{/if}}"#;

impl Renderer {
    pub fn try_new() -> Result<Self, Error> {
        let mut hb = Handlebars::new();
        hb.set_strict_mode(true);
        hb.register_template_string("email_wrapper", WRAPPER)?;
        hb.register_template_string("completed-subject", COMPLETED_SUBJECT)?;
        hb.register_template_string("completed-body", COMPLETED_BODY)?;
        hb.register_template_string("failed-subject", FAILED_SUBJECT)?;
        hb.register_template_string("failed-body", FAILED_BODY)?;
        Ok(Self { hb })
    }

    /// Returns `None` when the status isn't one the caller should email for
    /// (only the two terminal outcomes the spec names carry a template).
    pub fn render(&self, job: &Job) -> Result<Option<RenderedEmail>, Error> {
        let body_template_name = match job.status {
            JobStatus::Completed => "completed-body",
            JobStatus::Failed => "failed-body",
            _ => return Ok(None),
        };
        let subject_template_name = match job.status {
            JobStatus::Completed => "completed-subject",
            JobStatus::Failed => "failed-subject",
            _ => unreachable!(),
        };

        #[derive(serde::Serialize)]
        struct Ctx<'a> {
            #[serde(flatten)]
            job: JobEmailContext<'a>,
            body_template_name: &'static str,
        }
        let ctx = Ctx {
            job: JobEmailContext::for_job(job),
            body_template_name,
        };

        let subject = self.hb.render(subject_template_name, &ctx)?;
        let body = self.hb.render("email_wrapper", &ctx)?;
        Ok(Some(RenderedEmail { subject, body }))
    }
}

/// The external mail collaborator (§1 "deliberately out of scope", exposed
/// through a stable HTTP interface): a provider accepting a JSON send
/// request. Errors are always logged by the caller and never block a job's
/// state transition.
#[derive(Clone)]
pub struct MailClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from_address: String,
}

#[derive(serde::Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

impl MailClient {
    pub fn new(http: reqwest::Client, api_url: String, api_key: String, from_address: String) -> Self {
        Self {
            http,
            api_url,
            api_key,
            from_address,
        }
    }

    pub async fn send(&self, to: &str, email: &RenderedEmail) -> Result<(), Error> {
        let request = SendRequest {
            from: &self.from_address,
            to,
            subject: &email.subject,
            html: &email.body,
        };
        let resp = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(Error::Request)?;
        if !resp.status().is_success() {
            return Err(Error::ProviderStatus(resp.status()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use models::{CropPosition, JobId, Platform, ProcessingMode};

    fn sample_job(status: JobStatus) -> Job {
        Job {
            job_id: JobId::generate(),
            user_id: uuid::Uuid::nil(),
            platform: Platform::Sora,
            processing_mode: ProcessingMode::Crop,
            crop_pixels: 120,
            crop_position: CropPosition::Bottom,
            input_url: "https://example.test/a.mp4".to_string(),
            input_blob_url: None,
            input_filename: Some("a.mp4".to_string()),
            input_size_bytes: None,
            input_duration_sec: None,
            status,
            progress: 100,
            current_step: None,
            started_at: None,
            completed_at: None,
            processing_time_ms: Some(1200),
            attempts: 1,
            output_url: Some("https://cdn.example.test/out.mp4".to_string()),
            output_filename: Some("out.mp4".to_string()),
            output_size_bytes: None,
            expires_at: None,
            error_message: Some("downloaded file is a webpage, not a video".to_string()),
            error_code: Some("CONTENT_NOT_VIDEO".to_string()),
            webhook_url: None,
            batch_id: None,
            metadata: Default::default(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn renders_completed_email_with_output_link() {
        let renderer = Renderer::try_new().unwrap();
        let email = renderer.render(&sample_job(JobStatus::Completed)).unwrap().unwrap();
        assert_eq!(email.subject, COMPLETED_SUBJECT);
        assert!(email.body.contains("out.mp4"));
    }

    #[test]
    fn renders_failed_email_with_error_message() {
        let renderer = Renderer::try_new().unwrap();
        let email = renderer.render(&sample_job(JobStatus::Failed)).unwrap().unwrap();
        assert_eq!(email.subject, FAILED_SUBJECT);
        assert!(email.body.contains("webpage"));
    }

    #[test]
    fn no_template_for_non_terminal_status() {
        let renderer = Renderer::try_new().unwrap();
        assert!(renderer.render(&sample_job(JobStatus::Processing)).unwrap().is_none());
    }
}
