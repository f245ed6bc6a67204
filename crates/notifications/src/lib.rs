//! Terminal-state fan-out (§4.2 "Webhook fan-out" / "Notification
//! fan-out"): a worker calls `NotificationFanout::notify` exactly once per
//! terminal job transition. Both paths are best-effort; neither may ever
//! fail the caller's state transition.

pub mod email;
pub mod preferences;
pub mod webhook;

pub use email::{MailClient, Renderer as EmailRenderer};
pub use preferences::{CachedPreferences, PreferencesSource};
pub use webhook::WebhookSender;

use models::Job;

/// Resolves a user's notification email address. Kept separate from
/// `PreferencesSource` because the store's user lookup and the preference
/// flag may come from different tables/services in a real deployment.
#[async_trait::async_trait]
pub trait EmailDirectory: Send + Sync {
    async fn email_for(&self, user_id: uuid::Uuid) -> anyhow::Result<Option<String>>;
}

pub struct NotificationFanout<P, D> {
    webhook: WebhookSender,
    email_renderer: EmailRenderer,
    mail_client: MailClient,
    preferences: CachedPreferences<P>,
    directory: D,
}

impl<P: PreferencesSource, D: EmailDirectory> NotificationFanout<P, D> {
    pub fn new(
        webhook: WebhookSender,
        mail_client: MailClient,
        preferences: CachedPreferences<P>,
        directory: D,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            webhook,
            email_renderer: EmailRenderer::try_new()?,
            mail_client,
            preferences,
            directory,
        })
    }

    /// Delivers the webhook (if configured) and the preference-gated email
    /// (if enabled) for a job that just reached a terminal status. Every
    /// failure is logged and swallowed; this function never returns an
    /// error to the worker pipeline.
    pub async fn notify(&self, job: &Job) {
        self.webhook.deliver(job).await;

        if !self.preferences.email_enabled(job.user_id).await {
            return;
        }

        let Some(email) = (match self.email_renderer.render(job) {
            Ok(email) => email,
            Err(err) => {
                tracing::warn!(job_id = %job.job_id, error = %err, "failed to render notification email");
                return;
            }
        }) else {
            return;
        };

        let recipient = match self.directory.email_for(job.user_id).await {
            Ok(Some(address)) => address,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(job_id = %job.job_id, error = %err, "failed to resolve recipient email");
                return;
            }
        };

        if let Err(err) = self.mail_client.send(&recipient, &email).await {
            tracing::warn!(job_id = %job.job_id, error = %err, "failed to send notification email");
        }
    }
}
