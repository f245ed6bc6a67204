use crate::args::Args;
use async_trait::async_trait;
use lifecycle::Lifecycle;
use notifications::{CachedPreferences, EmailDirectory, NotificationFanout, PreferencesSource, WebhookSender};
use queue::WorkQueue;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use std::time::Duration;
use store::{BlobStore, Store};

/// Reads the `user_preferences` table the durable store owns. A missing row
/// means the user never opted out, so email notifications default to on.
pub struct PgPreferences {
    pool: PgPool,
}

impl PgPreferences {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferencesSource for PgPreferences {
    async fn email_enabled(&self, user_id: uuid::Uuid) -> anyhow::Result<bool> {
        let row = sqlx::query("SELECT email_notifications FROM user_preferences WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match row {
            Some(row) => row.try_get::<bool, _>("email_notifications")?,
            None => true,
        })
    }
}

/// Resolves a user's notification email address from the durable store's
/// `users` table.
pub struct PgEmailDirectory {
    pool: PgPool,
}

impl PgEmailDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmailDirectory for PgEmailDirectory {
    async fn email_for(&self, user_id: uuid::Uuid) -> anyhow::Result<Option<String>> {
        let row = sqlx::query("SELECT email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.try_get::<String, _>("email")).transpose()?)
    }
}

pub type Notifier = NotificationFanout<PgPreferences, PgEmailDirectory>;

/// Process-wide context object (mirrors the Submitter's `AppState`, §9):
/// every pipeline stage borrows from this instead of reaching into module
/// statics.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub blobs: Arc<dyn BlobStore>,
    pub queue: Arc<dyn WorkQueue>,
    pub notifier: Arc<Notifier>,
    pub http: reqwest::Client,
    pub lifecycle: Lifecycle,
    pub config: Arc<Config>,
}

pub struct Config {
    pub consumer_name: String,
    pub concurrency: usize,
    pub download: download::DownloadConfig,
    pub inpaint_backend_url: Option<String>,
    pub ffmpeg_binary: String,
    pub ffprobe_binary: String,
    pub submitter_callback_url: String,
    pub internal_callback_secret: Option<String>,
    pub webhook_signing_secret: Option<String>,
    pub retention_days: i64,
    pub max_attempts: u32,
    pub sweep_interval: Duration,
    pub stale_after: chrono::Duration,
    pub reclaim_idle: Duration,
    pub run_id: models::RunId,
    pub instance_id: String,
    pub build_version: String,
    pub build_commit: String,
    pub registry_url: Option<String>,
}

impl Config {
    pub fn from_args(args: &Args, instance_id: String) -> Self {
        let download = download::DownloadConfig {
            cli_fetcher_binary: Some(args.cli_fetcher_binary.clone()),
            extractor_binary: Some(args.extractor_binary.clone()),
            headless_browser_binary: args.headless_browser_binary.clone(),
            ..Default::default()
        };
        Self {
            consumer_name: instance_id.clone(),
            concurrency: args.concurrency.max(1),
            download,
            inpaint_backend_url: args.inpaint_backend_url.clone(),
            ffmpeg_binary: args.ffmpeg_binary.clone(),
            ffprobe_binary: args.ffprobe_binary.clone(),
            submitter_callback_url: args.submitter_callback_url.clone(),
            internal_callback_secret: args.internal_callback_secret.clone(),
            webhook_signing_secret: args.webhook_signing_secret.clone(),
            retention_days: args.retention_days,
            max_attempts: args.max_attempts,
            sweep_interval: Duration::from_secs(args.sweep_interval_secs),
            stale_after: chrono::Duration::seconds(args.stale_after_secs),
            reclaim_idle: Duration::from_secs(args.reclaim_idle_secs),
            run_id: models::RunId::generate(),
            instance_id,
            build_version: args.build_version.clone(),
            build_commit: args.build_commit.clone(),
            registry_url: args.registry_url.clone(),
        }
    }
}

pub fn capabilities_descriptor(config: &Config) -> models::CapabilitiesDescriptor {
    use models::{BuildInfo, DependencyDecl, FeatureValue, ProtocolInfo, ServiceLimits};
    use std::collections::BTreeMap;

    let mut feature_flags = BTreeMap::new();
    feature_flags.insert(
        "inpaint".to_string(),
        FeatureValue::Bool(download_inpaint_configured(config)),
    );
    feature_flags.insert("webhooks".to_string(), FeatureValue::Bool(true));
    feature_flags.insert("custom_crop".to_string(), FeatureValue::Bool(true));

    let mut dependencies = vec![
        DependencyDecl {
            name: "durable-store".to_string(),
            required: true,
            min_protocol_version: 1,
        },
        DependencyDecl {
            name: "work-queue".to_string(),
            required: true,
            min_protocol_version: 1,
        },
        DependencyDecl {
            name: "blob-store".to_string(),
            required: true,
            min_protocol_version: 1,
        },
    ];
    if config.inpaint_backend_url.is_some() {
        dependencies.push(DependencyDecl {
            name: "inpaint-backend".to_string(),
            required: false,
            min_protocol_version: 1,
        });
    }

    models::CapabilitiesDescriptor {
        schema_version: 1,
        service_name: "watermark-removal-worker".to_string(),
        run_id: models::RunId(config.run_id.0.clone()),
        instance_id: config.instance_id.clone(),
        build: BuildInfo {
            version: config.build_version.clone(),
            commit: config.build_commit.clone(),
            built_at: env!("CARGO_PKG_VERSION").to_string(),
        },
        protocol: ProtocolInfo {
            name: "watermark-removal-http".to_string(),
            version: 1,
        },
        endpoints: vec!["/diagnostics".to_string()],
        feature_flags,
        events_produced: vec!["job.completed".to_string(), "job.failed".to_string()],
        events_consumed: vec!["job.queued".to_string()],
        dependencies,
        limits: ServiceLimits {
            max_payload_bytes: 0,
            rate_limit_per_minute: 0,
            max_video_size_bytes: 0,
        },
    }
}

fn download_inpaint_configured(config: &Config) -> bool {
    transform::InpaintClient::configured(&config.inpaint_backend_url)
}
