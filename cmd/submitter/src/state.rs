use crate::args::Args;
use lifecycle::Lifecycle;
use queue::WorkQueue;
use std::sync::Arc;
use store::{BlobStore, Ledger, Store, TokenStore};

/// Process-wide context object (§9 "module-scoped mutable state" →
/// explicit context): every handler borrows from this instead of reaching
/// into module statics.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub ledger: Arc<dyn Ledger>,
    pub blobs: Arc<dyn BlobStore>,
    pub queue: Arc<dyn WorkQueue>,
    pub tokens: Arc<dyn TokenStore>,
    pub lifecycle: Lifecycle,
    pub config: Arc<Config>,
}

pub struct Config {
    pub max_batch_size: usize,
    pub max_upload_bytes: u64,
    pub retention_days: i64,
    pub internal_callback_secret: Option<String>,
    pub ssrf_policy: netguard::Policy,
    pub run_id: models::RunId,
    pub instance_id: String,
    pub build_version: String,
    pub build_commit: String,
    pub cors_origins: Vec<String>,
    pub registry_url: Option<String>,
}

impl Config {
    pub fn from_args(args: &Args, instance_id: String) -> Self {
        let ssrf_policy = if args.ssrf_allow_domains.is_empty() {
            netguard::Policy::open()
        } else {
            netguard::Policy::strict(args.ssrf_allow_domains.clone())
        };
        Self {
            max_batch_size: args.max_batch_size,
            max_upload_bytes: args.max_upload_bytes,
            retention_days: args.retention_days,
            internal_callback_secret: args.internal_callback_secret.clone(),
            ssrf_policy,
            run_id: models::RunId::generate(),
            instance_id,
            build_version: args.build_version.clone(),
            build_commit: args.build_commit.clone(),
            cors_origins: args.cors_origins.clone(),
            registry_url: args.registry_url.clone(),
        }
    }
}

pub fn capabilities_descriptor(config: &Config) -> models::CapabilitiesDescriptor {
    use models::{BuildInfo, DependencyDecl, FeatureValue, ProtocolInfo, ServiceLimits};
    use std::collections::BTreeMap;

    let mut feature_flags = BTreeMap::new();
    feature_flags.insert("inpaint".to_string(), FeatureValue::Bool(true));
    feature_flags.insert("webhooks".to_string(), FeatureValue::Bool(true));
    feature_flags.insert("custom_crop".to_string(), FeatureValue::Bool(true));

    models::CapabilitiesDescriptor {
        schema_version: 1,
        service_name: "watermark-removal-submitter".to_string(),
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
        endpoints: vec![
            "/api/v1/jobs".to_string(),
            "/api/v1/jobs/upload".to_string(),
            "/api/v1/jobs/batch".to_string(),
            "/api/v1/jobs/:id".to_string(),
            "/api/v1/jobs/:id/download".to_string(),
            "/api/v1/platforms".to_string(),
        ],
        feature_flags,
        events_produced: vec!["job.queued".to_string()],
        events_consumed: vec!["job.completed".to_string(), "job.failed".to_string()],
        dependencies: vec![
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
        ],
        limits: ServiceLimits {
            max_payload_bytes: config.max_upload_bytes,
            rate_limit_per_minute: 120,
            max_video_size_bytes: config.max_upload_bytes,
        },
    }
}
