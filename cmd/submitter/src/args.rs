use derivative::Derivative;

/// Submitter is the HTTP front end of the watermark-removal job pipeline
/// (§4.1): authenticates, validates, reserves credits, enqueues work, and
/// serves job status/cancellation and the worker completion callback.
#[derive(Derivative, clap::Parser)]
#[derivative(Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// URL of the Postgres durable store.
    #[derivative(Debug = "ignore")]
    #[clap(long = "database-url", env = "DATABASE_URL")]
    pub database_url: String,

    /// Require TLS when connecting to the durable store.
    #[clap(long = "database-require-ssl", env = "DATABASE_REQUIRE_SSL")]
    pub database_require_ssl: bool,

    /// Redis connection string backing the work queue.
    #[derivative(Debug = "ignore")]
    #[clap(long = "redis-url", env = "REDIS_URL")]
    pub redis_url: String,

    /// S3-compatible bucket used for uploaded-input copies.
    #[clap(long = "inputs-bucket", env = "INPUTS_BUCKET")]
    pub inputs_bucket: String,

    /// S3-compatible bucket used for processed outputs.
    #[clap(long = "processed-bucket", env = "PROCESSED_BUCKET")]
    pub processed_bucket: String,

    /// Port to bind the HTTP API on.
    #[clap(long, default_value = "8080", env = "PORT")]
    pub port: u16,

    /// Origins to allow in CORS contexts. May be specified multiple times.
    #[clap(long = "cors-origin", env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Shared secret the worker must present when calling back to
    /// `/api/internal/jobs/:id/complete` in production (§6).
    #[derivative(Debug = "ignore")]
    #[clap(long = "internal-callback-secret", env = "INTERNAL_CALLBACK_SECRET")]
    pub internal_callback_secret: Option<String>,

    /// Maximum number of jobs accepted in a single batch submission (§4.1).
    #[clap(long = "max-batch-size", default_value = "20", env = "MAX_BATCH_SIZE")]
    pub max_batch_size: usize,

    /// Maximum accepted upload size in bytes (§6).
    #[clap(
        long = "max-upload-bytes",
        default_value = "524288000",
        env = "MAX_UPLOAD_BYTES"
    )]
    pub max_upload_bytes: u64,

    /// Days a completed output remains downloadable before expiry (§4.2).
    #[clap(long = "retention-days", default_value = "7", env = "RETENTION_DAYS")]
    pub retention_days: i64,

    /// Optional capabilities-registry URL to announce to (§4.3).
    #[clap(long = "registry-url", env = "REGISTRY_URL")]
    pub registry_url: Option<String>,

    /// Restricts accepted video URLs to this explicit allow-list of
    /// domains (§6 "Optional strict mode"). Empty means open.
    #[clap(long = "ssrf-allow-domain", env = "SSRF_ALLOW_DOMAINS", value_delimiter = ',')]
    pub ssrf_allow_domains: Vec<String>,

    /// Application build version, surfaced in the capabilities descriptor.
    #[clap(long = "build-version", default_value = "0.0.0", env = "BUILD_VERSION")]
    pub build_version: String,

    /// Application build commit, surfaced in the capabilities descriptor.
    #[clap(long = "build-commit", default_value = "unknown", env = "BUILD_COMMIT")]
    pub build_commit: String,
}
