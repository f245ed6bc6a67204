use derivative::Derivative;

/// Worker dequeues jobs and runs the claim → download → probe → transform →
/// upload → finalize pipeline (§4.2), reporting terminal outcomes back to
/// the Submitter's internal callback.
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

    /// S3-compatible bucket holding original input copies.
    #[clap(long = "inputs-bucket", env = "INPUTS_BUCKET")]
    pub inputs_bucket: String,

    /// S3-compatible bucket holding processed outputs.
    #[clap(long = "processed-bucket", env = "PROCESSED_BUCKET")]
    pub processed_bucket: String,

    /// Number of jobs this process handles concurrently (§5).
    #[clap(long, default_value = "2", env = "WORKER_CONCURRENCY")]
    pub concurrency: usize,

    /// Base URL of the AI inpaint backend. Absent or containing `localhost`
    /// forces `auto`/`inpaint` jobs to fall back to crop (§6).
    #[clap(long = "inpaint-backend-url", env = "INPAINT_BACKEND_URL")]
    pub inpaint_backend_url: Option<String>,

    /// Media-toolchain binary used for cropping (ffmpeg-class).
    #[clap(long = "ffmpeg-binary", default_value = "ffmpeg", env = "FFMPEG_BINARY")]
    pub ffmpeg_binary: String,

    /// Media-toolchain binary used for probing (ffprobe-class).
    #[clap(long = "ffprobe-binary", default_value = "ffprobe", env = "FFPROBE_BINARY")]
    pub ffprobe_binary: String,

    /// CLI fetcher binary for download strategy 2 (cURL-class).
    #[clap(long = "cli-fetcher-binary", default_value = "curl", env = "CLI_FETCHER_BINARY")]
    pub cli_fetcher_binary: String,

    /// Video-extractor binary for download strategy 3 (yt-dlp-class).
    #[clap(long = "extractor-binary", default_value = "yt-dlp", env = "EXTRACTOR_BINARY")]
    pub extractor_binary: String,

    /// Headless-browser binary for download strategy 4. Absent skips that
    /// strategy entirely.
    #[clap(long = "headless-browser-binary", env = "HEADLESS_BROWSER_BINARY")]
    pub headless_browser_binary: Option<String>,

    /// Base URL of the Submitter, used to reach the internal completion
    /// callback (§4.1, §4.2).
    #[clap(long = "submitter-callback-url", env = "SUBMITTER_CALLBACK_URL")]
    pub submitter_callback_url: String,

    /// Shared secret sent as `Authorization: Bearer <secret>` when calling
    /// the Submitter's internal callback in production (§6).
    #[derivative(Debug = "ignore")]
    #[clap(long = "internal-callback-secret", env = "INTERNAL_CALLBACK_SECRET")]
    pub internal_callback_secret: Option<String>,

    /// Days a completed output remains downloadable before expiry (§4.2).
    #[clap(long = "retention-days", default_value = "7", env = "RETENTION_DAYS")]
    pub retention_days: i64,

    /// Maximum delivery attempts before a job is moved to the dead letter
    /// stream or swept as permanently stale (§4.1, §6).
    #[clap(long = "max-attempts", default_value = "3", env = "MAX_ATTEMPTS")]
    pub max_attempts: u32,

    /// How often the stale-job sweeper and queue-reclaim loop run (§4.3).
    #[clap(long = "sweep-interval-secs", default_value = "30", env = "SWEEP_INTERVAL_SECS")]
    pub sweep_interval_secs: u64,

    /// A non-terminal job untouched for this long is considered stale and
    /// re-enqueued (or failed out, if attempts are exhausted) (§4.3).
    #[clap(long = "stale-after-secs", default_value = "900", env = "STALE_AFTER_SECS")]
    pub stale_after_secs: i64,

    /// Idle time before a stream entry held by a crashed consumer is
    /// reclaimed by another worker (§4.1 queue semantics).
    #[clap(long = "reclaim-idle-secs", default_value = "120", env = "RECLAIM_IDLE_SECS")]
    pub reclaim_idle_secs: u64,

    /// Optional signing secret added as `X-Webhook-Signature` on outbound
    /// webhook deliveries (§9, additive beyond the spec's minimum).
    #[derivative(Debug = "ignore")]
    #[clap(long = "webhook-signing-secret", env = "WEBHOOK_SIGNING_SECRET")]
    pub webhook_signing_secret: Option<String>,

    /// HTTP endpoint of the external transactional-mail provider.
    #[clap(long = "mail-api-url", env = "MAIL_API_URL")]
    pub mail_api_url: Option<String>,

    /// API key for the mail provider.
    #[derivative(Debug = "ignore")]
    #[clap(long = "mail-api-key", env = "MAIL_API_KEY")]
    pub mail_api_key: Option<String>,

    /// From-address used on outbound notification emails.
    #[clap(long = "mail-from-address", default_value = "noreply@example.test", env = "MAIL_FROM_ADDRESS")]
    pub mail_from_address: String,

    /// Port the worker's diagnostics/health endpoints bind to.
    #[clap(long, default_value = "8081", env = "PORT")]
    pub port: u16,

    /// Optional capabilities-registry URL to announce to (§4.3).
    #[clap(long = "registry-url", env = "REGISTRY_URL")]
    pub registry_url: Option<String>,

    /// Application build version, surfaced in the capabilities descriptor.
    #[clap(long = "build-version", default_value = "0.0.0", env = "BUILD_VERSION")]
    pub build_version: String,

    /// Application build commit, surfaced in the capabilities descriptor.
    #[clap(long = "build-commit", default_value = "unknown", env = "BUILD_COMMIT")]
    pub build_commit: String,
}
