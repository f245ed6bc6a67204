mod args;
mod auth;
mod error;
mod probes;
mod routes;
mod state;
mod submit;

use args::Args;
use clap::Parser;
use lifecycle::{Announcer, DependencyProbe, Lifecycle, ProbeRegistry};
use state::{capabilities_descriptor, AppState, Config};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let args = Args::parse();
    tracing::info!(?args, "starting submitter");

    let instance_id = format!("{}:{}", hostname(), args.port);
    let config = Arc::new(Config::from_args(&args, instance_id));
    let lifecycle = Lifecycle::new("watermark-removal-submitter", config.run_id.clone());

    let pool = store::connect(&args.database_url, 10, args.database_require_ssl).await?;
    let store: Arc<dyn store::Store> = Arc::new(store::PgStore::new(pool.clone()));
    let ledger: Arc<dyn store::Ledger> = Arc::new(store::PgLedger::new(pool.clone()));
    let tokens: Arc<dyn store::TokenStore> = Arc::new(store::PgTokenStore::new(pool.clone()));
    let blobs: Arc<dyn store::BlobStore> = Arc::new(
        store::S3BlobStore::from_env(args.inputs_bucket.clone(), args.processed_bucket.clone()).await,
    );
    let queue: Arc<dyn queue::WorkQueue> = Arc::new(queue::RedisWorkQueue::connect(&args.redis_url).await?);

    let app_state = AppState {
        store,
        ledger,
        blobs,
        queue: queue.clone(),
        tokens,
        lifecycle: lifecycle.clone(),
        config: config.clone(),
    };

    let probes: Vec<Box<dyn DependencyProbe>> = vec![
        Box::new(probes::StoreProbe { pool: pool.clone() }),
        Box::new(probes::QueueProbe { queue: queue.clone() }),
    ];
    let probe_registry = Arc::new(ProbeRegistry::new(probes));

    let announcer = Announcer::new(reqwest::Client::new(), config.registry_url.clone());
    let descriptor = capabilities_descriptor(&config);
    announcer.announce(&descriptor, "startup").await;

    let capabilities_config = config.clone();
    let health_ctx = lifecycle::HealthContext {
        lifecycle: lifecycle.clone(),
        probes: probe_registry,
        capabilities: Arc::new(move || capabilities_descriptor(&capabilities_config)),
        announcer: Some(announcer.clone()),
    };

    let cors = if config.cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<axum::http::HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    };

    let app = lifecycle::health_router(health_ctx)
        .merge(routes::api_router(app_state))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port)).await?;
    tracing::info!(port = args.port, "submitter listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(lifecycle.clone(), announcer, config))
        .await?;

    Ok(())
}

async fn shutdown_signal(lifecycle: Lifecycle, announcer: Announcer, config: Arc<Config>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    lifecycle.transition(lifecycle::State::Stopping, "shutdown signal received");
    announcer.announce(&capabilities_descriptor(&config), "shutdown").await;
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}
