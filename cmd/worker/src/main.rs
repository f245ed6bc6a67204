mod args;
mod error;
mod pipeline;
mod probes;
mod state;

use args::Args;
use clap::Parser;
use lifecycle::{Announcer, DependencyProbe, Lifecycle, ProbeRegistry};
use notifications::{CachedPreferences, MailClient, NotificationFanout, WebhookSender};
use state::{capabilities_descriptor, AppState, Config, PgEmailDirectory, PgPreferences};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

const PREFERENCES_CACHE_TTL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let args = Args::parse();
    tracing::info!(?args, "starting worker");

    let instance_id = format!("{}:{}", hostname(), std::process::id());
    let config = Arc::new(Config::from_args(&args, instance_id));
    let lifecycle = Lifecycle::new("watermark-removal-worker", config.run_id.clone());

    let pool = store::connect(&args.database_url, 10, args.database_require_ssl).await?;
    let store: Arc<dyn store::Store> = Arc::new(store::PgStore::new(pool.clone()));
    let blobs: Arc<dyn store::BlobStore> = Arc::new(
        store::S3BlobStore::from_env(args.inputs_bucket.clone(), args.processed_bucket.clone()).await,
    );
    let queue: Arc<dyn queue::WorkQueue> = Arc::new(queue::RedisWorkQueue::connect(&args.redis_url).await?);

    let http = reqwest::Client::new();
    let notifier = Arc::new(NotificationFanout::new(
        WebhookSender::new(http.clone(), config.webhook_signing_secret.clone()),
        MailClient::new(
            http.clone(),
            args.mail_api_url.clone().unwrap_or_default(),
            args.mail_api_key.clone().unwrap_or_default(),
            args.mail_from_address.clone(),
        ),
        CachedPreferences::new(PgPreferences::new(pool.clone()), PREFERENCES_CACHE_TTL),
        PgEmailDirectory::new(pool.clone()),
    )?);

    let app_state = AppState {
        store: store.clone(),
        blobs: blobs.clone(),
        queue: queue.clone(),
        notifier,
        http,
        lifecycle: lifecycle.clone(),
        config: config.clone(),
    };

    let dependency_probes: Vec<Box<dyn DependencyProbe>> = vec![
        Box::new(probes::StoreProbe { store: store.clone() }),
        Box::new(probes::QueueProbe { queue: queue.clone() }),
        Box::new(probes::BlobProbe { blobs: blobs.clone() }),
    ];
    let probe_registry = Arc::new(ProbeRegistry::new(dependency_probes));

    let diagnostic_checks: Arc<Vec<Box<dyn lifecycle::DiagnosticCheck>>> = Arc::new(vec![
        Box::new(probes::StoreDiagnostic { store: store.clone() }),
        Box::new(probes::QueueDiagnostic { queue: queue.clone() }),
        Box::new(probes::BlobDiagnostic { blobs: blobs.clone() }),
        Box::new(probes::ToolchainDiagnostic {
            ffmpeg_binary: config.ffmpeg_binary.clone(),
            ffprobe_binary: config.ffprobe_binary.clone(),
        }),
        Box::new(probes::ScratchDirDiagnostic),
        Box::new(probes::RequiredConfigDiagnostic {
            submitter_callback_url: config.submitter_callback_url.clone(),
            database_url: args.database_url.clone(),
            redis_url: args.redis_url.clone(),
        }),
    ]);

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

    let app = lifecycle::health_router(health_ctx)
        .merge(lifecycle::diagnostics_router(diagnostic_checks))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port)).await?;
    tracing::info!(port = args.port, "worker diagnostics listening");

    // The health/diagnostics server and the job loop shut down off the same
    // signal, but independently: the server stops accepting new connections
    // immediately, while the job loop keeps running until every in-flight
    // attempt drains (§5 "graceful shutdown").
    let serve_handle = tokio::spawn(
        axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(
            lifecycle.clone(),
            announcer.clone(),
            config.clone(),
        )),
    );

    run_loop(app_state, lifecycle).await;
    serve_handle.await??;

    Ok(())
}

/// The bounded-concurrency dequeue loop, the stale-job sweeper, and the
/// queue's reclaim tick (§4.1, §4.3), all driven off one process. Runs
/// until the process enters `stopping`, at which point it stops claiming
/// new deliveries and waits for in-flight attempts to finish.
async fn run_loop(state: AppState, lifecycle: Lifecycle) {
    let semaphore = Arc::new(tokio::sync::Semaphore::new(state.config.concurrency));
    let mut sweep_ticker = tokio::time::interval(state.config.sweep_interval);
    let mut reclaim_ticker = tokio::time::interval(state.config.reclaim_idle);

    loop {
        if lifecycle.state() == lifecycle::State::Stopping {
            break;
        }

        tokio::select! {
            _ = sweep_ticker.tick() => {
                sweep_stale(&state).await;
            }
            _ = reclaim_ticker.tick() => {
                if let Err(err) = state.queue.reclaim(&state.config.consumer_name, state.config.reclaim_idle).await {
                    tracing::warn!(error = %err, "queue reclaim failed");
                }
            }
            permit = Arc::clone(&semaphore).acquire_owned() => {
                let Ok(permit) = permit else { break };
                match state.queue.dequeue(&state.config.consumer_name, 1, Duration::from_secs(5)).await {
                    Ok(mut deliveries) if !deliveries.is_empty() => {
                        let delivery = deliveries.remove(0);
                        let state = state.clone();
                        tokio::spawn(async move {
                            handle_delivery(&state, delivery).await;
                            drop(permit);
                        });
                    }
                    Ok(_) => drop(permit),
                    Err(err) => {
                        tracing::warn!(error = %err, "dequeue failed");
                        drop(permit);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }

    tracing::info!("draining in-flight jobs before shutdown");
    let _ = semaphore.acquire_many(state.config.concurrency as u32).await;
}

async fn handle_delivery(state: &AppState, delivery: queue::Delivery) {
    let job_id = delivery.message.job_id.clone();
    match pipeline::run(state, &job_id).await {
        pipeline::Disposition::Ack => {
            if let Err(err) = state.queue.ack(&delivery).await {
                tracing::warn!(%job_id, error = %err, "failed to ack completed delivery");
            }
        }
        pipeline::Disposition::Retry(err) => {
            tracing::warn!(%job_id, error = %err, "nacking delivery for retry");
            if let Err(err) = state.queue.nack(delivery, state.config.max_attempts).await {
                tracing::warn!(%job_id, error = %err, "failed to nack delivery");
            }
        }
    }
}

/// Jobs stuck past `stale_after` are re-enqueued for another attempt, or
/// failed out via the usual callback path if attempts are exhausted (§4.3).
async fn sweep_stale(state: &AppState) {
    let cutoff = chrono::Utc::now() - state.config.stale_after;
    let stale = match state.store.sweep_stale(cutoff, 100).await {
        Ok(jobs) => jobs,
        Err(err) => {
            tracing::warn!(error = %err, "stale-job sweep query failed");
            return;
        }
    };

    for job in stale {
        if job.attempts >= state.config.max_attempts {
            let outcome = models::JobOutcome::Failed {
                error_message: "Job exceeded its maximum processing attempts.".to_string(),
                error_code: Some("STALE_EXHAUSTED".to_string()),
            };
            pipeline::callback::deliver(state, &job.job_id, outcome).await;
            continue;
        }

        if let Err(err) = state.queue.enqueue(&job.job_id).await {
            tracing::warn!(job_id = %job.job_id, error = %err, "failed to re-enqueue stale job");
        }
    }
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
