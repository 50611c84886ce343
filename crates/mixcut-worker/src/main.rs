//! Mixcut worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mixcut_media::FfmpegEngine;
use mixcut_models::EncodingConfig;
use mixcut_storage::FsStorage;
use mixcut_tasks::RedisRepository;
use mixcut_worker::{Dispatcher, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("mixcut=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting mixcut-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    // The engine binaries are load-bearing; fail fast when missing.
    for check in [mixcut_media::check_ffmpeg, mixcut_media::check_ffprobe] {
        if let Err(e) = check() {
            error!("{}", e);
            std::process::exit(1);
        }
    }

    let repo = match RedisRepository::from_env() {
        Ok(r) => Arc::new(r),
        Err(e) => {
            error!("Failed to create task repository: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = repo.init().await {
        error!("Failed to initialize task backlog: {}", e);
        std::process::exit(1);
    }

    let storage_root =
        std::env::var("STORAGE_ROOT").unwrap_or_else(|_| "/var/lib/mixcut/storage".to_string());
    let storage = Arc::new(FsStorage::new(storage_root));

    let engine = Arc::new(
        FfmpegEngine::new(EncodingConfig::from_env())
            .with_stage_timeout(config.stage_timeout.as_secs()),
    );

    let dispatcher = Arc::new(Dispatcher::new(config, repo, storage, engine));

    // Shut down cleanly on ctrl-c
    let signal_dispatcher = Arc::clone(&dispatcher);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        signal_dispatcher.shutdown();
    });

    if let Err(e) = dispatcher.run().await {
        error!("Dispatcher error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
