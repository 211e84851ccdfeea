//! Lecture processing worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lecta_db::{init_database, JobRepository, LectureRepository};
use lecta_queue::JobQueue;
use lecta_stage_client::StageClient;
use lecta_storage::ArtifactStore;
use lecta_worker::{JobExecutor, Orchestrator, StageRunner, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("lecta=info".parse().unwrap());

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

    info!("Starting lecta-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let pool = match init_database(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let queue = match JobQueue::from_env() {
        Ok(q) => Arc::new(q),
        Err(e) => {
            error!("Failed to create job queue: {}", e);
            std::process::exit(1);
        }
    };

    let client = match StageClient::from_env() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Failed to create stage client: {}", e);
            std::process::exit(1);
        }
    };

    let jobs = JobRepository::new(pool.clone());
    let lectures = LectureRepository::new(pool);
    let store = ArtifactStore::from_env();

    let runner = StageRunner::new(jobs.clone(), lectures, store, client);
    let orchestrator = Arc::new(Orchestrator::new(jobs, runner, &config));

    let executor = Arc::new(JobExecutor::new(config, queue, orchestrator));

    // Trigger graceful shutdown on ctrl-c
    let shutdown_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_executor.shutdown();
    });

    if let Err(e) = executor.run().await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
