//! Video analysis worker binary (§4.6, §6).

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use etc_client::{EtcClient, EtcConfig};
use media_toolkit::MtkConfig;
use queue_adapter::{JobQueue, QueueConfig};
use storage_adapter::{InMemoryRelationalClient, InMemoryVectorIndexClient, StorageAdapter, StorageConfig};
use vidscan_worker::{metrics, JobExecutor, WorkerConfig};

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("vidscan=info".parse().unwrap()))
        .init();

    metrics::init_metrics();

    info!("starting vidscan-worker");

    let config = WorkerConfig::from_env();
    info!(?config, "worker config loaded");

    let queue_config = QueueConfig::from_env();
    let queue = match JobQueue::new(queue_config.clone()) {
        Ok(q) => q,
        Err(e) => {
            error!("failed to create job queue: {}", e);
            std::process::exit(1);
        }
    };

    let storage = match StorageAdapter::new(
        Arc::new(InMemoryRelationalClient::new()),
        Arc::new(InMemoryVectorIndexClient::new()),
        StorageConfig::from_env(),
    )
    .await
    {
        Ok(s) => s,
        Err(e) => {
            error!("failed to initialize storage adapter: {}", e);
            std::process::exit(1);
        }
    };

    let etc = match EtcClient::new(EtcConfig::from_env()) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to create model-service client: {}", e);
            std::process::exit(1);
        }
    };

    let mtk_config = MtkConfig::from_env();

    let executor = Arc::new(JobExecutor::new(config, queue, queue_config, storage, etc, mtk_config));

    let shutdown_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        let ctrl_c = async { tokio::signal::ctrl_c().await.ok() };
        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => error!("failed to install SIGTERM handler: {}", e),
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("received SIGINT"),
            _ = terminate => info!("received SIGTERM"),
        }
        shutdown_executor.shutdown();
    });

    let exit_code = match executor.run().await {
        Ok(true) => 0,
        Ok(false) => {
            error!("shutdown forced past timeout");
            1
        }
        Err(e) => {
            error!("executor error: {}", e);
            1
        }
    };

    info!(exit_code, "worker shutdown complete");
    std::process::exit(exit_code);
}
