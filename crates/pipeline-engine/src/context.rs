//! Per-job execution context: deadline, cancellation, and the shared
//! collaborators every stage calls through (§4.5, §5).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Semaphore};
use tokio_util::sync::CancellationToken;

use etc_client::EtcClient;
use media_toolkit::MtkConfig;
use pipeline_models::Job;
use storage_adapter::StorageAdapter;

/// Everything a stage needs, without reaching into the job queue or worker
/// dispatcher — job-owned state is never touched by another job (§5
/// "locking discipline").
pub struct PipelineContext {
    pub job: Job,
    pub job_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub cancel: CancellationToken,
    mtk_cancel_rx: watch::Receiver<bool>,
    pub etc: Arc<EtcClient>,
    pub mtk_config: Arc<MtkConfig>,
    pub storage: Arc<StorageAdapter>,
    pub frame_semaphore: Arc<Semaphore>,
}

impl PipelineContext {
    /// `timeout` is `options.timeout` or WD's default 1h deadline (§4.6).
    /// Spawns the background watchers that translate deadline expiry into
    /// both the `CancellationToken` ETC polls observe and the `watch`
    /// channel media-toolkit subprocesses observe (§5 "every stage observes
    /// the job deadline").
    pub fn new(
        job: Job,
        timeout: Duration,
        job_dir: PathBuf,
        etc: Arc<EtcClient>,
        mtk_config: Arc<MtkConfig>,
        storage: Arc<StorageAdapter>,
        frame_concurrency: usize,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (mtk_cancel_tx, mtk_cancel_rx) = watch::channel(false);

        let deadline_cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => deadline_cancel.cancel(),
                _ = deadline_cancel.cancelled() => {}
            }
        });

        let forward_cancel = cancel.clone();
        tokio::spawn(async move {
            forward_cancel.cancelled().await;
            let _ = mtk_cancel_tx.send(true);
        });

        Self {
            job,
            job_dir,
            started_at: Utc::now(),
            cancel,
            mtk_cancel_rx,
            etc,
            mtk_config,
            storage,
            frame_semaphore: Arc::new(Semaphore::new(frame_concurrency.max(1))),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Handed to media-toolkit calls, which kill their subprocess and
    /// return `Cancelled` once it flips (§5 "MTK kills its subprocess on
    /// deadline").
    pub fn mtk_cancel(&self) -> watch::Receiver<bool> {
        self.mtk_cancel_rx.clone()
    }
}
