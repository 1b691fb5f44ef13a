//! Job executor (§4.6): the reserve → run-pipeline → ack/nack loop, plus
//! the periodic stalled-job sweep and lease renewal, following
//! `vclip-worker::executor::JobExecutor`'s shape — a job-level semaphore
//! gates concurrency, a `tokio::sync::watch` channel carries the shutdown
//! signal, and a background task claims stalled reservations the same way
//! the teacher's claim task polls `claim_pending`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Semaphore};
use tracing::{error, info, warn};
use uuid::Uuid;

use etc_client::EtcClient;
use media_toolkit::MtkConfig;
use pipeline_engine::{PipelineContext, PipelineError};
use pipeline_models::{BackoffKind, Job, JobError, JobStatus};
use queue_adapter::{EnqueueOptions, JobQueue, Lease, QueueConfig};
use storage_adapter::StorageAdapter;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;

/// Collaborators shared by every job a single worker process runs.
struct Collaborators {
    queue: Arc<JobQueue>,
    queue_config: QueueConfig,
    storage: Arc<StorageAdapter>,
    etc: Arc<EtcClient>,
    mtk_config: Arc<MtkConfig>,
}

pub struct JobExecutor {
    config: WorkerConfig,
    collaborators: Arc<Collaborators>,
    job_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
    worker_id: String,
}

impl JobExecutor {
    pub fn new(
        config: WorkerConfig,
        queue: JobQueue,
        queue_config: QueueConfig,
        storage: StorageAdapter,
        etc: EtcClient,
        mtk_config: MtkConfig,
    ) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = watch::channel(false);
        let worker_id = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            collaborators: Arc::new(Collaborators {
                queue: Arc::new(queue),
                queue_config,
                storage: Arc::new(storage),
                etc: Arc::new(etc),
                mtk_config: Arc::new(mtk_config),
            }),
            job_semaphore,
            shutdown,
            worker_id,
        }
    }

    /// Run until a shutdown signal is observed, then drain in-flight jobs
    /// up to `config.shutdown_timeout` before returning.
    /// Returns `true` once shutdown drained cleanly within
    /// `shutdown_timeout`, `false` if it had to force through (§4.6 "exit
    /// code 0 on clean drain, 1 on forced timeout").
    pub async fn run(&self) -> WorkerResult<bool> {
        info!(
            worker_id = %self.worker_id,
            max_concurrent_jobs = self.config.max_concurrent_jobs,
            "starting job executor"
        );

        self.collaborators.queue.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();
        let claim_task = self.spawn_claim_task();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_one(&self.worker_id) => {
                    if let Err(e) = result {
                        error!("error consuming jobs: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        claim_task.abort();

        info!("waiting for in-flight jobs to drain");
        let drained = tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs()).await.is_ok();
        let clean = self.collaborators.queue.shutdown(self.config.shutdown_timeout).await?;

        info!(drained, clean, "job executor stopped");
        Ok(drained && clean)
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    fn spawn_claim_task(&self) -> tokio::task::JoinHandle<()> {
        let collaborators = Arc::clone(&self.collaborators);
        let config = self.config.clone();
        let job_semaphore = Arc::clone(&self.job_semaphore);
        let worker_id = self.worker_id.clone();
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.claim_interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        match collaborators.queue.claim_stalled(&worker_id, config.claim_min_idle).await {
                            Ok(result) => {
                                for job in result.exhausted {
                                    fail_stalled_job(&collaborators, job).await;
                                }

                                if !result.claimed.is_empty() {
                                    info!(count = result.claimed.len(), "reclaimed stalled jobs");
                                    metrics::record_stalled_reclaimed(result.claimed.len());
                                    for (message_id, job) in result.claimed {
                                        let lease = Lease {
                                            message_id,
                                            stream: collaborators.queue_config.stream_for_priority(job.priority),
                                            worker_id: worker_id.clone(),
                                            acquired_at: Utc::now(),
                                            duration: config.lease_duration,
                                        };
                                        JobLogger::new(&job.job_id, "pipeline").log_stalled();
                                        let Ok(permit) = job_semaphore.clone().acquire_owned().await else { break };
                                        let collaborators = Arc::clone(&collaborators);
                                        let config = config.clone();
                                        tokio::spawn(async move {
                                            let _permit = permit;
                                            execute_job(config, collaborators, job, lease).await;
                                        });
                                    }
                                }
                            }
                            Err(e) => warn!("failed to claim stalled jobs: {}", e),
                        }
                    }
                }
            }
        })
    }

    async fn consume_one(&self, worker_id: &str) -> WorkerResult<()> {
        if self.job_semaphore.available_permits() == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let reserved = self.collaborators.queue.reserve(worker_id, self.config.lease_duration).await?;
        let Some((job, lease)) = reserved else {
            tokio::time::sleep(Duration::from_millis(200)).await;
            return Ok(());
        };

        let permit = self
            .job_semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| WorkerError::job_failed("job semaphore closed"))?;

        let collaborators = Arc::clone(&self.collaborators);
        let config = self.config.clone();
        tokio::spawn(async move {
            let _permit = permit;
            execute_job(config, collaborators, job, lease).await;
        });

        Ok(())
    }

    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.config.max_concurrent_jobs {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

/// Terminally fail a job that has been stalled `max_stalled_count` times
/// (§4.4 "Stall recovery", §8 `maxStalledCount → failed(stalled)`). The
/// queue adapter has already acked it off the stream; this only needs to
/// record the outcome.
async fn fail_stalled_job(collaborators: &Arc<Collaborators>, job: Job) {
    let logger = JobLogger::new(&job.job_id, "pipeline");
    logger.log_failed("job exceeded maximum stalled count", false);
    metrics::record_failed(false);

    let mut tracked = job.clone();
    tracked.status = JobStatus::Failed;
    tracked.completed_at = Some(Utc::now());
    tracked.error = Some(JobError::new("stalled", "job exceeded maximum stalled count and was terminally failed"));
    if let Err(e) = collaborators.storage.jobs.save(&tracked).await {
        logger.log_error(&format!("failed to persist stalled-exhausted status: {}", e));
    }
}

/// Run one job end to end: build its context, drive the pipeline, renew
/// its lease on a heartbeat while that runs, and translate the outcome
/// into `ack`/`nack` plus a `storage.jobs` status update (§4.6, §3).
async fn execute_job(config: WorkerConfig, collaborators: Arc<Collaborators>, job: Job, lease: Lease) {
    let logger = JobLogger::new(&job.job_id, "pipeline");
    logger.log_reserved();
    metrics::record_reserved();

    let mut tracked = job.clone();
    tracked.status = JobStatus::Active;
    tracked.started_at = Some(Utc::now());
    if let Err(e) = collaborators.storage.jobs.save(&tracked).await {
        logger.log_error(&format!("failed to persist active status: {}", e));
    }
    if let Err(e) = collaborators.queue.update_progress(job.job_id, 0).await {
        warn!("failed to update progress: {}", e);
    }

    let job_dir = collaborators.mtk_config.job_dir(&job.job_id.to_string());
    let ctx = PipelineContext::new(
        job.clone(),
        config.job_timeout,
        job_dir,
        Arc::clone(&collaborators.etc),
        Arc::clone(&collaborators.mtk_config),
        Arc::clone(&collaborators.storage),
        config.frame_concurrency,
    );

    let heartbeat = spawn_heartbeat(Arc::clone(&collaborators.queue), lease.clone(), config.job_heartbeat_interval);

    let started = std::time::Instant::now();
    let outcome = pipeline_engine::run_pipeline(&ctx).await;
    heartbeat.abort();

    match outcome {
        Ok(result) => {
            logger.log_completed(result.processing_time_ms);
            metrics::record_completed(started.elapsed().as_secs_f64());

            if let Err(e) = collaborators.queue.ack(&lease).await {
                logger.log_error(&format!("failed to ack: {}", e));
            }
            let _ = collaborators.queue.update_progress(job.job_id, 100).await;

            tracked.status = JobStatus::Completed;
            tracked.completed_at = Some(Utc::now());
            if let Err(e) = collaborators.storage.jobs.save(&tracked).await {
                logger.log_error(&format!("failed to persist completed status: {}", e));
            }
        }
        Err(pipeline_err) => {
            let cancelled = matches!(pipeline_err, PipelineError::Cancelled);
            let err = WorkerError::from(pipeline_err);

            let options = EnqueueOptions {
                priority: job.priority,
                delay: None,
                attempts: if cancelled { job.attempt } else { collaborators.queue_config.default_attempts },
                backoff: BackoffKind::Exponential,
                backoff_delay: Duration::from_secs(1),
                timeout: config.job_timeout,
                remove_on_complete: collaborators.queue_config.remove_on_complete,
                remove_on_fail: collaborators.queue_config.remove_on_fail,
            };

            let will_retry = match collaborators.queue.nack(&job, &lease, &options, &err.to_string()).await {
                Ok(retried) => retried,
                Err(e) => {
                    logger.log_error(&format!("failed to nack: {}", e));
                    false
                }
            };

            logger.log_failed(&err.to_string(), will_retry);
            metrics::record_failed(will_retry);

            if !will_retry {
                tracked.status = JobStatus::Failed;
                tracked.completed_at = Some(Utc::now());
                tracked.error = Some(JobError::new(err.code(), err.to_string()));
                if let Err(e) = collaborators.storage.jobs.save(&tracked).await {
                    logger.log_error(&format!("failed to persist failed status: {}", e));
                }
            }
        }
    }
}

fn spawn_heartbeat(queue: Arc<JobQueue>, lease: Lease, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            ticker.tick().await;
            if let Err(e) = queue.renew_lease(&lease).await {
                warn!("failed to renew lease for {}: {}", lease.message_id, e);
            }
        }
    })
}
