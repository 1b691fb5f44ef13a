//! `JobQueue`: Redis Streams transport for `Job` with priority bands,
//! delay, lease-based reservation and stall recovery (§4.4).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pipeline_models::{BackoffKind, Job, JobId, JobStatus};
use pipeline_support::RetryConfig;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::job::{EnqueueOptions, Lease, QueueMetrics, StalledClaims};

const SCHEDULED_KEY_SUFFIX: &str = "scheduled";
const PAUSED_KEY_SUFFIX: &str = "paused";

/// Job queue client. One per worker process; the reservation connection and
/// the command connection are logically distinct per call (§5 "Shared
/// resources"), `redis`'s multiplexed connection makes that cheap.
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
    shutting_down: Arc<AtomicBool>,
}

impl JobQueue {
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())
            .map_err(|e| QueueError::connection_failed(e.to_string()))?;
        Ok(Self { client, config, shutting_down: Arc::new(AtomicBool::new(false)) })
    }

    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    fn scheduled_key(&self) -> String {
        format!("{}:{}", self.config.stream_prefix, SCHEDULED_KEY_SUFFIX)
    }

    fn paused_key(&self) -> String {
        format!("{}:{}", self.config.stream_prefix, PAUSED_KEY_SUFFIX)
    }

    fn counter_key(&self, name: &str) -> String {
        format!("{}:counters:{}", self.config.stream_prefix, name)
    }

    /// Create consumer groups for every priority stream (idempotent).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        for stream in self.config.all_streams() {
            let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
                .arg("CREATE")
                .arg(&stream)
                .arg(&self.config.consumer_group)
                .arg("$")
                .arg("MKSTREAM")
                .query_async(&mut conn)
                .await;

            match result {
                Ok(_) => info!("created consumer group on {}", stream),
                Err(e) if e.to_string().contains("BUSYGROUP") => {
                    debug!("consumer group already exists on {}", stream);
                }
                Err(e) => return Err(QueueError::Redis(e)),
            }
        }

        Ok(())
    }

    /// Enqueue `job` into its priority stream, or the delay sorted set if
    /// `options.delay` is set (§4.4 `Enqueue`).
    pub async fn enqueue(&self, job: &Job, options: &EnqueueOptions) -> QueueResult<String> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(QueueError::ShuttingDown);
        }

        let mut conn = self.client.get_multiplexed_async_connection().await?;

        if let Some(delay) = options.delay {
            let payload = serde_json::to_string(job)?;
            let visible_at = (Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default()).timestamp();

            redis::cmd("ZADD")
                .arg(self.scheduled_key())
                .arg(visible_at)
                .arg(&payload)
                .query_async::<()>(&mut conn)
                .await?;

            info!(job_id = %job.job_id, delay_secs = delay.as_secs(), "scheduled job with delay");
            return Ok(job.job_id.to_string());
        }

        self.enqueue_now(&mut conn, job, options.priority).await
    }

    async fn enqueue_now(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        job: &Job,
        priority: u8,
    ) -> QueueResult<String> {
        let stream = self.config.stream_for_priority(priority);
        let payload = serde_json::to_string(job)?;

        let message_id: String = redis::cmd("XADD")
            .arg(&stream)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .query_async(conn)
            .await?;

        info!(job_id = %job.job_id, %message_id, stream = %stream, "enqueued job");
        Ok(message_id)
    }

    /// Move scheduled jobs whose due time has passed into their priority
    /// stream. Intended to be polled by the worker dispatcher.
    pub async fn process_scheduled_jobs(&self) -> QueueResult<usize> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let now = Utc::now().timestamp();
        let key = self.scheduled_key();

        let due: Vec<String> = redis::cmd("ZRANGEBYSCORE").arg(&key).arg(0).arg(now).query_async(&mut conn).await?;
        if due.is_empty() {
            return Ok(0);
        }

        let mut moved = 0;
        for payload in &due {
            if let Ok(job) = serde_json::from_str::<Job>(payload) {
                if self.enqueue_now(&mut conn, &job, job.priority).await.is_ok() {
                    moved += 1;
                }
            } else {
                warn!("failed to parse scheduled job payload");
            }

            redis::cmd("ZREM").arg(&key).arg(payload).query_async::<()>(&mut conn).await.ok();
        }

        Ok(moved)
    }

    /// Reserve the next job, polling priority streams highest-to-lowest so
    /// ordering is strict between priorities and FIFO within one (§4.4
    /// "Ordering"). Returns `None` if the queue is paused or nothing is due.
    pub async fn reserve(&self, worker_id: &str, lease_duration: Duration) -> QueueResult<Option<(Job, Lease)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let paused: bool = conn.exists(self.paused_key()).await?;
        if paused {
            return Ok(None);
        }

        for priority in 1..=10u8 {
            let stream = self.config.stream_for_priority(priority);

            let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
                .arg("GROUP")
                .arg(&self.config.consumer_group)
                .arg(worker_id)
                .arg("COUNT")
                .arg(1)
                .arg("STREAMS")
                .arg(&stream)
                .arg(">")
                .query_async(&mut conn)
                .await?;

            for stream_key in result.keys {
                for entry in stream_key.ids {
                    if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                        let payload_str = String::from_utf8_lossy(payload);
                        match serde_json::from_str::<Job>(&payload_str) {
                            Ok(job) => {
                                let lease = Lease {
                                    message_id: entry.id.clone(),
                                    stream: stream.clone(),
                                    worker_id: worker_id.to_string(),
                                    acquired_at: Utc::now(),
                                    duration: lease_duration,
                                };
                                return Ok(Some((job, lease)));
                            }
                            Err(e) => {
                                warn!("dropping malformed job payload: {}", e);
                                self.ack_raw(&stream, &entry.id).await.ok();
                            }
                        }
                    }
                }
            }
        }

        Ok(None)
    }

    async fn ack_raw(&self, stream: &str, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("XACK").arg(stream).arg(&self.config.consumer_group).arg(message_id).query_async::<()>(&mut conn).await?;
        redis::cmd("XDEL").arg(stream).arg(message_id).query_async::<()>(&mut conn).await?;
        Ok(())
    }

    /// Record progress for an in-flight job. `p` is clamped into `[0,
    /// 100]`; callers are expected (not enforced) to keep it non-decreasing
    /// (§4.4 `UpdateProgress`).
    pub async fn update_progress(&self, job_id: JobId, p: u8) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("{}:progress:{}", self.config.stream_prefix, job_id);
        conn.set_ex::<_, _, ()>(&key, p.min(100), 3600).await?;
        Ok(())
    }

    /// Acknowledge successful completion (§4.4 `Ack`).
    pub async fn ack(&self, lease: &Lease) -> QueueResult<()> {
        self.ack_raw(&lease.stream, &lease.message_id).await?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.incr::<_, _, ()>(self.counter_key("completed"), 1).await?;
        Ok(())
    }

    /// Apply Nack retry policy: reschedule with backoff if attempts remain,
    /// otherwise terminal failure (§4.4 `Nack`).
    pub async fn nack(&self, job: &Job, lease: &Lease, options: &EnqueueOptions, error: &str) -> QueueResult<bool> {
        self.ack_raw(&lease.stream, &lease.message_id).await?;

        if job.attempt < options.attempts {
            let mut retried = job.clone();
            retried.attempt += 1;
            retried.status = JobStatus::Waiting;

            let config = RetryConfig::new("queue:nack").with_base_delay(options.backoff_delay);
            let delay = match options.backoff {
                BackoffKind::Fixed => options.backoff_delay,
                BackoffKind::Exponential => config.doubling_delay_for_attempt(retried.attempt),
            };

            let mut delayed_options = options.clone();
            delayed_options.delay = Some(delay);
            self.enqueue(&retried, &delayed_options).await?;

            info!(job_id = %job.job_id, attempt = retried.attempt, ?delay, "requeued job after failure: {}", error);
            Ok(true)
        } else {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            conn.incr::<_, _, ()>(self.counter_key("failed"), 1).await?;
            warn!(job_id = %job.job_id, "job exhausted attempts: {}", error);
            Ok(false)
        }
    }

    /// Cancel a job. If it is already reserved, `lease` removes it from the
    /// consumer group's PEL; otherwise it is still sitting unreserved in
    /// its priority stream (or the delay sorted set) and must be removed
    /// from there directly so no worker ever reads it (§4.4 `Cancel`
    /// "prevents a waiting job from running"). Succeeds only when the
    /// job's current status is non-terminal.
    pub async fn cancel(&self, job: &Job, lease: Option<&Lease>) -> QueueResult<bool> {
        if job.status.is_terminal() {
            return Ok(false);
        }

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload_prefix = format!("\"job_id\":\"{}\"", job.job_id);

        if let Some(lease) = lease {
            self.ack_raw(&lease.stream, &lease.message_id).await.ok();
        } else {
            let stream = self.config.stream_for_priority(job.priority);
            let reply: redis::streams::StreamRangeReply =
                redis::cmd("XRANGE").arg(&stream).arg("-").arg("+").query_async(&mut conn).await?;
            for entry in reply.ids {
                if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                    if String::from_utf8_lossy(payload).contains(&payload_prefix) {
                        redis::cmd("XDEL").arg(&stream).arg(&entry.id).query_async::<()>(&mut conn).await.ok();
                    }
                }
            }
        }

        let due: Vec<String> =
            redis::cmd("ZRANGE").arg(self.scheduled_key()).arg(0).arg(-1).query_async(&mut conn).await?;
        for payload in due.into_iter().filter(|p| p.contains(&payload_prefix)) {
            redis::cmd("ZREM").arg(self.scheduled_key()).arg(&payload).query_async::<()>(&mut conn).await.ok();
        }

        Ok(true)
    }

    /// Claim jobs whose lease has expired for longer than `min_idle`,
    /// returning them to circulation for another worker, unless they have
    /// already been stalled `max_stalled_count` times — those are pulled
    /// off the stream and reported as terminally failed instead of being
    /// redelivered again (§4.4 "Stall recovery", §8 `maxStalledCount →
    /// failed(stalled)`). Run every `stalled_interval` by the dispatcher.
    pub async fn claim_stalled(&self, worker_id: &str, min_idle: Duration) -> QueueResult<StalledClaims> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let min_idle_ms = min_idle.as_millis() as u64;
        let mut claimed_total = Vec::new();
        let mut exhausted_total = Vec::new();

        for stream in self.config.all_streams() {
            let pending_count: usize = redis::cmd("XPENDING")
                .arg(&stream)
                .arg(&self.config.consumer_group)
                .query_async(&mut conn)
                .await
                .map(|reply: redis::streams::StreamPendingReply| reply.count())
                .unwrap_or(0);

            if pending_count == 0 {
                continue;
            }

            let pending_details: Vec<Vec<redis::Value>> = redis::cmd("XPENDING")
                .arg(&stream)
                .arg(&self.config.consumer_group)
                .arg("-")
                .arg("+")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            let mut ids_to_claim = Vec::new();
            let mut ids_to_exhaust = Vec::new();
            for detail in pending_details {
                if let (Some(redis::Value::BulkString(id_bytes)), Some(redis::Value::Int(idle_ms)), Some(redis::Value::Int(delivery_count))) =
                    (detail.get(0), detail.get(2), detail.get(3))
                {
                    if *idle_ms as u64 >= min_idle_ms {
                        if let Ok(id) = String::from_utf8(id_bytes.clone()) {
                            // `delivery_count` is 1 after the initial read, and
                            // incremented by each non-JUSTID XCLAIM, so the
                            // number of times it has *already* stalled is
                            // `delivery_count - 1`.
                            let stalls_so_far = (*delivery_count - 1).max(0) as u32;
                            if stalls_so_far >= self.config.max_stalled_count {
                                ids_to_exhaust.push(id);
                            } else {
                                ids_to_claim.push(id);
                            }
                        }
                    }
                }
            }

            for id in &ids_to_exhaust {
                match self.fetch_job_payload(&mut conn, &stream, id).await {
                    Ok(Some(job)) => {
                        warn!(job_id = %job.job_id, stream = %stream, stalls = self.config.max_stalled_count, "job exceeded max stalled count, failing terminally");
                        self.ack_raw(&stream, id).await.ok();
                        conn.incr::<_, _, ()>(self.counter_key("stalled_failed"), 1).await.ok();
                        exhausted_total.push(job);
                    }
                    Ok(None) => {
                        warn!(%id, stream = %stream, "dropping unreadable pending entry past max stalled count");
                        self.ack_raw(&stream, id).await.ok();
                    }
                    Err(e) => warn!("failed to fetch pending entry {} for exhaustion check: {}", id, e),
                }
            }

            if ids_to_claim.is_empty() {
                continue;
            }

            let mut cmd = redis::cmd("XCLAIM");
            cmd.arg(&stream).arg(&self.config.consumer_group).arg(worker_id).arg(min_idle_ms);
            for id in &ids_to_claim {
                cmd.arg(id);
            }

            let claimed: Vec<Vec<redis::Value>> = cmd.query_async(&mut conn).await?;
            for message in claimed {
                if let (Some(redis::Value::BulkString(id_bytes)), Some(redis::Value::Array(fields))) =
                    (message.get(0), message.get(1))
                {
                    if let Ok(message_id) = String::from_utf8(id_bytes.clone()) {
                        let mut payload = None;
                        let mut i = 0;
                        while i + 1 < fields.len() {
                            if let (
                                Some(redis::Value::BulkString(field_bytes)),
                                Some(redis::Value::BulkString(value_bytes)),
                            ) = (fields.get(i), fields.get(i + 1))
                            {
                                if field_bytes == b"job" {
                                    payload = String::from_utf8(value_bytes.clone()).ok();
                                    break;
                                }
                            }
                            i += 2;
                        }

                        if let Some(payload) = payload {
                            match serde_json::from_str::<Job>(&payload) {
                                Ok(job) => {
                                    info!(job_id = %job.job_id, stream = %stream, "claimed stalled job");
                                    claimed_total.push((message_id, job));
                                }
                                Err(e) => warn!("failed to parse claimed job payload: {}", e),
                            }
                        }
                    }
                }
            }
        }

        Ok(StalledClaims { claimed: claimed_total, exhausted: exhausted_total })
    }

    /// Read a pending stream entry's `job` field without claiming it, used
    /// to recover the payload of a message that has exceeded
    /// `max_stalled_count` and is about to be acked off the stream.
    async fn fetch_job_payload(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        stream: &str,
        id: &str,
    ) -> QueueResult<Option<Job>> {
        let reply: redis::streams::StreamRangeReply =
            redis::cmd("XRANGE").arg(stream).arg(id).arg(id).query_async(conn).await?;

        for entry in reply.ids {
            if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                let payload_str = String::from_utf8_lossy(payload);
                if let Ok(job) = serde_json::from_str::<Job>(&payload_str) {
                    return Ok(Some(job));
                }
            }
        }

        Ok(None)
    }

    /// Renew a lease via `XCLAIM ... JUSTID`, resetting the idle timer
    /// without moving the payload (§4.4 `Reserve` "renewed periodically").
    pub async fn renew_lease(&self, lease: &Lease) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("XCLAIM")
            .arg(&lease.stream)
            .arg(&self.config.consumer_group)
            .arg(&lease.worker_id)
            .arg(0)
            .arg(&lease.message_id)
            .arg("JUSTID")
            .query_async::<redis::Value>(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn pause(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(self.paused_key(), 1).await?;
        Ok(())
    }

    pub async fn resume(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(self.paused_key()).await?;
        Ok(())
    }

    /// Aggregate counts across priority streams (§4.4 `Metrics`).
    pub async fn metrics(&self) -> QueueResult<QueueMetrics> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let mut waiting = 0u64;
        let mut active = 0u64;
        for stream in self.config.all_streams() {
            waiting += conn.xlen::<_, u64>(&stream).await.unwrap_or(0);
            active += redis::cmd("XPENDING")
                .arg(&stream)
                .arg(&self.config.consumer_group)
                .query_async(&mut conn)
                .await
                .map(|r: redis::streams::StreamPendingReply| r.count() as u64)
                .unwrap_or(0);
        }

        let delayed: u64 = redis::cmd("ZCARD").arg(self.scheduled_key()).query_async(&mut conn).await.unwrap_or(0);
        let completed: u64 = conn.get(self.counter_key("completed")).await.unwrap_or(0);
        let failed: u64 = conn.get(self.counter_key("failed")).await.unwrap_or(0);
        let paused: bool = conn.exists(self.paused_key()).await.unwrap_or(false);

        Ok(QueueMetrics { waiting, active, completed, failed, delayed, paused: paused as u64 })
    }

    /// Stop accepting new `Enqueue` calls and wait up to `timeout` for
    /// in-flight work to settle, forcing the connection closed if it
    /// doesn't (§4.4 `Shutdown`).
    pub async fn shutdown(&self, timeout: Duration) -> QueueResult<bool> {
        self.shutting_down.store(true, Ordering::SeqCst);

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let metrics = self.metrics().await?;
            if metrics.active == 0 {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(active = metrics.active, "forcing shutdown with in-flight jobs remaining");
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }
}
