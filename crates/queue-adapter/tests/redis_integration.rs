//! Queue/Redis integration tests (§4.4, §8). These hit a real Redis
//! instance and are skipped by default; run with
//! `cargo test -p queue-adapter -- --ignored` against a local Redis.

use std::time::Duration;

use pipeline_models::{Job, JobOptions, JobSource};
use queue_adapter::{EnqueueOptions, JobQueue, QueueConfig};

fn test_job(priority: u8) -> Job {
    Job::new(
        "test-user",
        JobSource::Url,
        "https://example.com/video.mp4",
        "video.mp4",
        JobOptions::default(),
        priority,
    )
}

async fn fresh_queue(prefix_suffix: &str) -> JobQueue {
    dotenvy::dotenv().ok();
    let mut config = QueueConfig::from_env();
    config.stream_prefix = format!("{}:test:{}", config.stream_prefix, prefix_suffix);
    let queue = JobQueue::new(config).expect("failed to build queue client");
    queue.init().await.expect("failed to init consumer groups");
    queue
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_reserve_then_ack_completes_the_job() {
    let queue = fresh_queue("reserve-ack").await;
    let job = test_job(5);
    let job_id = job.job_id;

    queue.enqueue(&job, &EnqueueOptions::default()).await.expect("enqueue failed");

    let (reserved, lease) = queue
        .reserve("worker-a", Duration::from_secs(30))
        .await
        .expect("reserve failed")
        .expect("expected a job to be reserved");
    assert_eq!(reserved.job_id, job_id);

    queue.ack(&lease).await.expect("ack failed");

    let metrics = queue.metrics().await.expect("metrics failed");
    assert_eq!(metrics.active, 0);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_nack_requeues_until_attempts_exhausted() {
    let queue = fresh_queue("nack-requeue").await;
    let mut job = test_job(5);
    job.attempt = 1;
    let options = EnqueueOptions { attempts: 2, ..EnqueueOptions::default() };

    queue.enqueue(&job, &options).await.expect("enqueue failed");

    let (reserved, lease) = queue
        .reserve("worker-a", Duration::from_secs(30))
        .await
        .expect("reserve failed")
        .expect("expected a job to be reserved");

    let retried = queue.nack(&reserved, &lease, &options, "synthetic failure").await.expect("nack failed");
    assert!(retried, "first failure should be retried (attempt 1 < 2)");

    // The retry was enqueued with a delay; advance the scheduled-jobs sweep
    // to make it visible, mirroring how a real worker loop ticks it.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    queue.process_scheduled_jobs().await.expect("scheduled sweep failed");

    let (reserved_again, lease_again) = queue
        .reserve("worker-a", Duration::from_secs(30))
        .await
        .expect("reserve failed")
        .expect("expected the retried job to be reservable again");
    assert_eq!(reserved_again.attempt, 2);

    let retried_again =
        queue.nack(&reserved_again, &lease_again, &options, "synthetic failure").await.expect("nack failed");
    assert!(!retried_again, "second failure should exhaust attempts (2 < 2 is false)");
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_claim_stalled_reclaims_an_unacked_reservation() {
    let queue = fresh_queue("claim-stalled").await;
    let job = test_job(5);

    queue.enqueue(&job, &EnqueueOptions::default()).await.expect("enqueue failed");

    let (_reserved, _lease) = queue
        .reserve("worker-crashed", Duration::from_secs(30))
        .await
        .expect("reserve failed")
        .expect("expected a job to be reserved");

    // Simulate the owning worker crashing without ack/nack: a sweep with a
    // min-idle of zero should immediately find it claimable.
    let result = queue
        .claim_stalled("worker-b", Duration::from_millis(0))
        .await
        .expect("claim_stalled failed");
    assert_eq!(result.claimed.len(), 1);
    assert_eq!(result.claimed[0].1.job_id, job.job_id);
    assert!(result.exhausted.is_empty());
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_claim_stalled_fails_job_terminally_past_max_stalled_count() {
    let mut config = QueueConfig::from_env();
    config.stream_prefix = format!("{}:test:max-stalled", config.stream_prefix);
    config.max_stalled_count = 2;
    let queue = JobQueue::new(config).expect("failed to build queue client");
    queue.init().await.expect("failed to init consumer groups");

    let job = test_job(5);
    queue.enqueue(&job, &EnqueueOptions::default()).await.expect("enqueue failed");

    // Stall and reclaim it `max_stalled_count` times; each reclaim should
    // still hand the job back out.
    for _ in 0..2 {
        let result = queue
            .claim_stalled("worker-b", Duration::from_millis(0))
            .await
            .expect("claim_stalled failed");
        assert_eq!(result.claimed.len(), 1, "job should still be reclaimable under the cap");
        assert!(result.exhausted.is_empty());
    }

    // One more stall past the cap must fail the job terminally instead of
    // redelivering it again.
    let result = queue
        .claim_stalled("worker-b", Duration::from_millis(0))
        .await
        .expect("claim_stalled failed");
    assert!(result.claimed.is_empty(), "job must not be redelivered past max_stalled_count");
    assert_eq!(result.exhausted.len(), 1);
    assert_eq!(result.exhausted[0].job_id, job.job_id);

    // And it must be gone from the stream/PEL entirely now.
    let followup = queue
        .claim_stalled("worker-b", Duration::from_millis(0))
        .await
        .expect("claim_stalled failed");
    assert!(followup.claimed.is_empty());
    assert!(followup.exhausted.is_empty());
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_cancel_prevents_a_waiting_job_from_being_reserved() {
    let queue = fresh_queue("cancel-waiting").await;
    let job = test_job(5);

    queue.enqueue(&job, &EnqueueOptions::default()).await.expect("enqueue failed");

    let cancelled = queue.cancel(&job, None).await.expect("cancel failed");
    assert!(cancelled);

    let reserved = queue.reserve("worker-a", Duration::from_secs(30)).await.expect("reserve failed");
    assert!(reserved.is_none(), "a cancelled waiting job must never be handed to a worker");
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_higher_priority_reserved_before_lower() {
    let queue = fresh_queue("priority-order").await;
    let low = test_job(9);
    let high = test_job(1);

    queue.enqueue(&low, &EnqueueOptions { priority: 9, ..EnqueueOptions::default() }).await.expect("enqueue failed");
    queue.enqueue(&high, &EnqueueOptions { priority: 1, ..EnqueueOptions::default() }).await.expect("enqueue failed");

    let (first, lease) = queue
        .reserve("worker-a", Duration::from_secs(30))
        .await
        .expect("reserve failed")
        .expect("expected a job to be reserved");
    assert_eq!(first.job_id, high.job_id, "the priority-1 job must be served before priority-9");
    queue.ack(&lease).await.expect("ack failed");
}
