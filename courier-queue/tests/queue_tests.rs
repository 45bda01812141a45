//! Integration tests for the email queue lifecycle, retries and dead letters
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use courier_queue::{
    DeliveryError, EmailQueue, EnqueueError, Immediate, Job, JobBuffer, QueueConfig, QueueState,
    Requeue, Signal, Transport,
};
use pretty_assertions::assert_eq;
use tokio::{sync::broadcast, time::timeout};

/// Transport that fails every attempt and counts them
#[derive(Default)]
struct AlwaysFail {
    attempts: AtomicUsize,
}

#[async_trait]
impl Transport for AlwaysFail {
    async fn deliver(&self, _job: &Job) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DeliveryError::Failed("mailbox unavailable".to_string()))
    }
}

/// Transport that accepts every attempt and counts them
#[derive(Default)]
struct AlwaysSucceed {
    delivered: AtomicUsize,
}

#[async_trait]
impl Transport for AlwaysSucceed {
    async fn deliver(&self, _job: &Job) -> Result<(), DeliveryError> {
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Transport that blocks until the test releases it
struct Gate {
    release: tokio::sync::Semaphore,
}

#[async_trait]
impl Transport for Gate {
    async fn deliver(&self, _job: &Job) -> Result<(), DeliveryError> {
        let permit = self.release.acquire().await;
        drop(permit);
        Ok(())
    }
}

fn config(workers: usize, capacity: usize) -> QueueConfig {
    QueueConfig {
        workers,
        capacity,
        ..Default::default()
    }
}

fn job(n: usize) -> Job {
    Job::new(format!("user{n}@example.com"), format!("Subject {n}"), "Body")
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failing_job_is_dead_lettered_after_three_retries() {
    let (shutdown, _) = broadcast::channel(1);
    let transport = Arc::new(AlwaysFail::default());
    let queue = EmailQueue::new(config(1, 1), Arc::clone(&transport)).unwrap();

    queue.start_workers(shutdown.subscribe()).unwrap();
    queue
        .enqueue(Job::new("user@example.com", "Welcome", "Hello there"))
        .unwrap();

    wait_until(|| !queue.dead_letters().is_empty()).await;

    queue.shutdown();
    timeout(Duration::from_secs(5), queue.wait()).await.unwrap();

    let dead = queue.dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].to, "user@example.com");
    assert_eq!(dead[0].subject, "Welcome");
    assert_eq!(dead[0].body, "Hello there");
    assert_eq!(dead[0].retry_count(), 4);
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_successful_jobs_never_reach_dead_letters() {
    let (shutdown, _) = broadcast::channel(1);
    let transport = Arc::new(AlwaysSucceed::default());
    let queue = EmailQueue::new(config(3, 10), Arc::clone(&transport)).unwrap();

    queue.start_workers(shutdown.subscribe()).unwrap();
    for n in 0..5 {
        queue.enqueue(job(n)).unwrap();
    }

    wait_until(|| transport.delivered.load(Ordering::SeqCst) == 5).await;

    queue.shutdown();
    timeout(Duration::from_secs(5), queue.wait()).await.unwrap();

    assert_eq!(queue.state(), QueueState::Drained);
    assert!(queue.dead_letters().is_empty());
}

#[tokio::test]
async fn test_second_enqueue_into_single_slot_is_full() {
    let queue = EmailQueue::new(config(1, 1), AlwaysSucceed::default()).unwrap();

    queue.enqueue(job(1)).unwrap();
    assert_eq!(queue.enqueue(job(2)), Err(EnqueueError::Full(job(2))));
}

#[tokio::test]
async fn test_enqueue_after_shutdown_is_closed() {
    let (shutdown, _) = broadcast::channel(1);
    let queue = EmailQueue::new(config(2, 4), AlwaysSucceed::default()).unwrap();

    queue.start_workers(shutdown.subscribe()).unwrap();
    queue.shutdown();

    assert_eq!(queue.enqueue(job(1)), Err(EnqueueError::Closed(job(1))));
    timeout(Duration::from_secs(5), queue.wait()).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_with_full_buffer_terminates() {
    let (shutdown, _) = broadcast::channel(1);
    let gate = Arc::new(Gate {
        release: tokio::sync::Semaphore::new(0),
    });
    let queue = EmailQueue::new(config(2, 8), Arc::clone(&gate)).unwrap();

    queue.start_workers(shutdown.subscribe()).unwrap();
    for n in 0..8 {
        queue.enqueue(job(n)).unwrap();
    }

    queue.shutdown();
    gate.release.add_permits(usize::MAX >> 4);

    timeout(Duration::from_secs(5), queue.wait())
        .await
        .expect("workers should drain and exit");
    assert_eq!(queue.state(), QueueState::Drained);
}

#[tokio::test]
async fn test_shutdown_signal_stops_idle_workers() {
    let (shutdown, _) = broadcast::channel(1);
    let queue = EmailQueue::new(config(3, 4), AlwaysSucceed::default()).unwrap();

    queue.start_workers(shutdown.subscribe()).unwrap();
    tokio::task::yield_now().await;

    shutdown.send(Signal::Shutdown).unwrap();
    timeout(Duration::from_secs(5), queue.wait())
        .await
        .expect("workers should observe the signal");

    assert_eq!(queue.state(), QueueState::Drained);
    assert!(queue.enqueue(job(1)).unwrap_err().is_closed());
}

#[tokio::test]
async fn test_signal_sent_before_start_stops_workers() {
    let (shutdown, receiver) = broadcast::channel(1);
    let transport = Arc::new(AlwaysSucceed::default());
    let queue = EmailQueue::new(config(2, 4), Arc::clone(&transport)).unwrap();
    queue.enqueue(job(1)).unwrap();

    shutdown.send(Signal::Shutdown).unwrap();
    queue.start_workers(receiver).unwrap();
    assert_eq!(queue.state(), QueueState::ShuttingDown);

    timeout(Duration::from_secs(2), queue.wait())
        .await
        .expect("an already-sent signal should stop the pool");

    assert_eq!(queue.state(), QueueState::Drained);
    assert_eq!(transport.delivered.load(Ordering::SeqCst), 0);
    assert!(queue.enqueue(job(2)).unwrap_err().is_closed());
}

#[tokio::test]
async fn test_dropped_signal_sender_keeps_workers_running() {
    let (shutdown, receiver) = broadcast::channel::<Signal>(1);
    let transport = Arc::new(AlwaysSucceed::default());
    let queue = EmailQueue::new(config(1, 2), Arc::clone(&transport)).unwrap();

    queue.start_workers(receiver).unwrap();
    drop(shutdown);

    queue.enqueue(job(1)).unwrap();
    wait_until(|| transport.delivered.load(Ordering::SeqCst) == 1).await;
    assert_eq!(queue.state(), QueueState::WorkersRunning);

    queue.shutdown();
    timeout(Duration::from_secs(5), queue.wait()).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_wait_is_safe_alongside_shutdown() {
    let (shutdown, _) = broadcast::channel(1);
    let queue = Arc::new(EmailQueue::new(config(2, 2), AlwaysSucceed::default()).unwrap());
    queue.start_workers(shutdown.subscribe()).unwrap();

    let waiter = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.wait().await })
    };
    let second_waiter = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.wait().await })
    };

    queue.shutdown();

    timeout(Duration::from_secs(5), waiter).await.unwrap().unwrap();
    timeout(Duration::from_secs(5), second_waiter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(queue.state(), QueueState::Drained);
}

/// Requeue strategy that records every resubmission before delegating
#[derive(Debug, Default)]
struct Recording {
    requeued: AtomicUsize,
}

impl Requeue for Recording {
    fn requeue(&self, buffer: &JobBuffer, job: Job) -> Result<(), EnqueueError> {
        self.requeued.fetch_add(1, Ordering::SeqCst);
        Immediate.requeue(buffer, job)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_custom_requeue_sees_every_retry() {
    let (shutdown, _) = broadcast::channel(1);
    let requeue = Arc::new(Recording::default());
    let queue =
        EmailQueue::with_requeue(config(1, 1), AlwaysFail::default(), requeue.clone()).unwrap();

    queue.start_workers(shutdown.subscribe()).unwrap();
    queue.enqueue(job(1)).unwrap();

    wait_until(|| queue.dead_letters().len() == 1).await;
    assert_eq!(requeue.requeued.load(Ordering::SeqCst), 3);

    queue.shutdown();
    timeout(Duration::from_secs(5), queue.wait()).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_custom_retry_limit() {
    let (shutdown, _) = broadcast::channel(1);
    let mut config = config(1, 1);
    config.retry.retry_limit = 1;
    let queue = EmailQueue::new(config, AlwaysFail::default()).unwrap();

    queue.start_workers(shutdown.subscribe()).unwrap();
    queue.enqueue(job(1)).unwrap();

    wait_until(|| queue.dead_letters().len() == 1).await;
    assert_eq!(queue.dead_letters()[0].retry_count(), 2);

    queue.shutdown();
    timeout(Duration::from_secs(5), queue.wait()).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_each_failing_job_dead_lettered_once() {
    let (shutdown, _) = broadcast::channel(1);
    let queue = EmailQueue::new(config(4, 16), AlwaysFail::default()).unwrap();

    queue.start_workers(shutdown.subscribe()).unwrap();
    for n in 0..4 {
        queue.enqueue(job(n)).unwrap();
    }

    wait_until(|| queue.dead_letters().len() == 4).await;
    queue.shutdown();
    timeout(Duration::from_secs(5), queue.wait()).await.unwrap();

    let mut recipients: Vec<_> = queue.dead_letters().into_iter().map(|j| j.to).collect();
    recipients.sort();
    assert_eq!(
        recipients,
        (0..4).map(|n| format!("user{n}@example.com")).collect::<Vec<_>>()
    );
    assert!(queue.dead_letters().iter().all(|j| j.retry_count() == 4));
}
