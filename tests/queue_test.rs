//! Integration tests for the work queue.

use std::sync::Arc;
use std::time::Duration;

use jobpool::model::{Job, JobId, Task};
use jobpool::queue::WorkQueue;
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn job(n: u64) -> Job {
    let task: Task = Box::new(move || Ok(json!(n)));
    Job::new(JobId(n), task)
}

#[test]
fn jobs_come_out_in_push_order() {
    let queue = WorkQueue::new();
    for n in 0..5 {
        queue.push(job(n));
    }
    assert_eq!(queue.pending_count(), 5);

    let order: Vec<u64> = std::iter::from_fn(|| queue.try_pop())
        .map(|job| job.id.seq())
        .collect();
    assert_eq!(order, vec![0, 1, 2, 3, 4]);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn pop_timeout_elapses_on_empty_queue() {
    let queue = WorkQueue::new();
    let popped = queue.pop_timeout(Duration::from_millis(20)).await;
    assert!(popped.is_none());
}

#[tokio::test]
async fn pop_timeout_returns_available_job() {
    let queue = WorkQueue::new();
    queue.push(job(3));
    let popped = queue.pop_timeout(Duration::from_millis(20)).await.unwrap();
    assert_eq!(popped.id, JobId(3));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn waiting_pop_wakes_on_push() {
    let queue = Arc::new(WorkQueue::new());
    let token = CancellationToken::new();

    let waiter = {
        let queue = Arc::clone(&queue);
        let token = token.clone();
        tokio::spawn(async move { queue.pop(&token).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    queue.push(job(7));

    let popped = tokio::time::timeout(Duration::from_secs(2), waiter)
        .await
        .expect("pop should wake")
        .unwrap();
    assert_eq!(popped.unwrap().id, JobId(7));
}

#[tokio::test]
async fn cancelled_pop_drains_before_returning_none() {
    let queue = WorkQueue::new();
    queue.push(job(0));
    queue.push(job(1));

    let token = CancellationToken::new();
    token.cancel();

    assert_eq!(queue.pop(&token).await.unwrap().id, JobId(0));
    assert_eq!(queue.pop(&token).await.unwrap().id, JobId(1));
    assert!(queue.pop(&token).await.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_wakes_idle_waiter() {
    let queue = Arc::new(WorkQueue::new());
    let token = CancellationToken::new();

    let waiter = {
        let queue = Arc::clone(&queue);
        let token = token.clone();
        tokio::spawn(async move { queue.pop(&token).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    token.cancel();

    let popped = tokio::time::timeout(Duration::from_secs(2), waiter)
        .await
        .expect("cancel should wake the waiter")
        .unwrap();
    assert!(popped.is_none());
}

#[test]
fn pending_count_excludes_taken_jobs() {
    let queue = WorkQueue::new();
    queue.push(job(0));
    queue.push(job(1));
    let _taken = queue.try_pop();
    assert_eq!(queue.pending_count(), 1);
}
