mod common;

use common::{MockDriver, slow};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use upool::{DbError, Pool, PoolOptions};

#[derive(Debug, Deserialize)]
struct Echo {
    tag: String,
}

async fn queued(
    workers: usize,
    queue: usize,
    timeout: Duration,
) -> (Pool, Arc<common::Stats>) {
    let driver = MockDriver::new();
    let stats = driver.stats.clone();
    let options = PoolOptions::new(workers).queue(queue).timeout(timeout);
    (Pool::with_options(driver, options).await.unwrap(), stats)
}

#[tokio::test]
async fn test_excess_demand_is_queued_not_rejected() {
    let (pool, stats) = queued(2, 2, Duration::from_secs(1)).await;

    let mut calls = Vec::new();
    for i in 0..10 {
        let pool = pool.clone();
        calls.push(tokio::spawn(async move {
            pool.get::<Echo>("SELECT", &slow(20, &format!("q{}", i))).await
        }));
    }
    for (i, call) in calls.into_iter().enumerate() {
        let echo = call.await.unwrap().unwrap();
        assert_eq!(echo.tag, format!("q{}", i));
    }
    assert_eq!(stats.completed.load(Ordering::SeqCst), 10);
    assert!(stats.max_in_flight.load(Ordering::SeqCst) <= 2);

    pool.close().await.unwrap();
    assert_eq!(stats.total_closes(), 2);
}

#[tokio::test]
async fn test_queue_depth_never_exceeds_capacity() {
    let (pool, _) = queued(1, 3, Duration::from_secs(2)).await;

    let mut calls = Vec::new();
    for i in 0..8 {
        let pool = pool.clone();
        calls.push(tokio::spawn(async move {
            pool.exec("INSERT", &slow(30, &format!("d{}", i))).await
        }));
    }
    let mut deepest = 0;
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        deepest = deepest.max(pool.status().queued);
    }
    assert!(deepest <= 3);

    for call in calls {
        assert_eq!(call.await.unwrap().unwrap().rows_affected().unwrap(), 1);
    }
}

#[tokio::test]
async fn test_timeout_still_enforced_per_worker() {
    let (pool, _) = queued(1, 4, Duration::from_millis(10)).await;

    let start = Instant::now();
    let result = pool.exec("UPDATE", &slow(200, "slow")).await.unwrap();
    assert!(result.is_timeout());
    assert!(start.elapsed() < Duration::from_millis(150));

    let echo: Echo = pool
        .with_timeout(Duration::from_secs(1))
        .get("SELECT", &slow(0, "after"))
        .await
        .unwrap();
    assert_eq!(echo.tag, "after");
    assert!(start.elapsed() >= Duration::from_millis(180));
}

#[tokio::test]
async fn test_close_rejects_pending_submitters() {
    let (pool, stats) = queued(1, 1, Duration::from_secs(5)).await;

    // occupies the only dispatcher and worker
    let running = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.exec("INSERT", &slow(200, "running")).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // sits in the queue's only slot, then one more waits for room
    let mut pending = Vec::new();
    for i in 0..2 {
        let pool = pool.clone();
        pending.push(tokio::spawn(async move {
            pool.exec("INSERT", &slow(0, &format!("pending{}", i))).await
        }));
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    pool.close().await.unwrap();

    let result = running.await.unwrap().unwrap();
    assert_eq!(result.rows_affected().unwrap(), 1);
    for call in pending {
        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(err, DbError::PoolClosed));
    }
    assert_eq!(stats.completed.load(Ordering::SeqCst), 1);
    assert_eq!(stats.total_closes(), 1);
}
