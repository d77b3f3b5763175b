//! Concurrent pipeline behavior
//!
//! The coordinator must be safe to call from many tasks at once; the worker
//! pool bounds how many records are in flight; totals must come out exact
//! regardless of interleaving.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use vedetta::pool::WorkerPool;
use vedetta::tree::ROOT_KEY;

use crate::helpers::*;

#[tokio::test]
async fn pool_batch_of_50_lines_processes_every_record() {
    let pipeline = Arc::new(build_pipeline());
    let pool = WorkerPool::new(8);

    let lines: Vec<String> = (0..50)
        .map(|i| temp_line(&format!("{}", 100 + i), 2000 + i * 10, 90))
        .collect();

    Arc::clone(&pipeline).run_pool(lines, &pool).await;

    let status = pipeline.actors().status().await.unwrap();
    assert_eq!(status.processed, 50);
    assert_eq!(status.active_sensors, 50);

    let root = pipeline.tree().group_stats(ROOT_KEY).unwrap();
    assert_eq!(root.data_point_count, 50);
    assert_eq!(pipeline.registry().count(), 50);
    assert_eq!(pipeline.stats().total(), 50);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn repeated_serials_collapse_to_distinct_sensors() {
    let pipeline = Arc::new(build_pipeline());
    let pool = WorkerPool::new(4);

    // 40 records over 4 serials
    let lines: Vec<String> = (0..40)
        .map(|i| temp_line(&format!("{}", i % 4), 2100, 80))
        .collect();

    Arc::clone(&pipeline).run_pool(lines, &pool).await;

    let status = pipeline.actors().status().await.unwrap();
    assert_eq!(status.processed, 40);
    assert_eq!(status.active_sensors, 4);
    assert_eq!(pipeline.tree().sensor_count(), 4);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn concurrent_direct_calls_do_not_lose_records() {
    let pipeline = Arc::new(build_pipeline());

    let mut tasks = Vec::new();
    for i in 0..16 {
        let pipeline = Arc::clone(&pipeline);
        tasks.push(tokio::spawn(async move {
            for j in 0..5 {
                pipeline
                    .process_record(&temp_line(&format!("{i}-{j}"), 2200, 70))
                    .await;
            }
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }

    let status = pipeline.actors().status().await.unwrap();
    assert_eq!(status.processed, 80);
    assert_eq!(pipeline.tree().sensor_count(), 80);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn pool_reaches_but_never_exceeds_configured_parallelism() {
    let pool = WorkerPool::new(4);
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    pool.process_batch(0..32, |_| {
        let current = Arc::clone(&current);
        let peak = Arc::clone(&peak);
        async move {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            current.fetch_sub(1, Ordering::SeqCst);
        }
    })
    .await;

    let peak = peak.load(Ordering::SeqCst);
    assert!(peak >= 2, "expected some overlap, saw peak {peak}");
    assert!(peak <= 4, "parallelism bound exceeded: {peak}");
}

#[tokio::test]
async fn concurrent_registry_and_tree_queries_during_ingest() {
    let pipeline = Arc::new(build_pipeline());

    let writer = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            for i in 0..50 {
                pipeline.process_record(&temp_line(&format!("{i}"), 2300, 60)).await;
            }
        })
    };

    let reader = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            for _ in 0..50 {
                let _ = pipeline.registry().snapshot();
                let _ = pipeline.tree().group_stats(ROOT_KEY);
                tokio::task::yield_now().await;
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();

    assert_eq!(pipeline.tree().sensor_count(), 50);

    pipeline.shutdown().await;
}
