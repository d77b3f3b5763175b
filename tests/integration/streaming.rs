//! Streaming mode end-to-end behavior

use std::sync::Arc;

use vedetta::stream::StreamQueue;
use vedetta::tree::visitor::Visitor;
use vedetta::tree::{AggregatedStats, GroupNode, LeafNode, ROOT_KEY};
use vedetta::PipelineError;

use crate::helpers::*;

/// Captures each leaf's temperature history in storage order.
#[derive(Default)]
struct HistoryVisitor {
    histories: Vec<(String, Vec<f64>)>,
}

impl Visitor for HistoryVisitor {
    fn reset(&mut self) {
        self.histories.clear();
    }

    fn visit_group(&mut self, _group: &GroupNode, _stats: &AggregatedStats) {}

    fn visit_leaf(&mut self, leaf: &LeafNode, _stats: &AggregatedStats) {
        if self.histories.iter().any(|(serial, _)| *serial == leaf.serial) {
            return;
        }

        self.histories.push((
            leaf.serial.clone(),
            leaf.history.iter().map(|r| r.temperature).collect(),
        ));
    }

    fn result(&self) -> String {
        format!("{:?}", self.histories)
    }
}

#[tokio::test]
async fn stream_processes_lines_in_enqueue_order() {
    let pipeline = Arc::new(build_pipeline());
    let queue = StreamQueue::new(10);

    // three readings for one sensor, strictly increasing
    let lines = vec![
        temp_line("111", 2000, 90),
        temp_line("111", 2100, 90),
        temp_line("111", 2200, 90),
    ];

    Arc::clone(&pipeline).run_stream(lines, &queue).await.unwrap();

    let mut visitor = HistoryVisitor::default();
    pipeline.tree().apply_visitor(&mut visitor);

    let (serial, history) = &visitor.histories[0];
    assert_eq!(serial, "111");
    assert_eq!(history, &vec![20.0, 21.0, 22.0]);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn produced_equals_consumed_after_stop() {
    let pipeline = Arc::new(build_pipeline());
    // capacity far below line count forces the producer to wait on the consumer
    let queue = StreamQueue::new(5);

    let lines: Vec<String> = (0..200u32)
        .map(|i| temp_line(&format!("{i}"), 2000, 80))
        .collect();

    Arc::clone(&pipeline).run_stream(lines, &queue).await.unwrap();

    let status = pipeline.actors().status().await.unwrap();
    assert_eq!(status.processed, 200);

    let root = pipeline.tree().group_stats(ROOT_KEY).unwrap();
    assert_eq!(root.data_point_count, 200);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn queue_rejects_producers_after_run_completes() {
    let pipeline = Arc::new(build_pipeline());
    let queue = StreamQueue::new(4);

    Arc::clone(&pipeline)
        .run_stream(vec![temp_line("1", 2000, 80)], &queue)
        .await
        .unwrap();

    let result = queue.produce(temp_line("2", 2000, 80)).await;
    assert!(matches!(result, Err(PipelineError::QueueClosed)));

    pipeline.shutdown().await;
}

#[tokio::test]
async fn bad_lines_inside_the_stream_do_not_stop_it() {
    let pipeline = Arc::new(build_pipeline());
    let queue = StreamQueue::new(4);

    let lines = vec![
        temp_line("1", 2000, 80),
        "complete garbage".to_string(),
        temp_line("2", 2000, 80),
    ];

    Arc::clone(&pipeline).run_stream(lines, &queue).await.unwrap();

    let status = pipeline.actors().status().await.unwrap();
    assert_eq!(status.processed, 2);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn raw_event_subscribers_see_lines_on_produce() {
    let pipeline = Arc::new(build_pipeline());
    let queue = StreamQueue::new(4);
    let mut raw_rx = queue.subscribe_raw();

    let line = temp_line("1", 2000, 80);
    Arc::clone(&pipeline).run_stream(vec![line.clone()], &queue).await.unwrap();

    assert_eq!(raw_rx.recv().await.unwrap(), line);

    pipeline.shutdown().await;
}
