//! End-to-end pipeline scenarios

use std::sync::Arc;

use vedetta::observers::Observer;
use vedetta::tree::ROOT_KEY;
use vedetta::{SensorRecord, SensorType};

use crate::helpers::*;

#[tokio::test]
async fn standard_line_lands_in_every_subsystem() {
    let pipeline = build_pipeline();

    pipeline
        .process_record("serial:111temp:2450type:tempbat:80batmax:100state:OK")
        .await;

    // registry
    assert_eq!(pipeline.registry().get("111"), SensorType::Temp);
    assert_eq!(pipeline.registry().count(), 1);

    // composite tree
    let root = pipeline.tree().group_stats(ROOT_KEY).unwrap();
    assert_eq!(root.data_point_count, 1);
    assert_eq!(root.temperature, 24.5);
    assert_eq!(root.battery_level, 80.0);

    // actors
    let status = pipeline.actors().status().await.unwrap();
    assert_eq!(status.processed, 1);
    assert_eq!(status.active_sensors, 1);
    assert_eq!(pipeline.actors().alerts().await.unwrap(), "");

    pipeline.shutdown().await;
}

#[tokio::test]
async fn manufacturer_line_triggers_temp_and_battery_alerts() {
    let pipeline = build_pipeline();

    pipeline
        .process_record("manu:Qualcommserial:333temp:3150type:tempbat:25batmax:100")
        .await;

    let alerts = pipeline.actors().alerts().await.unwrap();
    assert!(alerts.contains("HIGH TEMP ALERT: Sensor 333 reported 31.5°C (threshold: 30°C)"));
    assert!(alerts.contains("LOW BATTERY ALERT: Sensor 333 battery at 25.0% (threshold: 30%)"));

    pipeline.shutdown().await;
}

#[tokio::test]
async fn garbage_lines_are_dropped_without_side_effects() {
    let pipeline = build_pipeline();

    pipeline.process_record("garbage:data").await;
    pipeline.process_record("").await;
    pipeline.process_record("temp:2450serial:1").await;

    assert_eq!(pipeline.registry().count(), 0);
    assert_eq!(pipeline.tree().sensor_count(), 0);
    assert_eq!(pipeline.actors().status().await.unwrap().processed, 0);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn temperature_analyzer_reports_critical_after_hot_reading() {
    let pipeline = build_pipeline();

    pipeline
        .process_record("serial:111temp:2450type:tempbat:80batmax:100state:OK")
        .await;
    pipeline
        .process_record("manu:Qualcommserial:333temp:3150type:tempbat:25batmax:100")
        .await;

    let report = pipeline.analyzers().report_for(SensorType::Temp).unwrap();
    assert!(report.contains("Maximum: 31.50°C"));
    assert!(report.contains("Minimum: 24.50°C"));
    assert!(report.contains("Status: CRITICAL"));

    pipeline.shutdown().await;
}

#[tokio::test]
async fn organize_by_manufacturer_partitions_by_serial_prefix() {
    let pipeline = build_pipeline();

    pipeline
        .process_record("serial:111temp:2450type:tempbat:80batmax:100state:OK")
        .await;
    pipeline
        .process_record("manu:Qualcommserial:333temp:3150type:tempbat:25batmax:100")
        .await;

    pipeline.tree().organize_by_manufacturer();

    let qualcomm = pipeline.tree().group_stats("Manufacturer: Qualcomm").unwrap();
    assert_eq!(qualcomm.data_point_count, 1);
    assert_eq!(qualcomm.temperature, 24.5);

    let nxp = pipeline.tree().group_stats("Manufacturer: NXP").unwrap();
    assert_eq!(nxp.data_point_count, 1);
    assert_eq!(nxp.temperature, 31.5);

    // leaves stay members of the root; nothing is double counted
    let root = pipeline.tree().group_stats(ROOT_KEY).unwrap();
    assert_eq!(root.data_point_count, 2);
    assert_eq!(pipeline.tree().sensor_count(), 2);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn distinct_serials_each_become_one_sensor() {
    let pipeline = build_pipeline();

    for i in 0..10 {
        pipeline.process_record(&temp_line(&format!("10{i}"), 2000, 90)).await;
    }

    assert_eq!(pipeline.tree().sensor_count(), 10);
    let root = pipeline.tree().group_stats(ROOT_KEY).unwrap();
    assert_eq!(root.data_point_count, 10);

    pipeline.shutdown().await;
}

struct FailingObserver;

impl Observer for FailingObserver {
    fn name(&self) -> &str {
        "failing"
    }

    fn notify(&self, _record: &SensorRecord) -> anyhow::Result<()> {
        anyhow::bail!("observer exploded")
    }
}

#[tokio::test]
async fn failing_observer_does_not_affect_other_observers() {
    let pipeline = build_pipeline();

    pipeline.observers().attach(Arc::new(FailingObserver));

    pipeline.process_record(&temp_line("111", 2450, 80)).await;
    pipeline.process_record(&humidity_line("222", 50)).await;

    // the bundled stats collector kept receiving records
    assert_eq!(pipeline.stats().total(), 2);
    assert_eq!(pipeline.stats().count_for(SensorType::Temp), 1);
    assert_eq!(pipeline.stats().count_for(SensorType::Humidity), 1);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn synthetic_serial_is_assigned_for_manufacturer_only_lines() {
    let pipeline = build_pipeline();

    pipeline.process_record("manufac:Infineontemp:22type:temp").await;

    assert_eq!(pipeline.tree().sensor_count(), 1);
    let status = pipeline.actors().status().await.unwrap();
    assert_eq!(status.active_sensors, 1);

    let snapshot = pipeline.registry().snapshot();
    let serial = snapshot.keys().next().unwrap();
    assert!(serial.starts_with("Unknown-"));

    pipeline.shutdown().await;
}
