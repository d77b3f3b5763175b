//! Actor subsystem behavior through the public handles

use std::collections::HashMap;

use vedetta::actors::{ActorSubsystem, Thresholds};
use vedetta::{PipelineError, SensorRecord, SensorType};

fn temp_record(serial: &str, temperature: f64) -> SensorRecord {
    SensorRecord {
        serial: serial.to_string(),
        kind: SensorType::Temp,
        temperature,
        ..Default::default()
    }
}

#[tokio::test]
async fn analyze_aggregates_only_matching_sensors() {
    let subsystem = ActorSubsystem::spawn(HashMap::new());

    subsystem.send(temp_record("111", 20.0)).await.unwrap();
    subsystem.send(temp_record("111", 30.0)).await.unwrap();

    let mut humidity = SensorRecord {
        serial: "222".to_string(),
        kind: SensorType::Humidity,
        humidity: 55.0,
        ..Default::default()
    };
    humidity.battery_level = 40.0;
    humidity.battery_max = 100.0;
    subsystem.send(humidity).await.unwrap();

    let stats = subsystem.analyze_type(SensorType::Temp).await.unwrap();
    assert_eq!(stats.count, 1);
    assert_eq!(stats.temperature, 25.0);

    let stats = subsystem.analyze_type(SensorType::Humidity).await.unwrap();
    assert_eq!(stats.count, 1);
    assert_eq!(stats.humidity, 55.0);
    assert_eq!(stats.battery_level, 40.0);

    let stats = subsystem.analyze_type(SensorType::Battery).await.unwrap();
    assert_eq!(stats.count, 0);

    subsystem.shutdown().await;
}

#[tokio::test]
async fn status_counts_processed_and_distinct_sensors() {
    let subsystem = ActorSubsystem::spawn(HashMap::new());

    for i in 0..20 {
        subsystem
            .send(temp_record(&format!("{}", i % 5), 20.0))
            .await
            .unwrap();
    }

    let status = subsystem.status().await.unwrap();
    assert_eq!(status.processed, 20);
    assert_eq!(status.active_sensors, 5);

    subsystem.shutdown().await;
}

#[tokio::test]
async fn alert_log_preserves_ingest_order() {
    let subsystem = ActorSubsystem::spawn(HashMap::new());

    subsystem.send(temp_record("a", 35.0)).await.unwrap();
    subsystem.send(temp_record("b", 5.0)).await.unwrap();
    subsystem.send(temp_record("c", 40.0)).await.unwrap();

    let alerts = subsystem.alerts().await.unwrap();
    let lines: Vec<&str> = alerts.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("HIGH TEMP ALERT: Sensor a"));
    assert!(lines[1].contains("LOW TEMP ALERT: Sensor b"));
    assert!(lines[2].contains("HIGH TEMP ALERT: Sensor c"));

    subsystem.shutdown().await;
}

#[tokio::test]
async fn unknown_type_uses_default_thresholds() {
    let subsystem = ActorSubsystem::spawn(HashMap::new());

    let mut record = SensorRecord {
        serial: "x".to_string(),
        ..Default::default()
    };
    record.temperature = 31.0;
    subsystem.send(record).await.unwrap();

    let alerts = subsystem.alerts().await.unwrap();
    assert!(alerts.contains("HIGH TEMP ALERT: Sensor x reported 31°C (threshold: 30°C)"));

    subsystem.shutdown().await;
}

#[tokio::test]
async fn per_type_thresholds_are_respected() {
    let mut thresholds = HashMap::new();
    thresholds.insert(
        SensorType::Temp,
        Thresholds {
            temp_high: 50.0,
            ..Default::default()
        },
    );
    let subsystem = ActorSubsystem::spawn(thresholds);

    subsystem.send(temp_record("y", 35.0)).await.unwrap();
    assert_eq!(subsystem.alerts().await.unwrap(), "");

    subsystem.send(temp_record("y", 55.0)).await.unwrap();
    assert!(subsystem.alerts().await.unwrap().contains("HIGH TEMP ALERT"));

    subsystem.shutdown().await;
}

#[tokio::test]
async fn sends_after_shutdown_surface_actor_stopped() {
    let subsystem = ActorSubsystem::spawn(HashMap::new());
    subsystem.shutdown().await;

    let result = subsystem.send(temp_record("z", 20.0)).await;
    assert!(matches!(result, Err(PipelineError::ActorStopped(_))));

    let result = subsystem.status().await;
    assert!(matches!(result, Err(PipelineError::ActorStopped(_))));
}
