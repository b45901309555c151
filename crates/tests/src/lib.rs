//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Wire contract snapshots
//! - Mock end-to-end runs (no device or network required)

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{FilterFlags, InternalStates, OrientationResult, Publication, TimeUnit};

    #[test]
    fn test_blueprint_survives_json_round_trip() {
        let blueprint = ConfigLoader::load_from_str(
            r#"
[[sources]]
name = "phone"
kind = { type = "websocket", address = "10.0.0.128:8080" }

[[sources]]
name = "bridge"
kind = { type = "tcp", address = "10.0.0.5:7000", codec = "serial_line" }
reconnect = { backoff_ms = 250, connect_timeout_ms = 1000 }

[[sources]]
name = "recording"
kind = { type = "replay", path = "session.log", interval_ms = 5 }

[synchronizer]
policy = "retain"

[[distributor.subscribers]]
name = "tcp"
subscriber_type = "network"
queue_capacity = 4
params = { addr = "127.0.0.1:9100", backoff_ms = "100" }
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let json = ConfigLoader::to_json(&blueprint).unwrap();
        let reloaded = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();

        assert_eq!(
            serde_json::to_value(&blueprint).unwrap(),
            serde_json::to_value(&reloaded).unwrap()
        );
        assert_eq!(reloaded.sources.len(), 3);
        assert_eq!(reloaded.source("bridge").unwrap().reconnect.backoff_ms, 250);
        assert_eq!(reloaded.effective_time_unit(), TimeUnit::Microseconds);
    }

    #[test]
    fn test_broadcast_json_shape() {
        let result = OrientationResult {
            timestamp: 200,
            quaternion: [1.0, 0.0, 0.0, 0.0],
            euler_angles: [0.0, 0.0, 0.0],
            internal_states: InternalStates::default(),
            flags: FilterFlags::default(),
            orientation: None,
        };

        let json = serde_json::to_value(Publication::Orientation(result)).unwrap();
        let object = json.as_object().unwrap();

        for key in [
            "timestamp",
            "quaternion",
            "euler_angles",
            "internal_states",
            "flags",
        ] {
            assert!(object.contains_key(key), "missing {key}");
        }
        assert!(!object.contains_key("orientation"));
        assert_eq!(json["quaternion"].as_array().unwrap().len(), 4);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use async_channel::Receiver;
    use contracts::{
        ControlKind, EmissionPolicy, EstimatorConfig, OrientationResult, Publication,
        ReconnectConfig, SourceEvent, TimeUnit,
    };
    use dispatcher::{ChannelSubscriber, Distributor};
    use estimator::OrientationEstimator;
    use ingestion::{
        IngestionPipeline, LineCodec, MockConnector, MockSession, ReconnectingAdapter, SessionEnd,
    };
    use sync_engine::StreamSynchronizer;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn json_line(sensor_type: &str, timestamp: i64, values: [f64; 3]) -> String {
        format!(
            r#"{{"type":"android.sensor.{sensor_type}","values":[{},{},{}],"timestamp":{timestamp},"accuracy":3}}"#,
            values[0], values[1], values[2]
        )
    }

    fn gyro(ts: i64) -> String {
        json_line("gyroscope", ts, [0.0, 0.0, 0.0])
    }

    fn accel(ts: i64) -> String {
        json_line("accelerometer", ts, [0.0, 0.0, 9.80665])
    }

    fn mag(ts: i64) -> String {
        json_line("magnetic_field", ts, [20.0, 0.0, -40.0])
    }

    fn reconnect(backoff_ms: u64) -> ReconnectConfig {
        ReconnectConfig {
            backoff_ms,
            connect_timeout_ms: 1_000,
        }
    }

    /// Synchronizer + estimator + distributor driven from one event stream
    struct Chain {
        synchronizer: StreamSynchronizer,
        estimator: OrientationEstimator,
        distributor: Distributor,
    }

    impl Chain {
        fn new(policy: EmissionPolicy, time_unit: TimeUnit) -> Self {
            Self {
                synchronizer: StreamSynchronizer::new(policy),
                estimator: OrientationEstimator::new(EstimatorConfig::default(), time_unit)
                    .unwrap(),
                distributor: Distributor::new(16),
            }
        }

        /// Feed events until `results` orientation results were broadcast
        async fn drive(&mut self, events: &Receiver<SourceEvent>, results: usize) {
            let mut produced = 0;
            while produced < results {
                let event = timeout(Duration::from_secs(30), events.recv())
                    .await
                    .expect("timed out waiting for events")
                    .expect("event channel closed");

                match event {
                    SourceEvent::Sample(sample) => {
                        if let Some(frame) = self.synchronizer.ingest(sample) {
                            let result = self.estimator.estimate(&frame);
                            self.distributor.broadcast(result);
                            produced += 1;
                        }
                    }
                    SourceEvent::Hint(hint) => self.synchronizer.ingest_hint(hint),
                    SourceEvent::Control(_) => {}
                }
            }
        }
    }

    async fn collect(rx: &mut mpsc::Receiver<Publication>, count: usize) -> Vec<OrientationResult> {
        let mut results = Vec::new();
        while results.len() < count {
            let publication = timeout(Duration::from_secs(30), rx.recv())
                .await
                .expect("timed out waiting for publication")
                .expect("subscriber channel closed");
            if let Publication::Orientation(result) = publication {
                results.push(result);
            }
        }
        results
    }

    /// MockConnector -> ReconnectingAdapter -> StreamSynchronizer -> OrientationEstimator -> Distributor
    #[tokio::test]
    async fn test_e2e_mock_pipeline() {
        let mut lines = Vec::new();
        for round in 0..3i64 {
            let base = (round + 1) * 30_000_000;
            lines.push(gyro(base));
            lines.push(accel(base + 10_000_000));
            lines.push(mag(base + 20_000_000));
        }
        lines.push("not json".to_string());

        let connector = MockConnector::new("phone", vec![MockSession::lines(lines, SessionEnd::Hold)]);
        let adapter = ReconnectingAdapter::new("phone", connector, LineCodec::Json);

        let mut ingestion = IngestionPipeline::new(64);
        ingestion.add_source(Box::new(adapter)).unwrap();
        let events = ingestion.take_receiver().unwrap();

        let mut chain = Chain::new(EmissionPolicy::Flush, TimeUnit::Nanoseconds);
        let (first, mut first_rx) = ChannelSubscriber::pair("first", 16);
        let (second, mut second_rx) = ChannelSubscriber::pair("second", 16);
        chain.distributor.register(first);
        chain.distributor.register(second);

        ingestion.start_all();
        chain.drive(&events, 3).await;

        let first_results = collect(&mut first_rx, 3).await;
        let second_results = collect(&mut second_rx, 3).await;
        assert_eq!(first_results, second_results);

        let timestamps: Vec<i64> = first_results.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![50_000_000, 80_000_000, 110_000_000]);
        for result in &first_results {
            let norm: f64 = result.quaternion.iter().map(|v| v * v).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }

        // Malformed trailing line is counted, never reaches the synchronizer
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ingestion.metrics().snapshot().decode_errors, 1);

        ingestion.stop_all().await;
        chain.distributor.shutdown().await;
        assert!(events.recv().await.is_err());
    }

    /// A dropped connection leaves the pending frame intact
    #[tokio::test(start_paused = true)]
    async fn test_e2e_reconnect_keeps_pending_frame() {
        let connector = MockConnector::new(
            "phone",
            vec![
                MockSession::lines([gyro(100), accel(150)], SessionEnd::Reset),
                MockSession::Refuse("refused".into()),
                MockSession::lines([mag(200)], SessionEnd::Hold),
            ],
        );
        let probe = connector.probe();
        let adapter = ReconnectingAdapter::new("phone", connector, LineCodec::Json)
            .with_reconnect(reconnect(2_000));

        let mut ingestion = IngestionPipeline::new(16);
        ingestion.add_source(Box::new(adapter)).unwrap();
        let events = ingestion.take_receiver().unwrap();

        let mut chain = Chain::new(EmissionPolicy::Flush, TimeUnit::Nanoseconds);
        let (subscriber, mut rx) = ChannelSubscriber::pair("out", 16);
        chain.distributor.register(subscriber);

        ingestion.start_all();
        chain.drive(&events, 1).await;

        let results = collect(&mut rx, 1).await;
        assert_eq!(results[0].timestamp, 200);

        let attempts = probe.attempts();
        assert_eq!(attempts.len(), 3);
        for pair in attempts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(2_000));
        }

        ingestion.stop_all().await;
        chain.distributor.shutdown().await;
    }

    /// Serial lines: three samples per line, control markers on their own path
    #[tokio::test]
    async fn test_e2e_serial_board_with_calibration_markers() {
        let lines = [
            "Start compass calibration".to_string(),
            "1000 0.0 0.0 9.81 0.0 0.0 0.0 20.0 0.0 -40.0".to_string(),
            String::new(),
            "End of compass calibration".to_string(),
            "2000 0.0 0.0 9.81 0.01 0.0 0.0 20.0 0.0 -40.0".to_string(),
        ];
        let connector = MockConnector::new("board", vec![MockSession::lines(lines, SessionEnd::Hold)]);
        let adapter = ReconnectingAdapter::new("board", connector, LineCodec::SerialLine);

        let mut ingestion = IngestionPipeline::new(16);
        ingestion.add_source(Box::new(adapter)).unwrap();
        let events = ingestion.take_receiver().unwrap();
        let controls = ingestion.take_control_receiver().unwrap();

        let mut chain = Chain::new(EmissionPolicy::Flush, TimeUnit::Microseconds);
        let (subscriber, mut rx) = ChannelSubscriber::pair("out", 16);
        chain.distributor.register(subscriber);

        ingestion.start_all();
        chain.drive(&events, 2).await;

        let results = collect(&mut rx, 2).await;
        assert_eq!(results[0].timestamp, 1000);
        assert_eq!(results[1].timestamp, 2000);
        assert_eq!(chain.estimator.last_delta_time(), 0.001);

        let start = controls.recv().await.unwrap();
        let end = controls.recv().await.unwrap();
        assert_eq!(start.kind, ControlKind::CompassCalibrationStarted);
        assert_eq!(end.kind, ControlKind::CompassCalibrationEnded);

        ingestion.stop_all().await;
        chain.distributor.shutdown().await;
    }

    /// Retain policy: every update after the first completion emits
    #[tokio::test]
    async fn test_e2e_retain_policy() {
        let lines = [gyro(100), accel(150), mag(200), mag(210), gyro(220)];
        let connector = MockConnector::new("phone", vec![MockSession::lines(lines, SessionEnd::Hold)]);
        let adapter = ReconnectingAdapter::new("phone", connector, LineCodec::Json);

        let mut ingestion = IngestionPipeline::new(16);
        ingestion.add_source(Box::new(adapter)).unwrap();
        let events = ingestion.take_receiver().unwrap();

        let mut chain = Chain::new(EmissionPolicy::Retain, TimeUnit::Nanoseconds);
        let (subscriber, mut rx) = ChannelSubscriber::pair("out", 16);
        chain.distributor.register(subscriber);

        ingestion.start_all();
        chain.drive(&events, 3).await;

        let timestamps: Vec<i64> = collect(&mut rx, 3).await.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![200, 210, 220]);

        ingestion.stop_all().await;
        chain.distributor.shutdown().await;
    }

    /// Blueprint from TOML drives the adapter factory
    #[tokio::test]
    async fn test_blueprint_builds_ingestion() {
        let blueprint = config_loader::ConfigLoader::load_from_str(
            r#"
[[sources]]
name = "phone"
kind = { type = "websocket", address = "127.0.0.1:1" }
reconnect = { backoff_ms = 100, connect_timeout_ms = 100 }

[[sources]]
name = "board"
kind = { type = "serial", path = "/dev/does-not-exist" }
"#,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        let mut ingestion = IngestionPipeline::new(16);
        for source in &blueprint.sources {
            ingestion.add_source_config(source).unwrap();
        }
        assert_eq!(ingestion.source_count(), 2);
        assert!(ingestion.add_source_config(&blueprint.sources[0]).is_err());

        let time_unit = blueprint.effective_time_unit();
        assert_eq!(time_unit, TimeUnit::Microseconds);
        assert!(OrientationEstimator::new(blueprint.estimator.clone(), time_unit).is_ok());
    }
}
