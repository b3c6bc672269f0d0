//! # Integration Tests
//!
//! End-to-end tests across crates.
//!
//! Covers:
//! - Config file → engine graph
//! - Synthetic and replay sources → producers → coordinator → synced log
//! - Ordered shutdown

#[cfg(test)]
mod support {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::AlignerBlueprint;
    use ingestion::{IngestionPipeline, ProducerReport};
    use sync_engine::{CoordinatorReport, SyncEngine, SyncedLog};

    /// Outcome of one end-to-end run
    pub struct Run {
        pub report: CoordinatorReport,
        pub producers: Vec<ProducerReport>,
    }

    pub fn blueprint(toml: &str) -> AlignerBlueprint {
        config_loader::ConfigLoader::load_from_str(toml, config_loader::ConfigFormat::Toml)
            .unwrap()
    }

    /// Wire `blueprint` up, let producers run to completion, give the
    /// coordinator `settle` to drain, then shut down in order.
    pub async fn run_to_completion(
        blueprint: &AlignerBlueprint,
        log_path: &Path,
        settle: Duration,
    ) -> Run {
        let engine = SyncEngine::new(blueprint.to_sync_engine_config()).unwrap();

        let mut pipeline = IngestionPipeline::new();
        for (config, feed) in blueprint.sources.iter().zip(engine.feeds()) {
            pipeline.register(ingestion::sources::from_config(config).unwrap(), Arc::new(feed));
        }

        let shutdown = engine.shutdown_handle();
        let coordinator = engine
            .into_coordinator(SyncedLog::new(log_path))
            .with_snapshot_dir(blueprint.output.snapshot_dir.clone());
        let coordinator_task = tokio::task::spawn_blocking(move || {
            let mut coordinator = coordinator;
            coordinator.run()
        });

        pipeline.start().unwrap();
        let producers = tokio::task::spawn_blocking(move || pipeline.join())
            .await
            .unwrap();

        tokio::time::sleep(settle).await;
        shutdown.request_stop();

        let report = tokio::time::timeout(Duration::from_secs(5), coordinator_task)
            .await
            .expect("coordinator did not stop")
            .unwrap()
            .unwrap();

        Run { report, producers }
    }
}

#[cfg(test)]
mod config_tests {
    use contracts::SkewPolicy;
    use sync_engine::SyncEngine;

    #[test]
    fn test_config_file_builds_engine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aligner.toml");
        std::fs::write(
            &path,
            r#"
[sync]
max_skew_seconds = 0.1
base_source_index = 2
skew_policy = "abort"

[[sources]]
id = "cam"
source_type = "synthetic"

[[sources]]
id = "lidar"
source_type = "synthetic"

[[sources]]
id = "radar"
source_type = "synthetic"
"#,
        )
        .unwrap();

        let blueprint = config_loader::ConfigLoader::load_from_path(&path).unwrap();
        let config = blueprint.to_sync_engine_config();
        assert_eq!(config.skew_policy, SkewPolicy::Abort);

        let engine = SyncEngine::new(config).unwrap();
        let feeds = engine.feeds();
        assert_eq!(feeds.len(), 3);
        assert!(feeds[2].is_base());
        assert!(!feeds[0].is_base());
    }

    #[test]
    fn test_json_and_toml_agree() {
        let toml = r#"
[[sources]]
id = "a"
source_type = "synthetic"

[[sources]]
id = "b"
source_type = "replay"
path = "b.txt"
"#;
        let from_toml =
            config_loader::ConfigLoader::load_from_str(toml, config_loader::ConfigFormat::Toml)
                .unwrap();
        let json = config_loader::ConfigLoader::to_json(&from_toml).unwrap();
        let from_json =
            config_loader::ConfigLoader::load_from_str(&json, config_loader::ConfigFormat::Json)
                .unwrap();

        assert_eq!(from_json.source_ids(), from_toml.source_ids());
        assert_eq!(
            from_json.output.synced_log_path,
            from_toml.output.synced_log_path
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Write;
    use std::time::Duration;

    use contracts::{FramePayload, ObjectFrame};
    use ingestion::{encode_object_list, ProducerExit};
    use sync_engine::SyncedLog;

    use super::support::{blueprint, run_to_completion};

    const TWO_SYNTHETIC: &str = r#"
[sync]
polling_interval_seconds = 0.01

[[sources]]
id = "cam"
source_type = "synthetic"
synthetic = { period_s = 0.1, jitter_s = 0.0, max_records = 20, realtime = false, seed = 1, start_time = "2024-05-30T10:00:00" }

[[sources]]
id = "lidar"
source_type = "synthetic"
synthetic = { period_s = 0.05, jitter_s = 0.0, offset_s = 0.01, max_records = 45, realtime = false, seed = 2, start_time = "2024-05-30T10:00:00" }
"#;

    /// End-to-end: synthetic sources → producers → coordinator → synced log
    #[tokio::test]
    async fn test_e2e_synthetic_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("synced_data.json");
        let bp = blueprint(TWO_SYNTHETIC);

        let run = run_to_completion(&bp, &log_path, Duration::from_millis(300)).await;

        assert!(run
            .producers
            .iter()
            .all(|p| p.exit == ProducerExit::Exhausted));
        assert_eq!(run.report.tuples, 20);
        assert!(run.report.flushed);

        let tuples = SyncedLog::load(&log_path).unwrap();
        assert_eq!(tuples.len(), 20);
        for pair in tuples.windows(2) {
            assert!(pair[0].base.timestamp < pair[1].base.timestamp);
            assert!(pair[0].others[0].timestamp < pair[1].others[0].timestamp);
        }
        for tuple in &tuples {
            assert!(tuple.max_skew_seconds() <= 0.2);
            assert!(matches!(tuple.base.payload, FramePayload::Objects(_)));
        }

        // Labels are positional
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&log_path).unwrap()).unwrap();
        assert!(raw[0].get("base").is_some());
        assert!(raw[0].get("source1").is_some());
    }

    /// A constant offset beyond the tolerance rejects every entry
    #[tokio::test]
    async fn test_e2e_skew_rejects_everything() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("synced_data.json");
        let bp = blueprint(
            r#"
[sync]
max_skew_seconds = 0.2
polling_interval_seconds = 0.01

[[sources]]
id = "cam"
source_type = "synthetic"
synthetic = { period_s = 1.0, jitter_s = 0.0, max_records = 5, realtime = false, start_time = "2024-05-30T10:00:00" }

[[sources]]
id = "lidar"
source_type = "synthetic"
synthetic = { period_s = 1.0, jitter_s = 0.0, offset_s = 0.5, max_records = 6, realtime = false, start_time = "2024-05-30T10:00:00" }
"#,
        );

        let run = run_to_completion(&bp, &log_path, Duration::from_millis(300)).await;

        assert_eq!(run.report.tuples, 0);
        assert_eq!(run.report.summary.skew_rejections, 5);
        assert!(SyncedLog::load(&log_path).unwrap().is_empty());
    }

    /// Replay files with a bad record and an out-of-order record
    #[tokio::test]
    async fn test_e2e_replay_drops_bad_records() {
        let dir = tempfile::tempdir().unwrap();
        let stamp = |s: &str| contracts::parse_timestamp(s).unwrap();
        let empty = |n: u64| ObjectFrame {
            frame_count: n,
            time_s: n.to_string(),
            zone_bindings_len: 0,
            objects: Vec::new(),
        };

        let mut base = std::fs::File::create(dir.path().join("base.txt")).unwrap();
        for (n, ts) in ["2024-05-30T10:00:00", "2024-05-30T10:00:01", "2024-05-30T10:00:02"]
            .into_iter()
            .enumerate()
        {
            writeln!(base, "{}", encode_object_list(&stamp(ts), &empty(n as u64))).unwrap();
        }
        writeln!(base, "not,a,record\n").unwrap();

        let mut other = std::fs::File::create(dir.path().join("other.txt")).unwrap();
        for (n, ts) in [
            "2024-05-30T10:00:00.05",
            "2024-05-30T10:00:00.01",
            "2024-05-30T10:00:01.02",
            "2024-05-30T10:00:02.1",
            "2024-05-30T10:00:03",
        ]
        .into_iter()
        .enumerate()
        {
            writeln!(other, "{}", encode_object_list(&stamp(ts), &empty(n as u64))).unwrap();
        }
        drop((base, other));

        let bp = blueprint(&format!(
            r#"
[sync]
polling_interval_seconds = 0.01

[output]
snapshot_dir = {snapshots:?}

[[sources]]
id = "base"
source_type = "replay"
path = {base:?}

[[sources]]
id = "other"
source_type = "replay"
path = {other:?}
"#,
            snapshots = dir.path().join("snapshots"),
            base = dir.path().join("base.txt"),
            other = dir.path().join("other.txt"),
        ));

        let log_path = dir.path().join("synced_data.json");
        let run = run_to_completion(&bp, &log_path, Duration::from_millis(300)).await;

        let base_report = &run.producers[0];
        assert_eq!(base_report.frames, 3);
        assert_eq!(base_report.parse_failures, 1);
        let other_report = &run.producers[1];
        assert_eq!(other_report.ordering_violations, 1);

        let tuples = SyncedLog::load(&log_path).unwrap();
        assert_eq!(tuples.len(), 3);
        assert_eq!(tuples[0].others[0].timestamp, stamp("2024-05-30T10:00:00.05"));
        assert_eq!(tuples[1].others[0].timestamp, stamp("2024-05-30T10:00:01.02"));
        assert_eq!(tuples[2].others[0].timestamp, stamp("2024-05-30T10:00:02.1"));

        // The unmatched tail survives in the snapshot
        let snapshot = std::fs::read_to_string(dir.path().join("snapshots/buffer_other.json")).unwrap();
        let frames: Vec<contracts::Frame> = serde_json::from_str(&snapshot).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].timestamp, stamp("2024-05-30T10:00:03"));
    }
}

#[cfg(test)]
mod shutdown_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use ingestion::{IngestionPipeline, ProducerExit};
    use sync_engine::{SyncEngine, SyncedLog};

    use super::support::blueprint;

    /// Stop mid-stream: producers first, then the coordinator; the log holds
    /// only complete tuples.
    #[tokio::test]
    async fn test_shutdown_mid_stream() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("synced_data.json");
        let bp = blueprint(
            r#"
[sync]
polling_interval_seconds = 0.01

[[sources]]
id = "cam"
source_type = "synthetic"
synthetic = { period_s = 0.01, jitter_s = 0.0 }

[[sources]]
id = "lidar"
source_type = "synthetic"
synthetic = { period_s = 0.02, jitter_s = 0.0, offset_s = 0.005 }
"#,
        );

        let engine = SyncEngine::new(bp.to_sync_engine_config()).unwrap();
        let mut pipeline = IngestionPipeline::new();
        for (config, feed) in bp.sources.iter().zip(engine.feeds()) {
            pipeline.register(ingestion::sources::from_config(config).unwrap(), Arc::new(feed));
        }
        let shutdown = engine.shutdown_handle();
        let coordinator = engine.into_coordinator(SyncedLog::new(&log_path));
        let coordinator_task = tokio::task::spawn_blocking(move || {
            let mut coordinator = coordinator;
            coordinator.run()
        });

        pipeline.start().unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        pipeline.stop();
        let producers = tokio::task::spawn_blocking(move || pipeline.join())
            .await
            .unwrap();
        assert!(producers.iter().all(|p| p.exit == ProducerExit::Stopped));

        assert!(shutdown.request_stop());
        assert!(!shutdown.request_stop());
        let report = tokio::time::timeout(Duration::from_secs(5), coordinator_task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert!(report.flushed);
        assert!(report.tuples > 0);
        let tuples = SyncedLog::load(&log_path).unwrap();
        assert_eq!(tuples.len(), report.tuples);
        assert!(tuples.iter().all(|t| t.others.len() == 1));
    }
}
