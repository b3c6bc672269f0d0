//! Synthetic object-list generator

use std::thread;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use contracts::{
    parse_timestamp, ContractError, ObjectFrame, RawRecord, RecordSource, SourceId,
    SyntheticSourceConfig, Timestamp, TrackedObject, Vector3,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::parser::encode_object_list;

const OBJECT_CLASSES: [&str; 4] = ["person", "car", "bicycle", "truck"];

/// Generates object-list records on a jittered fixed-period clock.
///
/// Record `n` is stamped `start + offset + n * period + jitter`, with jitter
/// drawn uniformly from `[-jitter_s, jitter_s]`. Jitter larger than half the
/// period can stamp a record before its predecessor.
pub struct SyntheticRecordSource {
    source_id: SourceId,
    config: SyntheticSourceConfig,
    start: Timestamp,
    rng: StdRng,
    sequence: u64,
}

impl SyntheticRecordSource {
    pub fn new(source_id: SourceId, config: SyntheticSourceConfig) -> Result<Self, ContractError> {
        let start = match &config.start_time {
            Some(value) => parse_timestamp(value)?,
            None => Utc::now().naive_utc(),
        };
        let rng = Self::make_rng(config.seed);

        Ok(Self {
            source_id,
            config,
            start,
            rng,
            sequence: 0,
        })
    }

    /// Timestamp of the first record before jitter
    pub fn start(&self) -> Timestamp {
        self.start
    }

    fn make_rng(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    fn timestamp_for(&mut self, sequence: u64) -> Timestamp {
        let jitter = if self.config.jitter_s > 0.0 {
            self.rng
                .random_range(-self.config.jitter_s..=self.config.jitter_s)
        } else {
            0.0
        };
        let offset_s = self.config.offset_s + sequence as f64 * self.config.period_s + jitter;
        self.start + TimeDelta::microseconds((offset_s * 1_000_000.0).round() as i64)
    }

    fn objects_for(&mut self, frame_count: u64) -> Vec<TrackedObject> {
        (0..self.config.objects_per_frame)
            .map(|i| {
                let class = OBJECT_CLASSES[self.rng.random_range(0..OBJECT_CLASSES.len())];
                TrackedObject {
                    frame_count,
                    obj_id: i64::from(i),
                    object_class: class.to_string(),
                    position: Vector3::new(
                        self.rng.random_range(-50.0..50.0),
                        self.rng.random_range(-50.0..50.0),
                        0.0,
                    ),
                    dimensions: Vector3::new(
                        self.rng.random_range(0.5..5.0),
                        self.rng.random_range(0.5..2.5),
                        self.rng.random_range(1.0..3.0),
                    ),
                    speed_mph: self.rng.random_range(0.0..40.0),
                    bearing_degrees: self.rng.random_range(0.0..360.0),
                }
            })
            .collect()
    }
}

impl RecordSource for SyntheticRecordSource {
    fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    fn next_record(&mut self) -> Result<Option<RawRecord>, ContractError> {
        if self
            .config
            .max_records
            .is_some_and(|max| self.sequence >= max)
        {
            return Ok(None);
        }

        if self.config.realtime && self.sequence > 0 {
            thread::sleep(Duration::from_secs_f64(self.config.period_s.max(0.0)));
        }

        let sequence = self.sequence;
        let timestamp = self.timestamp_for(sequence);
        let objects = self.objects_for(sequence);
        let frame = ObjectFrame {
            frame_count: sequence,
            time_s: format!("{:.6}", timestamp.and_utc().timestamp_micros() as f64 / 1e6),
            zone_bindings_len: 0,
            objects,
        };

        self.sequence += 1;
        Ok(Some(RawRecord::new(
            sequence,
            encode_object_list(&timestamp, &frame),
        )))
    }

    fn restart(&mut self) -> Result<(), ContractError> {
        self.sequence = 0;
        self.rng = Self::make_rng(self.config.seed);
        Ok(())
    }
}

impl std::fmt::Debug for SyntheticRecordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntheticRecordSource")
            .field("source_id", &self.source_id)
            .field("start", &self.start)
            .field("sequence", &self.sequence)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ObjectListParser, RecordParser};
    use contracts::FramePayload;

    fn config(seed: u64) -> SyntheticSourceConfig {
        SyntheticSourceConfig {
            period_s: 0.1,
            jitter_s: 0.0,
            offset_s: 0.0,
            max_records: Some(3),
            realtime: false,
            seed: Some(seed),
            start_time: Some("2024-05-30T10:00:00".into()),
            objects_per_frame: 2,
        }
    }

    #[test]
    fn test_generates_parseable_records_on_period() {
        let id = SourceId::from("cam");
        let mut source = SyntheticRecordSource::new(id.clone(), config(1)).unwrap();

        let mut stamps = Vec::new();
        while let Some(record) = source.next_record().unwrap() {
            let frame = ObjectListParser.parse(&id, &record).unwrap();
            match &frame.payload {
                FramePayload::Objects(objects) => assert_eq!(objects.objects.len(), 2),
                other => panic!("unexpected payload {other:?}"),
            }
            stamps.push(frame.timestamp);
        }

        assert_eq!(
            stamps,
            vec![
                parse_timestamp("2024-05-30T10:00:00").unwrap(),
                parse_timestamp("2024-05-30T10:00:00.1").unwrap(),
                parse_timestamp("2024-05-30T10:00:00.2").unwrap(),
            ]
        );
        assert!(source.next_record().unwrap().is_none());
    }

    #[test]
    fn test_offset_shifts_clock() {
        let mut cfg = config(1);
        cfg.offset_s = 0.05;
        let mut source = SyntheticRecordSource::new(SourceId::from("lidar"), cfg).unwrap();
        let record = source.next_record().unwrap().unwrap();
        let text = String::from_utf8(record.data.to_vec()).unwrap();
        assert!(text.contains("2024-05-30T10:00:00.050000"));
    }

    #[test]
    fn test_seeded_restart_replays_same_records() {
        let mut cfg = config(42);
        cfg.jitter_s = 0.02;
        let mut source = SyntheticRecordSource::new(SourceId::from("radar"), cfg).unwrap();

        let first: Vec<_> = std::iter::from_fn(|| source.next_record().unwrap()).collect();
        source.restart().unwrap();
        let second: Vec<_> = std::iter::from_fn(|| source.next_record().unwrap()).collect();

        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_start_time() {
        let mut cfg = config(1);
        cfg.start_time = Some("not a time".into());
        let err = SyntheticRecordSource::new(SourceId::from("x"), cfg).unwrap_err();
        assert!(matches!(err, ContractError::InvalidTimestamp { .. }));
    }
}
