//! Per-source, time-ordered frame buffer.
//!
//! One producer appends, one coordinator reads and consumes. Every operation
//! takes the buffer lock once, so appends become visible in commit order and
//! consumption is atomic with respect to appends.

use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{skew_seconds, ContractError, Frame, SourceId, Timestamp};
use tracing::{debug, instrument};

/// Counters kept alongside the frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// Frames currently stored
    pub depth: usize,
    /// Successful appends
    pub appended: u64,
    /// Appends rejected for being older than the newest frame
    pub rejected: u64,
    /// Frames dropped by prefix consumption without being returned
    pub discarded: u64,
    /// Frames handed out by `pop_front` / `consume_prefix_through`
    pub consumed: u64,
}

#[derive(Default)]
struct BufferState {
    frames: VecDeque<Frame>,
    stats: BufferStats,
}

/// Monotonically time-ordered frame sequence for one source.
///
/// Invariant: `frames[i].timestamp <= frames[i + 1].timestamp`. It is
/// enforced on append; out-of-order frames are rejected, never reordered.
///
/// Matching is destructive: [`consume_prefix_through`] drops every frame in
/// front of the match. Those frames are gone for good, even if a later entry
/// would have matched them better.
///
/// [`consume_prefix_through`]: TimeOrderedBuffer::consume_prefix_through
pub struct TimeOrderedBuffer {
    source_id: SourceId,
    state: Mutex<BufferState>,
    appended: Condvar,
}

impl fmt::Debug for TimeOrderedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("TimeOrderedBuffer")
            .field("source_id", &self.source_id)
            .field("len", &state.frames.len())
            .field("frontier", &state.frames.back().map(|frame| frame.timestamp))
            .finish()
    }
}

impl TimeOrderedBuffer {
    pub fn new(source_id: SourceId) -> Self {
        Self {
            source_id,
            state: Mutex::new(BufferState::default()),
            appended: Condvar::new(),
        }
    }

    pub fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    /// Append a frame at the back.
    ///
    /// Equal timestamps are accepted. Wakes any reader blocked in
    /// [`wait_for_frontier`](Self::wait_for_frontier).
    ///
    /// # Errors
    /// `OrderingViolation` if the frame is strictly older than the newest
    /// stored frame. The buffer is left untouched.
    #[instrument(
        level = "trace",
        name = "buffer_append",
        skip(self, frame),
        fields(source_id = %self.source_id, timestamp = %frame.timestamp)
    )]
    pub fn append(&self, frame: Frame) -> Result<(), ContractError> {
        {
            let mut state = self.lock();
            if let Some(last) = state.frames.back().map(|last| last.timestamp) {
                if frame.timestamp < last {
                    state.stats.rejected += 1;
                    return Err(ContractError::ordering_violation(
                        self.source_id.as_str(),
                        frame.timestamp,
                        last,
                    ));
                }
            }
            state.frames.push_back(frame);
            state.stats.appended += 1;
        }
        self.appended.notify_all();
        Ok(())
    }

    /// Point-in-time copy of every stored frame
    pub fn snapshot(&self) -> Vec<Frame> {
        self.lock().frames.iter().cloned().collect()
    }

    /// Remove and return the oldest frame
    pub fn pop_front(&self) -> Option<Frame> {
        let mut state = self.lock();
        let frame = state.frames.pop_front()?;
        state.stats.consumed += 1;
        Some(frame)
    }

    /// Index of the frame nearest to `target`.
    ///
    /// Scans from the front and stops at the first frame that is farther than
    /// its predecessor. Ties resolve to the earlier index.
    pub fn find_closest_index(&self, target: &Timestamp) -> Option<usize> {
        let state = self.lock();
        closest_index(&state.frames, target)
    }

    /// Remove frames `0..=index` and return the one at `index`.
    ///
    /// Frames before `index` are discarded permanently.
    ///
    /// # Errors
    /// `IndexOutOfRange` if `index >= len`. Nothing is removed.
    #[instrument(
        level = "trace",
        name = "buffer_consume_prefix",
        skip(self),
        fields(source_id = %self.source_id)
    )]
    pub fn consume_prefix_through(&self, index: usize) -> Result<Frame, ContractError> {
        let mut state = self.lock();
        let len = state.frames.len();
        if index >= len {
            return Err(ContractError::index_out_of_range(
                self.source_id.as_str(),
                index,
                len,
            ));
        }

        state.frames.drain(..index);
        let matched = state
            .frames
            .pop_front()
            .ok_or_else(|| ContractError::index_out_of_range(self.source_id.as_str(), index, len))?;

        state.stats.discarded += index as u64;
        state.stats.consumed += 1;
        if index > 0 {
            debug!(
                source_id = %self.source_id,
                discarded = index,
                "Discarded frames ahead of match"
            );
        }
        Ok(matched)
    }

    /// Timestamp of the newest frame
    pub fn frontier(&self) -> Option<Timestamp> {
        self.lock().frames.back().map(|frame| frame.timestamp)
    }

    /// Block until the newest frame is at or after `target`, at most `timeout`.
    ///
    /// Returns whether the frontier reached `target`.
    pub fn wait_for_frontier(&self, target: &Timestamp, timeout: Duration) -> bool {
        let state = self.lock();
        let (state, _) = self
            .appended
            .wait_timeout_while(state, timeout, |state| !frontier_reached(state, target))
            .unwrap_or_else(PoisonError::into_inner);
        frontier_reached(&state, target)
    }

    pub fn len(&self) -> usize {
        self.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().frames.is_empty()
    }

    pub fn stats(&self) -> BufferStats {
        let state = self.lock();
        BufferStats {
            depth: state.frames.len(),
            ..state.stats
        }
    }

    /// Write a snapshot as a pretty-printed JSON array of frames.
    pub fn persist(&self, path: &Path) -> Result<(), ContractError> {
        let frames = self.snapshot();
        write_json_pretty(path, &frames)?;
        debug!(
            source_id = %self.source_id,
            path = %path.display(),
            frames = frames.len(),
            "Buffer snapshot persisted"
        );
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, BufferState> {
        // A producer that panicked mid-append cannot leave a half-written
        // frame behind, so the data stays usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn frontier_reached(state: &BufferState, target: &Timestamp) -> bool {
    state
        .frames
        .back()
        .is_some_and(|frame| frame.timestamp >= *target)
}

fn closest_index(frames: &VecDeque<Frame>, target: &Timestamp) -> Option<usize> {
    let mut iter = frames.iter().enumerate();
    let (_, first) = iter.next()?;

    let mut best = 0;
    let mut best_distance = skew_seconds(&first.timestamp, target);
    let mut previous = best_distance;
    for (index, frame) in iter {
        let distance = skew_seconds(&frame.timestamp, target);
        if distance > previous {
            break;
        }
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
        previous = distance;
    }
    Some(best)
}

/// Serialize `value` as pretty JSON, creating parent directories.
///
/// Writes to a sibling temp file first, then renames over `path`.
pub(crate) fn write_json_pretty<T: serde::Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), ContractError> {
    let display = path.display().to_string();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ContractError::persist(&display, e.to_string()))?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    let file =
        fs::File::create(&tmp_path).map_err(|e| ContractError::persist(&display, e.to_string()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|e| ContractError::persist(&display, e.to_string()))?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| ContractError::persist(&display, e.to_string()))?;
    drop(writer);

    fs::rename(&tmp_path, path).map_err(|e| ContractError::persist(&display, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{parse_timestamp, FramePayload};
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn ts(seconds: f64) -> Timestamp {
        let base = parse_timestamp("2024-05-30T10:00:00").unwrap();
        base + chrono::TimeDelta::microseconds((seconds * 1_000_000.0).round() as i64)
    }

    fn frame(seconds: f64) -> Frame {
        Frame::new(ts(seconds), FramePayload::Text(format!("t={seconds}")))
    }

    fn buffer_with(times: &[f64]) -> TimeOrderedBuffer {
        let buffer = TimeOrderedBuffer::new(SourceId::from("lidar"));
        for &t in times {
            buffer.append(frame(t)).unwrap();
        }
        buffer
    }

    fn times(frames: &[Frame]) -> Vec<Timestamp> {
        frames.iter().map(|f| f.timestamp).collect()
    }

    #[test]
    fn test_append_keeps_order_and_accepts_equal() {
        let buffer = buffer_with(&[1.0, 2.0, 2.0, 3.5]);
        assert_eq!(
            times(&buffer.snapshot()),
            vec![ts(1.0), ts(2.0), ts(2.0), ts(3.5)]
        );
        assert_eq!(buffer.frontier(), Some(ts(3.5)));
    }

    #[test]
    fn test_older_frame_rejected_buffer_untouched() {
        let buffer = buffer_with(&[5.0]);
        let err = buffer.append(frame(3.0)).unwrap_err();
        assert!(matches!(err, ContractError::OrderingViolation { .. }));
        assert_eq!(times(&buffer.snapshot()), vec![ts(5.0)]);

        let stats = buffer.stats();
        assert_eq!(stats.appended, 1);
        assert_eq!(stats.rejected, 1);
    }

    #[test]
    fn test_pop_front_empty_is_none() {
        let buffer = buffer_with(&[]);
        assert!(buffer.pop_front().is_none());
        assert!(buffer.find_closest_index(&ts(1.0)).is_none());
    }

    #[test]
    fn test_pop_front_returns_oldest() {
        let buffer = buffer_with(&[1.0, 2.0]);
        assert_eq!(buffer.pop_front().unwrap().timestamp, ts(1.0));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_find_closest_minimum_distance() {
        let buffer = buffer_with(&[9.8, 10.05, 10.3, 10.6]);
        assert_eq!(buffer.find_closest_index(&ts(10.0)), Some(1));
        assert_eq!(buffer.find_closest_index(&ts(9.0)), Some(0));
        assert_eq!(buffer.find_closest_index(&ts(11.0)), Some(3));
    }

    #[test]
    fn test_find_closest_tie_goes_to_earlier() {
        let buffer = buffer_with(&[9.9, 10.1]);
        assert_eq!(buffer.find_closest_index(&ts(10.0)), Some(0));

        let duplicates = buffer_with(&[10.05, 10.05, 10.05]);
        assert_eq!(duplicates.find_closest_index(&ts(10.0)), Some(0));
    }

    #[test]
    fn test_find_closest_skips_duplicate_plateau() {
        let buffer = buffer_with(&[8.0, 8.0, 9.0, 12.0]);
        assert_eq!(buffer.find_closest_index(&ts(10.0)), Some(2));
    }

    #[test]
    fn test_randomized_closest_and_consume() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..500 {
            let len = rng.random_range(1..12);
            let mut offsets: Vec<i64> = (0..len).map(|_| rng.random_range(0..40)).collect();
            offsets.sort_unstable();
            let original: Vec<Timestamp> = offsets.iter().map(|&o| ts(o as f64 * 0.05)).collect();

            let buffer = TimeOrderedBuffer::new(SourceId::from("lidar"));
            for &t in &original {
                buffer.append(Frame::empty(t)).unwrap();
            }

            let target = ts(rng.random_range(-10..50) as f64 * 0.05);
            let distances: Vec<f64> = original.iter().map(|t| skew_seconds(t, &target)).collect();
            let min = distances.iter().copied().fold(f64::INFINITY, f64::min);
            let expected = distances.iter().position(|&d| d == min);

            let index = buffer.find_closest_index(&target);
            assert_eq!(index, expected, "offsets {offsets:?} target {target}");

            let index = index.unwrap();
            let matched = buffer.consume_prefix_through(index).unwrap();
            assert_eq!(matched.timestamp, original[index]);
            assert_eq!(times(&buffer.snapshot()), original[index + 1..].to_vec());
        }
    }

    #[test]
    fn test_consume_prefix_atomic() {
        let buffer = buffer_with(&[1.0, 2.0, 3.0, 4.0]);
        let matched = buffer.consume_prefix_through(2).unwrap();
        assert_eq!(matched.timestamp, ts(3.0));
        assert_eq!(times(&buffer.snapshot()), vec![ts(4.0)]);

        let stats = buffer.stats();
        assert_eq!(stats.discarded, 2);
        assert_eq!(stats.consumed, 1);
    }

    #[test]
    fn test_consume_prefix_out_of_range() {
        let buffer = buffer_with(&[1.0, 2.0]);
        let err = buffer.consume_prefix_through(2).unwrap_err();
        assert!(matches!(
            err,
            ContractError::IndexOutOfRange { index: 2, len: 2, .. }
        ));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_wait_for_frontier_times_out() {
        let buffer = buffer_with(&[1.0]);
        let start = Instant::now();
        assert!(!buffer.wait_for_frontier(&ts(2.0), Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(buffer.wait_for_frontier(&ts(1.0), Duration::from_millis(20)));
    }

    #[test]
    fn test_wait_for_frontier_woken_by_append() {
        let buffer = Arc::new(buffer_with(&[1.0]));
        let producer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                buffer.append(frame(2.5)).unwrap();
            })
        };

        assert!(buffer.wait_for_frontier(&ts(2.0), Duration::from_secs(5)));
        producer.join().unwrap();
    }

    #[test]
    fn test_concurrent_appends_stay_monotonic() {
        let buffer = Arc::new(TimeOrderedBuffer::new(SourceId::from("base")));
        let producer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for i in 0..500 {
                    buffer.append(frame(i as f64 * 0.01)).unwrap();
                }
            })
        };

        let mut popped = Vec::new();
        while popped.len() < 500 {
            if let Some(frame) = buffer.pop_front() {
                popped.push(frame.timestamp);
            }
        }
        producer.join().unwrap();

        assert!(popped.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_survives_poisoned_lock() {
        let buffer = Arc::new(buffer_with(&[1.0]));
        let poisoner = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                let _guard = buffer.state.lock().unwrap();
                panic!("producer crashed");
            })
        };
        assert!(poisoner.join().is_err());

        buffer.append(frame(2.0)).unwrap();
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_persist_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("buffer_lidar.json");
        let buffer = buffer_with(&[1.0, 2.0]);

        buffer.persist(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  {"));
        let frames: Vec<Frame> = serde_json::from_str(&text).unwrap();
        assert_eq!(frames, buffer.snapshot());
    }
}
