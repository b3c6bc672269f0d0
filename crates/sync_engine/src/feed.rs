//! Producer-side handle onto one source buffer.

use std::sync::Arc;

use contracts::{ContractError, Frame, FrameSink, SourceId};
use tracing::warn;

use crate::buffer::TimeOrderedBuffer;
use crate::signal::LivenessSignal;

/// Write end of a source buffer.
///
/// The base source's feed also raises the liveness signal after every
/// accepted frame.
#[derive(Debug, Clone)]
pub struct SourceFeed {
    buffer: Arc<TimeOrderedBuffer>,
    signal: Option<Arc<LivenessSignal>>,
}

impl SourceFeed {
    pub(crate) fn new(buffer: Arc<TimeOrderedBuffer>, signal: Option<Arc<LivenessSignal>>) -> Self {
        Self { buffer, signal }
    }

    /// Whether pushes on this feed drive the coordinator
    pub fn is_base(&self) -> bool {
        self.signal.is_some()
    }

    pub fn buffer(&self) -> &Arc<TimeOrderedBuffer> {
        &self.buffer
    }
}

impl FrameSink for SourceFeed {
    fn source_id(&self) -> &SourceId {
        self.buffer.source_id()
    }

    fn push(&self, frame: Frame) -> Result<(), ContractError> {
        let source_id = self.buffer.source_id();
        match self.buffer.append(frame) {
            Ok(()) => {
                observability::record_frame_appended(source_id);
                observability::record_buffer_depth(source_id, self.buffer.len());
                if let Some(signal) = &self.signal {
                    signal.raise();
                }
                Ok(())
            }
            Err(err @ ContractError::OrderingViolation { .. }) => {
                warn!(source_id = %source_id, error = %err, "Dropping out-of-order frame");
                observability::record_ordering_violation(source_id);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::parse_timestamp;

    fn frame(ts: &str) -> Frame {
        Frame::empty(parse_timestamp(ts).unwrap())
    }

    #[test]
    fn test_base_feed_raises_signal() {
        let signal = Arc::new(LivenessSignal::new());
        let buffer = Arc::new(TimeOrderedBuffer::new(SourceId::from("base")));
        let feed = SourceFeed::new(Arc::clone(&buffer), Some(Arc::clone(&signal)));

        feed.push(frame("2024-05-30T10:00:00")).unwrap();
        assert!(feed.is_base());
        assert!(signal.is_raised());
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_rejected_frame_does_not_raise() {
        let signal = Arc::new(LivenessSignal::new());
        let buffer = Arc::new(TimeOrderedBuffer::new(SourceId::from("base")));
        let feed = SourceFeed::new(Arc::clone(&buffer), Some(Arc::clone(&signal)));

        feed.push(frame("2024-05-30T10:00:05")).unwrap();
        signal.wait_and_clear(std::time::Duration::ZERO);

        let err = feed.push(frame("2024-05-30T10:00:03")).unwrap_err();
        assert!(matches!(err, ContractError::OrderingViolation { .. }));
        assert!(!signal.is_raised());
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_other_feed_never_raises() {
        let buffer = Arc::new(TimeOrderedBuffer::new(SourceId::from("lidar")));
        let feed = SourceFeed::new(buffer, None);
        feed.push(frame("2024-05-30T10:00:00")).unwrap();
        assert!(!feed.is_base());
        assert_eq!(feed.source_id(), "lidar");
    }
}
