//! FrameSink trait - Ingestion output interface
//!
//! Where a producer delivers parsed frames.

use crate::{ContractError, Frame, SourceId};

/// Frame destination for one source
///
/// Implementations must be callable from the producer thread while the
/// coordinator reads the same source concurrently.
pub trait FrameSink: Send + Sync {
    /// Source this sink accepts frames for (used for logging/metrics)
    fn source_id(&self) -> &SourceId;

    /// Deliver a frame
    ///
    /// # Errors
    /// `OrderingViolation` when the frame is older than the last accepted one.
    fn push(&self, frame: Frame) -> Result<(), ContractError>;
}
