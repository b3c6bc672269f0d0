//! RecordSource trait - raw record supply for ingestion

use bytes::Bytes;

use crate::{ContractError, SourceId};

/// One undecoded record as delivered by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Position in the source's stream, starting at 0
    pub sequence: u64,
    pub data: Bytes,
}

impl RawRecord {
    pub fn new(sequence: u64, data: impl Into<Bytes>) -> Self {
        Self {
            sequence,
            data: data.into(),
        }
    }
}

/// Lazy, possibly unbounded record stream for one source
pub trait RecordSource: Send {
    fn source_id(&self) -> &SourceId;

    /// Next record. `Ok(None)` means the stream is exhausted.
    fn next_record(&mut self) -> Result<Option<RawRecord>, ContractError>;

    /// Rewind to the start of the stream
    fn restart(&mut self) -> Result<(), ContractError>;
}
