//! File replay source

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use contracts::{ContractError, RawRecord, RecordSource, SourceId};

/// Streams raw records from a recording, one record per blank-line
/// separated block.
#[derive(Debug)]
pub struct ReplayRecordSource {
    source_id: SourceId,
    path: PathBuf,
    reader: BufReader<File>,
    sequence: u64,
}

impl ReplayRecordSource {
    pub fn open(source_id: SourceId, path: impl Into<PathBuf>) -> Result<Self, ContractError> {
        let path = path.into();
        let reader = BufReader::new(File::open(&path)?);
        Ok(Self {
            source_id,
            path,
            reader,
            sequence: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for ReplayRecordSource {
    fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    /// Records are read as raw bytes; decoding is left to the parser so a
    /// malformed record is dropped on its own.
    fn next_record(&mut self) -> Result<Option<RawRecord>, ContractError> {
        let mut block = Vec::new();
        let mut line = Vec::new();

        loop {
            line.clear();
            if self.reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                if block.is_empty() {
                    continue;
                }
                break;
            }
            block.extend_from_slice(&line);
        }

        if block.is_empty() {
            return Ok(None);
        }

        let record = RawRecord::new(self.sequence, block);
        self.sequence += 1;
        Ok(Some(record))
    }

    fn restart(&mut self) -> Result<(), ContractError> {
        self.reader = BufReader::new(File::open(&self.path)?);
        self.sequence = 0;
        Ok(())
    }
}
