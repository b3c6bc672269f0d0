//! # Ingestion
//!
//! Turns raw record streams into frames for the sync engine.
//!
//! Responsibilities:
//! - Record sources (synthetic generator, file replay)
//! - Parse the object-list wire format into `Frame`s
//! - One producer thread per source, dropping unparseable and
//!   out-of-order records
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{sources, IngestionPipeline};
//!
//! let mut pipeline = IngestionPipeline::new();
//! for (config, feed) in blueprint.sources.iter().zip(engine.feeds()) {
//!     pipeline.register(sources::from_config(config)?, Arc::new(feed));
//! }
//! pipeline.start()?;
//! // ...
//! pipeline.stop();
//! let reports = pipeline.join();
//! ```

mod config;
mod error;
mod parser;
mod pipeline;
mod producer;
pub mod sources;

// Re-exports
pub use config::{IngestionMetrics, MetricsSnapshot};
pub use error::{IngestionError, Result};
pub use parser::{encode_object_list, ObjectListParser, RecordParser, FRAME_TAG, OBJECT_TAG};
pub use pipeline::IngestionPipeline;
pub use producer::{Producer, ProducerExit, ProducerReport};
pub use sources::{ReplayRecordSource, SyntheticRecordSource};
