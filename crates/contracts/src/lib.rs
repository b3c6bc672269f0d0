//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Frame timestamps are naive wall-clock instants (`chrono::NaiveDateTime`)
//!   with microsecond resolution, as stamped by the sensor
//! - Skew between two frames is measured in seconds (`f64`)
//! - On disk, timestamps are ISO-8601 strings (`YYYY-MM-DDTHH:MM:SS.ffffff`)

mod blueprint;
mod error;
mod frame;
mod record_source;
mod sink;
mod source_id;
mod sync_engine_config;
mod time;
mod tuple;

pub use blueprint::*;
pub use error::*;
pub use frame::*;
pub use record_source::{RawRecord, RecordSource};
pub use sink::FrameSink;
pub use source_id::SourceId;
pub use sync_engine_config::*;
pub use time::{format_timestamp, parse_timestamp, seconds_between, skew_seconds, Timestamp};
pub use tuple::{source_label, AlignedTuple, BASE_LABEL};
