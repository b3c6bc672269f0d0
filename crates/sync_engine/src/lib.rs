//! # Sync Engine
//!
//! Multi-source timestamp alignment.
//!
//! Responsibilities:
//! - One time-ordered buffer per source, fed by independent producers
//! - Base-driven nearest-timestamp matching with a skew tolerance
//! - Append-only synced log, flushed exactly once on stop
//!
//! ## Usage
//!
//! ```no_run
//! use contracts::{FrameSink, SyncEngineConfig};
//! use sync_engine::{SyncEngine, SyncedLog};
//!
//! let engine = SyncEngine::new(SyncEngineConfig::with_source_count(2))?;
//! let feeds = engine.feeds();
//! let shutdown = engine.shutdown_handle();
//! let mut coordinator = engine.into_coordinator(SyncedLog::new("synced_data.json"));
//!
//! // Producers call `feeds[i].push(frame)` from their own threads.
//! let handle = std::thread::spawn(move || coordinator.run());
//!
//! shutdown.request_stop();
//! let report = handle.join().expect("coordinator thread panicked")?;
//! println!("{} tuples", report.tuples);
//! # Ok::<(), contracts::ContractError>(())
//! ```

mod buffer;
mod coordinator;
mod engine;
mod feed;
mod signal;
mod synced_log;

pub use buffer::{BufferStats, TimeOrderedBuffer};
pub use coordinator::{CoordinatorReport, CoordinatorState, StepOutcome, SynchronizationCoordinator};
pub use engine::SyncEngine;
pub use feed::SourceFeed;
pub use signal::{LivenessSignal, ShutdownHandle};
pub use synced_log::SyncedLog;

// Re-export contracts types
pub use contracts::{AlignedTuple, SkewPolicy, SyncEngineConfig};
