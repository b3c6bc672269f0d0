//! Frame - Ingestion output
//!
//! A single timestamped observation from one source.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::time::serde_format;
use crate::Timestamp;

/// Timestamped observation
///
/// Immutable once stored in a buffer; the payload is opaque to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Sensor timestamp (primary clock)
    #[serde(with = "serde_format")]
    pub timestamp: Timestamp,

    /// Structured payload
    pub payload: FramePayload,
}

impl Frame {
    /// Create a frame
    pub fn new(timestamp: Timestamp, payload: FramePayload) -> Self {
        Self { timestamp, payload }
    }

    /// Frame carrying only a timestamp
    pub fn empty(timestamp: Timestamp) -> Self {
        Self::new(timestamp, FramePayload::Raw(Bytes::new()))
    }
}

/// Frame payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramePayload {
    /// Tracked object list (perception sensor output)
    Objects(ObjectFrame),

    /// Free-form text
    Text(String),

    /// Raw bytes (fallback)
    Raw(Bytes),
}

/// Object list reported by a perception sensor for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectFrame {
    /// Sensor-side frame counter
    pub frame_count: u64,

    /// Sensor-side time string, kept verbatim
    pub time_s: String,

    /// Number of zone bindings reported with the frame
    pub zone_bindings_len: u32,

    /// Detected objects
    #[serde(default)]
    pub objects: Vec<TrackedObject>,
}

/// One detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    pub frame_count: u64,

    /// Tracker-assigned object id
    pub obj_id: i64,

    /// Classification label (e.g. "person", "car")
    pub object_class: String,

    /// Box center (m)
    pub position: Vector3,

    /// Box size (m)
    pub dimensions: Vector3,

    pub speed_mph: f64,

    /// Heading around the vertical axis (deg)
    pub bearing_degrees: f64,
}

/// 3D vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}
