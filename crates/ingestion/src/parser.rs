//! Raw record → Frame conversion
//!
//! The object-list wire format is UTF-8 CSV text. The first line is a header:
//!
//! ```text
//! tag,frame_count,time_s,formatted_time,number_of_objects,zone_bindings_len
//! ```
//!
//! followed by `number_of_objects` object lines:
//!
//! ```text
//! tag,frame_count,obj_id,object_class,pos_x,pos_y,pos_z,dim_x,dim_y,dim_z,speed_mph,bearing_degrees
//! ```
//!
//! `formatted_time` becomes the frame timestamp.

use std::fmt::Write as _;
use std::str::FromStr;

use contracts::{
    format_timestamp, parse_timestamp, Frame, FramePayload, ObjectFrame, RawRecord, SourceId,
    Timestamp, TrackedObject, Vector3,
};

use crate::error::{IngestionError, Result};

const HEADER_FIELDS: usize = 6;
const OBJECT_FIELDS: usize = 12;

/// Tag written on header lines by [`encode_object_list`]
pub const FRAME_TAG: &str = "F";

/// Tag written on object lines by [`encode_object_list`]
pub const OBJECT_TAG: &str = "O";

/// Converts one raw record into a frame
pub trait RecordParser: Send + Sync {
    fn parse(&self, source_id: &SourceId, record: &RawRecord) -> Result<Frame>;
}

/// Parser for the object-list wire format
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectListParser;

impl ObjectListParser {
    pub fn new() -> Self {
        Self
    }
}

impl RecordParser for ObjectListParser {
    fn parse(&self, source_id: &SourceId, record: &RawRecord) -> Result<Frame> {
        let fail = |message: String| IngestionError::parse_failed(source_id, record.sequence, message);

        let text = std::str::from_utf8(&record.data)
            .map_err(|e| fail(format!("record is not UTF-8: {e}")))?;

        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
        let header = lines.next().ok_or_else(|| fail("empty record".to_string()))?;

        let fields = split_fields(header, HEADER_FIELDS).map_err(&fail)?;
        let frame_count: u64 = field(&fields, 1, "frame_count").map_err(&fail)?;
        let time_s = fields[2].to_string();
        let timestamp = parse_timestamp(fields[3]).map_err(|e| fail(e.to_string()))?;
        let declared: usize = field(&fields, 4, "number_of_objects").map_err(&fail)?;
        let zone_bindings_len: u32 = field(&fields, 5, "zone_bindings_len").map_err(&fail)?;

        // The declared count is untrusted until the object lines are read.
        let mut objects = Vec::new();
        for index in 0..declared {
            let line = lines.next().ok_or_else(|| {
                fail(format!(
                    "header declares {declared} objects, found {index}"
                ))
            })?;
            objects.push(parse_object(line).map_err(|m| fail(format!("object {index}: {m}")))?);
        }

        Ok(Frame::new(
            timestamp,
            FramePayload::Objects(ObjectFrame {
                frame_count,
                time_s,
                zone_bindings_len,
                objects,
            }),
        ))
    }
}

fn split_fields(line: &str, expected: usize) -> std::result::Result<Vec<&str>, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != expected {
        return Err(format!(
            "expected {expected} fields, found {}",
            fields.len()
        ));
    }
    Ok(fields)
}

fn field<T: FromStr>(fields: &[&str], index: usize, name: &str) -> std::result::Result<T, String> {
    fields[index]
        .parse()
        .map_err(|_| format!("invalid {name}: {:?}", fields[index]))
}

fn parse_object(line: &str) -> std::result::Result<TrackedObject, String> {
    let fields = split_fields(line, OBJECT_FIELDS)?;
    Ok(TrackedObject {
        frame_count: field(&fields, 1, "frame_count")?,
        obj_id: field(&fields, 2, "obj_id")?,
        object_class: fields[3].to_string(),
        position: Vector3::new(
            field(&fields, 4, "pos_x")?,
            field(&fields, 5, "pos_y")?,
            field(&fields, 6, "pos_z")?,
        ),
        dimensions: Vector3::new(
            field(&fields, 7, "dim_x")?,
            field(&fields, 8, "dim_y")?,
            field(&fields, 9, "dim_z")?,
        ),
        speed_mph: field(&fields, 10, "speed_mph")?,
        bearing_degrees: field(&fields, 11, "bearing_degrees")?,
    })
}

/// Render an object frame in the wire format.
///
/// The header's object count is taken from `frame.objects`.
pub fn encode_object_list(timestamp: &Timestamp, frame: &ObjectFrame) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{FRAME_TAG},{},{},{},{},{}",
        frame.frame_count,
        frame.time_s,
        format_timestamp(timestamp),
        frame.objects.len(),
        frame.zone_bindings_len
    );
    for obj in &frame.objects {
        let _ = writeln!(
            out,
            "{OBJECT_TAG},{},{},{},{},{},{},{},{},{},{},{}",
            obj.frame_count,
            obj.obj_id,
            obj.object_class,
            obj.position.x,
            obj.position.y,
            obj.position.z,
            obj.dimensions.x,
            obj.dimensions.y,
            obj.dimensions.z,
            obj.speed_mph,
            obj.bearing_degrees
        );
    }
    out
}
