//! AlignedTuple - Sync Engine output
//!
//! On disk a tuple is an object keyed by source label:
//! `{"base": <frame>, "source1": <frame>, "source2": <frame>, ...}`.

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

use crate::{skew_seconds, Frame};

/// Label of the base frame
pub const BASE_LABEL: &str = "base";

/// Label of the non-base frame at position `pos` (0-based) in stable order
pub fn source_label(pos: usize) -> String {
    format!("source{}", pos + 1)
}

/// One base frame plus the matched frame of every other source
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTuple {
    pub base: Frame,

    /// Matched frames, one per non-base source, in stable source order
    pub others: Vec<Frame>,
}

impl AlignedTuple {
    pub fn new(base: Frame, others: Vec<Frame>) -> Self {
        Self { base, others }
    }

    /// Total number of frames (base included)
    pub fn source_count(&self) -> usize {
        self.others.len() + 1
    }

    /// |other - base| for every non-base frame, in stable order
    pub fn skews(&self) -> Vec<f64> {
        self.others
            .iter()
            .map(|frame| skew_seconds(&self.base.timestamp, &frame.timestamp))
            .collect()
    }

    pub fn max_skew_seconds(&self) -> f64 {
        self.skews().into_iter().fold(0.0, f64::max)
    }

    /// (label, frame) pairs, base first
    pub fn labelled(&self) -> impl Iterator<Item = (String, &Frame)> {
        std::iter::once((BASE_LABEL.to_string(), &self.base)).chain(
            self.others
                .iter()
                .enumerate()
                .map(|(pos, frame)| (source_label(pos), frame)),
        )
    }
}

impl Serialize for AlignedTuple {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.source_count()))?;
        for (label, frame) in self.labelled() {
            map.serialize_entry(&label, frame)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AlignedTuple {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut frames = HashMap::<String, Frame>::deserialize(deserializer)?;

        let base = frames
            .remove(BASE_LABEL)
            .ok_or_else(|| D::Error::missing_field(BASE_LABEL))?;

        let mut others = Vec::with_capacity(frames.len());
        while let Some(frame) = frames.remove(&source_label(others.len())) {
            others.push(frame);
        }

        if let Some(label) = frames.keys().next() {
            return Err(D::Error::custom(format!(
                "unexpected label '{label}' (labels must be 'base' and contiguous 'sourceN')"
            )));
        }

        Ok(Self { base, others })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_timestamp, FramePayload};

    fn frame(ts: &str, text: &str) -> Frame {
        Frame::new(parse_timestamp(ts).unwrap(), FramePayload::Text(text.into()))
    }

    fn sample() -> AlignedTuple {
        AlignedTuple::new(
            frame("2024-05-30T10:00:10.00", "base"),
            vec![
                frame("2024-05-30T10:00:10.05", "a"),
                frame("2024-05-30T10:00:09.90", "b"),
            ],
        )
    }

    #[test]
    fn test_serializes_labels_in_order() {
        let json = serde_json::to_string(&sample()).unwrap();
        let base = json.find("\"base\"").unwrap();
        let s1 = json.find("\"source1\"").unwrap();
        let s2 = json.find("\"source2\"").unwrap();
        assert!(base < s1 && s1 < s2);
    }

    #[test]
    fn test_deserializes_back() {
        let tuple = sample();
        let json = serde_json::to_string_pretty(&tuple).unwrap();
        let parsed: AlignedTuple = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tuple);
    }

    #[test]
    fn test_rejects_gap_in_labels() {
        let json = r#"{
            "base": {"timestamp": "2024-05-30T10:00:10", "payload": {"text": "x"}},
            "source2": {"timestamp": "2024-05-30T10:00:10", "payload": {"text": "y"}}
        }"#;
        assert!(serde_json::from_str::<AlignedTuple>(json).is_err());
    }

    #[test]
    fn test_rejects_missing_base() {
        let json = r#"{
            "source1": {"timestamp": "2024-05-30T10:00:10", "payload": {"text": "y"}}
        }"#;
        assert!(serde_json::from_str::<AlignedTuple>(json).is_err());
    }

    #[test]
    fn test_skews() {
        let tuple = sample();
        let skews = tuple.skews();
        assert!((skews[0] - 0.05).abs() < 1e-9);
        assert!((skews[1] - 0.10).abs() < 1e-9);
        assert!((tuple.max_skew_seconds() - 0.10).abs() < 1e-9);
        assert_eq!(tuple.source_count(), 3);
    }
}
