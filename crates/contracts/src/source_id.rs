//! SourceId - Cheap-to-clone source identifier

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Identifier of one frame source.
///
/// Backed by `Arc<str>`: ids are fixed at startup and cloned into every log
/// line, metric label and error on the hot path.
///
/// ```
/// use contracts::SourceId;
///
/// let id = SourceId::from("outsight-1");
/// assert_eq!(id, "outsight-1");
/// assert_eq!(SourceId::indexed(2).as_str(), "source2");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(Arc<str>);

impl SourceId {
    /// Create a new SourceId
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Default id for the source at `index` (`source0`, `source1`, ...)
    pub fn indexed(index: usize) -> Self {
        Self::from(format!("source{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for SourceId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceId({:?})", &*self.0)
    }
}

impl PartialEq<str> for SourceId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for SourceId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_clone_shares_storage() {
        let a = SourceId::from("lidar-north");
        let b = a.clone();
        assert_eq!(a.as_str().as_ptr(), b.as_str().as_ptr());
    }

    #[test]
    fn test_lookup_by_str() {
        let mut depths: HashMap<SourceId, usize> = HashMap::new();
        depths.insert("base".into(), 4);
        assert_eq!(depths.get("base"), Some(&4));
    }

    #[test]
    fn test_serde_transparent() {
        let id = SourceId::indexed(1);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"source1\"");
        let parsed: SourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
