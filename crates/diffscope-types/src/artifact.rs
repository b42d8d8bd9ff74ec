//! Backend results: the diff artifact and per-side tag sets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::range::Timestamp;

/// Sample series for one timeline surface.
///
/// Point `i` sits at `start_time + i * duration_delta`. `None` samples are
/// gaps (no data ingested for that slot).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub start_time: Timestamp,
    #[serde(default)]
    pub samples: Vec<Option<u64>>,
    #[serde(default = "default_duration_delta")]
    pub duration_delta: i64,
}

fn default_duration_delta() -> i64 {
    10
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sum of all non-gap samples.
    pub fn total(&self) -> u64 {
        self.samples.iter().flatten().sum()
    }
}

/// Result of one successful diff fetch.
///
/// `profile` is the diff document as the backend produced it; this layer
/// never looks inside it beyond checking that it exists.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffArtifact {
    #[serde(default)]
    pub profile: Option<serde_json::Value>,
    #[serde(default)]
    pub left_timeline: Timeline,
    #[serde(default)]
    pub right_timeline: Timeline,
}

impl DiffArtifact {
    /// Export is offered only when there is a profile to export.
    pub fn is_exportable(&self) -> bool {
        self.profile.as_ref().is_some_and(|p| !p.is_null())
    }
}

/// Tag name → known values, for one side's query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(pub BTreeMap<String, Vec<String>>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tag set with names only; values are looked up lazily per label.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(labels.into_iter().map(|l| (l.into(), Vec::new())).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_total_skips_gaps() {
        let t = Timeline {
            start_time: 1000,
            samples: vec![Some(1), None, Some(3)],
            duration_delta: 10,
        };
        assert_eq!(t.total(), 4);
        assert!(!t.is_empty());
    }

    #[test]
    fn test_artifact_parses_backend_shape() {
        let json = r#"{
            "profile": {"names": ["total"], "levels": [[0, 10, 0, 0]]},
            "leftTimeline": {"startTime": 100, "samples": [1, null, 2], "durationDelta": 10},
            "rightTimeline": {"startTime": 300, "samples": [5]}
        }"#;
        let a: DiffArtifact = serde_json::from_str(json).unwrap();
        assert!(a.is_exportable());
        assert_eq!(a.left_timeline.samples, vec![Some(1), None, Some(2)]);
        assert_eq!(a.right_timeline.duration_delta, 10);
    }

    #[test]
    fn test_artifact_without_profile_is_not_exportable() {
        assert!(!DiffArtifact::default().is_exportable());
        let a = DiffArtifact { profile: Some(serde_json::Value::Null), ..Default::default() };
        assert!(!a.is_exportable());
    }

    #[test]
    fn test_tag_set_from_labels() {
        let tags = TagSet::from_labels(["region", "host"]);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.labels().collect::<Vec<_>>(), vec!["host", "region"]);
        assert!(tags.0["host"].is_empty());
    }
}
