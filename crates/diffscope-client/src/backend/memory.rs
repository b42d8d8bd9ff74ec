//! In-memory backend fed from a fixture.
//!
//! Each application in the fixture has a sample series and a tag map. A diff
//! is synthesized from the samples falling in each side's window: the
//! timelines are those samples, the profile carries per-side totals. Good
//! enough to drive the view without a profile server.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use diffscope_types::{DiffArtifact, FetchRequest, TagSet, TimeRange, Timeline, Timestamp};
use serde::{Deserialize, Serialize};

use super::{BackendError, QueryBackend, app_name};

/// One application's data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppFixture {
    /// `(timestamp, value)`, ascending by timestamp.
    #[serde(default)]
    pub samples: Vec<(Timestamp, u64)>,
    #[serde(default)]
    pub tags: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub apps: BTreeMap<String, AppFixture>,
    /// Artificial delay applied to every call.
    #[serde(default)]
    pub latency_ms: u64,
    /// Spacing of synthesized timeline points.
    #[serde(default = "default_step")]
    pub step: i64,
}

/// Wider windows get a coarser step instead of more points.
const MAX_TIMELINE_POINTS: i64 = 4096;

fn default_step() -> i64 {
    10
}

impl Fixture {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BackendError::Transport(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

pub struct InMemoryBackend {
    fixture: Fixture,
}

impl InMemoryBackend {
    pub fn new(fixture: Fixture) -> Self {
        Self { fixture }
    }

    fn app(&self, query: &str) -> Result<&AppFixture, BackendError> {
        let name = app_name(query);
        self.fixture
            .apps
            .get(name)
            .ok_or_else(|| BackendError::UnknownApp(name.to_string()))
    }

    async fn delay(&self) {
        if self.fixture.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.fixture.latency_ms)).await;
        }
    }

    fn timeline(&self, app: &AppFixture, range: TimeRange) -> Timeline {
        let mut step = self.fixture.step.max(1);
        if range.is_inverted() {
            return Timeline { start_time: range.from, samples: Vec::new(), duration_delta: step };
        }
        if range.span() / step >= MAX_TIMELINE_POINTS {
            step = range.span() / MAX_TIMELINE_POINTS + 1;
        }
        let slots = (range.span() / step + 1) as usize;
        let mut samples = vec![None; slots];
        for &(t, v) in app.samples.iter().filter(|(t, _)| range.contains(*t)) {
            let slot = ((t.saturating_sub(range.from) / step) as usize).min(slots - 1);
            let cell = samples[slot].get_or_insert(0);
            *cell += v;
        }
        Timeline { start_time: range.from, samples, duration_delta: step }
    }
}

#[async_trait]
impl QueryBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn render_diff(&self, request: &FetchRequest) -> Result<DiffArtifact, BackendError> {
        self.delay().await;
        let left_app = self.app(&request.left_query)?;
        let right_app = self.app(&request.right_query)?;

        let left_timeline =
            self.timeline(left_app, TimeRange::new(request.left_from, request.left_until));
        let right_timeline =
            self.timeline(right_app, TimeRange::new(request.right_from, request.right_until));

        let profile = serde_json::json!({
            "leftTicks": left_timeline.total(),
            "rightTicks": right_timeline.total(),
            "maxNodes": request.max_nodes,
        });

        Ok(DiffArtifact { profile: Some(profile), left_timeline, right_timeline })
    }

    async fn labels(&self, query: &str) -> Result<TagSet, BackendError> {
        self.delay().await;
        let app = self.app(query)?;
        Ok(TagSet::from_labels(app.tags.keys().cloned()))
    }

    async fn label_values(&self, query: &str, label: &str) -> Result<Vec<String>, BackendError> {
        self.delay().await;
        let app = self.app(query)?;
        Ok(app.tags.get(label).cloned().unwrap_or_default())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> InMemoryBackend {
        let mut apps = BTreeMap::new();
        apps.insert(
            "svc".to_string(),
            AppFixture {
                samples: vec![(100, 1), (105, 2), (150, 4), (300, 8)],
                tags: BTreeMap::from([
                    ("region".to_string(), vec!["eu".to_string(), "us".to_string()]),
                    ("host".to_string(), vec!["a".to_string()]),
                ]),
            },
        );
        InMemoryBackend::new(Fixture { apps, latency_ms: 0, step: 10 })
    }

    fn request(left: (i64, i64), right: (i64, i64)) -> FetchRequest {
        FetchRequest {
            left_query: "svc{}".into(),
            left_from: left.0,
            left_until: left.1,
            right_query: "svc{}".into(),
            right_from: right.0,
            right_until: right.1,
            max_nodes: 1024,
        }
    }

    #[tokio::test]
    async fn test_render_diff_buckets_samples() {
        let a = backend().render_diff(&request((100, 150), (300, 310))).await.unwrap();
        assert_eq!(a.left_timeline.samples.len(), 6);
        assert_eq!(a.left_timeline.samples[0], Some(3));
        assert_eq!(a.left_timeline.samples[5], Some(4));
        assert_eq!(a.left_timeline.total(), 7);
        assert_eq!(a.right_timeline.total(), 8);
        let profile = a.profile.unwrap();
        assert_eq!(profile["leftTicks"], 7);
        assert_eq!(profile["rightTicks"], 8);
    }

    #[tokio::test]
    async fn test_inverted_range_gives_empty_timeline() {
        let a = backend().render_diff(&request((200, 100), (300, 310))).await.unwrap();
        assert!(a.left_timeline.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_app() {
        let mut req = request((0, 10), (0, 10));
        req.right_query = "nope{}".into();
        let err = backend().render_diff(&req).await.unwrap_err();
        assert_eq!(err, BackendError::UnknownApp("nope".into()));
    }

    #[tokio::test]
    async fn test_labels_and_values() {
        let b = backend();
        let tags = b.labels("svc{}").await.unwrap();
        assert_eq!(tags.labels().collect::<Vec<_>>(), vec!["host", "region"]);
        let values = b.label_values("svc{}", "region").await.unwrap();
        assert_eq!(values, vec!["eu", "us"]);
        assert!(b.label_values("svc{}", "pod").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wide_range_is_coarsened() {
        let a = backend().render_diff(&request((0, 1_000_000), (300, 310))).await.unwrap();
        assert!(a.left_timeline.samples.len() <= MAX_TIMELINE_POINTS as usize + 1);
        assert_eq!(a.left_timeline.total(), 15);
    }

    #[test]
    fn test_fixture_parses_with_defaults() {
        let f: Fixture = serde_json::from_str(r#"{"apps": {"svc": {"samples": [[1, 2]]}}}"#).unwrap();
        assert_eq!(f.step, 10);
        assert_eq!(f.latency_ms, 0);
        assert_eq!(f.apps["svc"].samples, vec![(1, 2)]);
    }
}
