//! HTTP backend speaking the profile server's render API.
//!
//! ```text
//! GET {base}/render-diff?leftQuery&leftFrom&leftUntil&rightQuery&rightFrom&rightUntil&format=json&max-nodes
//! GET {base}/labels?query
//! GET {base}/label-values?label&query
//! ```
//!
//! Cancellation is the caller's business: dropping the future returned by a
//! method aborts the request.

use std::time::Duration;

use async_trait::async_trait;
use diffscope_types::{DiffArtifact, FetchRequest, TagSet, Timeline};
use serde::de::DeserializeOwned;

use super::{BackendError, QueryBackend};

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("client init: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(map_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status { status: status.as_u16(), body });
        }

        resp.json::<T>().await.map_err(|e| BackendError::Decode(e.to_string()))
    }
}

fn map_reqwest(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Transport(e.to_string())
    }
}

/// Query parameters for a diff request.
pub fn diff_params(req: &FetchRequest) -> Vec<(&'static str, String)> {
    vec![
        ("leftQuery", req.left_query.clone()),
        ("leftFrom", req.left_from.to_string()),
        ("leftUntil", req.left_until.to_string()),
        ("rightQuery", req.right_query.clone()),
        ("rightFrom", req.right_from.to_string()),
        ("rightUntil", req.right_until.to_string()),
        ("format", "json".to_string()),
        ("max-nodes", req.max_nodes.to_string()),
    ]
}

/// Pull the per-side timelines out of a render-diff body; whatever remains
/// is the profile.
pub fn split_diff_response(body: serde_json::Value) -> Result<DiffArtifact, BackendError> {
    let serde_json::Value::Object(mut map) = body else {
        return Err(BackendError::Decode("render-diff body is not an object".into()));
    };

    let mut take_timeline = |key: &str| -> Result<Timeline, BackendError> {
        match map.remove(key) {
            Some(v) if !v.is_null() => serde_json::from_value(v)
                .map_err(|e| BackendError::Decode(format!("{key}: {e}"))),
            _ => Ok(Timeline::default()),
        }
    };
    let left_timeline = take_timeline("leftTimeline")?;
    let right_timeline = take_timeline("rightTimeline")?;

    let profile = if map.is_empty() { None } else { Some(serde_json::Value::Object(map)) };
    Ok(DiffArtifact { profile, left_timeline, right_timeline })
}

#[async_trait]
impl QueryBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    #[tracing::instrument(skip(self, request), name = "backend.render_diff", fields(base = %self.base_url))]
    async fn render_diff(&self, request: &FetchRequest) -> Result<DiffArtifact, BackendError> {
        let body: serde_json::Value = self.get_json("/render-diff", &diff_params(request)).await?;
        split_diff_response(body)
    }

    #[tracing::instrument(skip(self), name = "backend.labels")]
    async fn labels(&self, query: &str) -> Result<TagSet, BackendError> {
        let labels: Vec<String> = self
            .get_json("/labels", &[("query", query.to_string())])
            .await?;
        Ok(TagSet::from_labels(labels))
    }

    #[tracing::instrument(skip(self), name = "backend.label_values")]
    async fn label_values(&self, query: &str, label: &str) -> Result<Vec<String>, BackendError> {
        self.get_json(
            "/label-values",
            &[("label", label.to_string()), ("query", query.to_string())],
        )
        .await
    }
}

// ============================================================================
// Tests
// ============================================================================
