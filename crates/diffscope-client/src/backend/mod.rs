//! Query backends.
//!
//! [`QueryBackend`] is the seam to whatever executes profile queries. The view
//! actor only ever talks to it through `Arc<dyn QueryBackend>`, so swapping the
//! HTTP client for the in-memory one (or a test double) touches nothing else.

use async_trait::async_trait;
use diffscope_types::{DiffArtifact, FetchRequest, TagSet};

pub mod http;
pub mod memory;

pub use http::HttpBackend;
pub use memory::{AppFixture, Fixture, InMemoryBackend};

/// Errors from a backend call.
///
/// Cloneable so a failure can be broadcast to every subscriber and kept as
/// the view's dismissible `last_error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("unknown application: {0}")]
    UnknownApp(String),
}

/// Executes diff, label, and label-value queries.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Compute the diff between the two sides of `request`.
    async fn render_diff(&self, request: &FetchRequest) -> Result<DiffArtifact, BackendError>;

    /// Tag names known for `query`.
    async fn labels(&self, query: &str) -> Result<TagSet, BackendError>;

    /// Known values of `label` under `query`, in backend order.
    async fn label_values(&self, query: &str, label: &str) -> Result<Vec<String>, BackendError>;
}

/// The application name part of a query: everything before the first `{`.
pub fn app_name(query: &str) -> &str {
    query.split('{').next().unwrap_or("").trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_name() {
        assert_eq!(app_name("app.cpu{region=\"eu\"}"), "app.cpu");
        assert_eq!(app_name("app.cpu"), "app.cpu");
        assert_eq!(app_name("{}"), "");
        assert_eq!(app_name(""), "");
    }

    #[test]
    fn test_error_display() {
        let e = BackendError::Status { status: 503, body: "busy".into() };
        assert_eq!(e.to_string(), "server returned 503: busy");
    }
}
