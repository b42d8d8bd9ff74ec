//! Plain-text rendering of view events and snapshots.

use std::fmt::Write as _;

use diffscope_client::{FetchState, LoadPhase, ViewEvent, ViewSnapshot};
use diffscope_types::{DiffArtifact, FetchRequest, Side, TagSet};

/// One line per event, prefixed with its kind.
pub fn event_line(event: &ViewEvent) -> String {
    let detail = match event {
        ViewEvent::RangesChanged { left, right } => format!("left={left} right={right}"),
        ViewEvent::QueriesChanged { left, right } => format!("left={left:?} right={right:?}"),
        ViewEvent::FetchStarted { generation, request } => {
            format!("{generation} {}", request_summary(request))
        }
        ViewEvent::FetchCancelled { generation } => generation.to_string(),
        ViewEvent::DiffDelivered { generation, artifact } => {
            format!("{generation} {}", artifact_summary(artifact))
        }
        ViewEvent::FetchFailed { generation, error } => format!("{generation} {error}"),
        ViewEvent::TagsResolved { side, query, tags } => {
            format!("{side} {query:?} [{}]", label_list(tags))
        }
        ViewEvent::TagValues { side, label, values, .. } => {
            format!("{side} {label} [{}]", values.join(", "))
        }
        ViewEvent::TagLookupFailed { side, query, error } => format!("{side} {query:?} {error}"),
    };
    format!("{:<15} {detail}", event.kind())
}

/// Multi-line dump for the `show` command.
pub fn snapshot_text(snap: &ViewSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "query       {:?}", snap.query);
    for side in Side::BOTH {
        let query = match side {
            Side::Left => &snap.left_query,
            Side::Right => &snap.right_query,
        };
        let _ = writeln!(
            out,
            "{:<11} {} {:?} tags=[{}] {}",
            side.as_str(),
            snap.range(side),
            query,
            label_list(snap.tags(side)),
            side.color().to_css(),
        );
    }
    let _ = writeln!(
        out,
        "fetch       {} ({}) refresh={} max_nodes={}",
        state_text(snap.fetch_state),
        phase_text(snap.phase),
        snap.refresh_token.0,
        snap.max_nodes,
    );
    if let Some(artifact) = &snap.artifact {
        let _ = writeln!(out, "diff        {}", artifact_summary(artifact));
    }
    if let Some(failure) = &snap.last_error {
        let _ = writeln!(out, "error       {} {}", failure.generation, failure.error);
    }
    let _ = writeln!(
        out,
        "display     tz={} color={:?} export={}",
        snap.timezone.as_str(),
        snap.color_mode,
        if snap.is_exportable() { "yes" } else { "no" },
    );
    out
}

fn request_summary(req: &FetchRequest) -> String {
    format!(
        "left={:?}@{}..{} right={:?}@{}..{} max_nodes={}",
        req.left_query,
        req.left_from,
        req.left_until,
        req.right_query,
        req.right_from,
        req.right_until,
        req.max_nodes,
    )
}

fn artifact_summary(artifact: &DiffArtifact) -> String {
    format!(
        "left_total={} right_total={} points={}/{} profile={}",
        artifact.left_timeline.total(),
        artifact.right_timeline.total(),
        artifact.left_timeline.samples.len(),
        artifact.right_timeline.samples.len(),
        if artifact.is_exportable() { "yes" } else { "no" },
    )
}

fn label_list(tags: &TagSet) -> String {
    tags.labels().collect::<Vec<_>>().join(", ")
}

fn state_text(state: FetchState) -> String {
    match state {
        FetchState::Idle => "idle".to_string(),
        FetchState::Fetching(g) => format!("fetching {g}"),
        FetchState::Delivered(g) => format!("delivered {g}"),
        FetchState::Failed(g) => format!("failed {g}"),
        FetchState::Cancelled(g) => format!("cancelled {g}"),
    }
}

fn phase_text(phase: LoadPhase) -> &'static str {
    match phase {
        LoadPhase::Pristine => "pristine",
        LoadPhase::Loading => "loading",
        LoadPhase::Reloading => "reloading",
        LoadPhase::Loaded => "loaded",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use diffscope_client::BackendError;
    use diffscope_types::{FetchGeneration, TimeRange};

    #[test]
    fn test_ranges_line() {
        let line = event_line(&ViewEvent::RangesChanged {
            left: TimeRange::new(1, 2),
            right: TimeRange::new(3, 4),
        });
        assert!(line.starts_with("ranges"));
        assert!(line.ends_with("left=1..2 right=3..4"));
    }

    #[test]
    fn test_failure_line_names_generation() {
        let line = event_line(&ViewEvent::FetchFailed {
            generation: FetchGeneration(7),
            error: BackendError::Timeout,
        });
        assert!(line.starts_with("fetch-failed"));
        assert!(line.contains("#7 request timed out"));
    }

    #[test]
    fn test_tags_line_lists_labels() {
        let line = event_line(&ViewEvent::TagsResolved {
            side: Side::Right,
            query: "app{}".into(),
            tags: TagSet::from_labels(["pod", "host"]),
        });
        assert!(line.ends_with("right \"app{}\" [host, pod]"));
    }
}
