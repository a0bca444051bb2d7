//! Edge visibility window for playback through a call sequence.
//!
//! Edges outside the window keep their place in the layout but are drawn
//! with the invisible connector. Mermaid addresses `linkStyle` by the
//! global index of each connector segment, so the plan accumulates those
//! indices for the edges sitting exactly on the window bounds.

use serde::Serialize;

use crate::{CallEdge, CallscopeError, CallscopeResult};

pub const VISIBLE_CONNECTOR: &str = "-->";
pub const HIDDEN_CONNECTOR: &str = "~~~";
/// `f64` carries no more significant decimals than this.
pub const MAX_TIME_PRECISION: usize = 17;

/// 1-based, inclusive; `None` is unbounded. An inverted window hides every
/// edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeWindow {
    pub first: Option<usize>,
    pub last: Option<usize>,
}

impl EdgeWindow {
    /// Build from the `-1 = unbounded` encoding used by options.
    pub fn from_indices(first: i64, last: i64) -> CallscopeResult<Self> {
        Ok(Self {
            first: bound("first_edge_index", first)?,
            last: bound("last_edge_index", last)?,
        })
    }

    pub fn contains(&self, position: usize) -> bool {
        self.first.is_none_or(|f| position >= f) && self.last.is_none_or(|l| position <= l)
    }

    pub fn is_first(&self, position: usize) -> bool {
        self.first == Some(position)
    }

    pub fn is_last(&self, position: usize) -> bool {
        self.last == Some(position)
    }
}

fn bound(field: &str, value: i64) -> CallscopeResult<Option<usize>> {
    match value {
        -1 => Ok(None),
        v if v >= 0 => Ok(Some(v as usize)),
        v => Err(CallscopeError::InvalidArgument(format!(
            "{field} must be -1 (unbounded) or an edge index, got {v}"
        ))),
    }
}

/// One edge as the template sees it.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeView<'a> {
    #[serde(flatten)]
    pub edge: &'a CallEdge,
    pub position: usize,
    pub visible: bool,
    pub connector: &'static str,
    pub is_first: bool,
    pub is_last: bool,
    /// Global indices of this edge's connector segments.
    pub links: Vec<usize>,
    pub time_label: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EdgePlan<'a> {
    pub edges: Vec<EdgeView<'a>>,
    pub first_links: Vec<usize>,
    pub last_links: Vec<usize>,
}

/// Lay out connectors for `edges`. With `show_time` every edge is drawn as
/// two segments (source to time label, time label to target). Precision is
/// capped at [`MAX_TIME_PRECISION`].
pub fn plan_edges<'a>(
    edges: &'a [CallEdge],
    window: EdgeWindow,
    show_time: bool,
    time_precision: usize,
) -> EdgePlan<'a> {
    let segments = if show_time { 2 } else { 1 };
    let time_precision = time_precision.min(MAX_TIME_PRECISION);
    let mut plan = EdgePlan::default();
    let mut next_link = 0usize;

    for (i, edge) in edges.iter().enumerate() {
        let position = i + 1;
        let visible = window.contains(position);
        let links: Vec<usize> = (next_link..next_link + segments).collect();
        next_link += segments;

        let is_first = window.is_first(position);
        let is_last = window.is_last(position);
        if is_first {
            plan.first_links.extend(&links);
        }
        if is_last {
            plan.last_links.extend(&links);
        }

        plan.edges.push(EdgeView {
            edge,
            position,
            visible,
            connector: if visible { VISIBLE_CONNECTOR } else { HIDDEN_CONNECTOR },
            is_first,
            is_last,
            links,
            time_label: format!("{:.*}", time_precision, edge.time),
        });
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(n: usize) -> Vec<CallEdge> {
        (0..n)
            .map(|i| CallEdge {
                id: format!("e-{i}"),
                source: "n-0".to_string(),
                target: format!("n-{}", i + 1),
                source_frame: 0,
                target_frame: i + 1,
                time: i as f64 + 0.5,
            })
            .collect()
    }

    #[test]
    fn window_hides_edges_outside_bounds() {
        let edges = edges(5);
        let window = EdgeWindow::from_indices(2, 4).expect("window");
        let plan = plan_edges(&edges, window, false, 0);
        let connectors: Vec<_> = plan.edges.iter().map(|e| e.connector).collect();
        assert_eq!(connectors, vec!["~~~", "-->", "-->", "-->", "~~~"]);
        assert!(plan.edges[1].is_first && !plan.edges[1].is_last);
        assert!(plan.edges[3].is_last && !plan.edges[3].is_first);
        assert_eq!(plan.first_links, vec![1]);
        assert_eq!(plan.last_links, vec![3]);
    }

    #[test]
    fn show_time_doubles_segment_indices() {
        let edges = edges(5);
        let window = EdgeWindow::from_indices(2, 4).expect("window");
        let plan = plan_edges(&edges, window, true, 1);
        assert_eq!(plan.edges[0].links, vec![0, 1]);
        assert_eq!(plan.first_links, vec![2, 3]);
        assert_eq!(plan.last_links, vec![6, 7]);
        assert_eq!(plan.edges[2].time_label, "2.5");
    }

    #[test]
    fn unbounded_window_shows_everything_without_markers() {
        let edges = edges(3);
        let plan = plan_edges(&edges, EdgeWindow::default(), false, 2);
        assert!(plan.edges.iter().all(|e| e.visible && !e.is_first && !e.is_last));
        assert!(plan.first_links.is_empty() && plan.last_links.is_empty());
        assert_eq!(plan.edges[0].time_label, "0.50");
    }

    #[test]
    fn half_open_windows() {
        let window = EdgeWindow::from_indices(3, -1).expect("window");
        assert!(!window.contains(2));
        assert!(window.contains(3));
        assert!(window.contains(100));

        let window = EdgeWindow::from_indices(-1, 2).expect("window");
        assert!(window.contains(1));
        assert!(!window.contains(3));
    }

    #[test]
    fn only_indices_below_minus_one_are_rejected() {
        assert!(EdgeWindow::from_indices(-1, -5).is_err());
        assert!(EdgeWindow::from_indices(-2, -1).is_err());
        assert!(EdgeWindow::from_indices(0, -1).is_ok());
        assert!(EdgeWindow::from_indices(4, 2).is_ok());
    }

    #[test]
    fn inverted_window_hides_everything() {
        let edges = edges(4);
        let window = EdgeWindow::from_indices(3, 2).expect("window");
        let plan = plan_edges(&edges, window, false, 0);
        assert!(plan.edges.iter().all(|e| !e.visible && e.connector == HIDDEN_CONNECTOR));
        assert!(plan.edges[2].is_first && plan.edges[1].is_last);
    }

    #[test]
    fn zero_first_index_shows_everything_without_a_first_marker() {
        let edges = edges(3);
        let window = EdgeWindow::from_indices(0, -1).expect("window");
        let plan = plan_edges(&edges, window, false, 0);
        assert!(plan.edges.iter().all(|e| e.visible));
        assert!(plan.first_links.is_empty());
    }

    #[test]
    fn huge_precision_is_capped() {
        let edges = edges(1);
        let plan = plan_edges(&edges, EdgeWindow::default(), false, usize::MAX);
        assert_eq!(plan.edges[0].time_label, format!("{:.17}", 0.5));
    }
}
