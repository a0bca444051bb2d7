//! Event-stream-to-graph compiler.
//!
//! Walks the open/close stream of an evented profile with an explicit call
//! stack. Every record opened while another record was on the stack becomes
//! an edge from the caller's opened frame to the record's own closed frame,
//! weighted by the record's open-to-close duration. Edge ids follow open
//! order, not close order.

use serde::{Deserialize, Serialize};

use std::collections::{BTreeMap, HashMap};

use crate::{CallscopeError, CallscopeResult, Event, EventKind, Frame, SpeedscopeDocument};

/// What to do with opens that never close and closes with nothing open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnbalancedPolicy {
    /// Reject the stream with `UnbalancedEventStream`.
    #[default]
    Strict,
    /// Ignore stray closes and drop records that never closed.
    SkipDangling,
}

impl clap::ValueEnum for UnbalancedPolicy {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Strict, Self::SkipDangling]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Strict => clap::builder::PossibleValue::new("strict"),
            Self::SkipDangling => clap::builder::PossibleValue::new("skip_dangling"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    pub index: usize,
    pub name: String,
    pub file: Option<String>,
    pub line: Option<u64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_frame: usize,
    pub target_frame: usize,
    pub time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub id: String,
    pub file: String,
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallgraphModel {
    pub nodes: Vec<Node>,
    pub edges: Vec<CallEdge>,
    pub groups: Vec<Group>,
}

pub fn node_id(frame: usize) -> String {
    format!("n-{frame}")
}

#[derive(Debug)]
struct OpenRecord {
    opened: Event,
    closed: Option<Event>,
    parent: Option<usize>,
}

impl CallgraphModel {
    pub fn from_document(doc: &SpeedscopeDocument, policy: UnbalancedPolicy) -> CallscopeResult<Self> {
        if doc.is_empty() {
            return Ok(Self::default());
        }
        compile(&doc.frames, doc.events(), policy)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn group_of(&self, node_id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.nodes.iter().any(|n| n == node_id))
    }
}

pub fn compile(
    frames: &[Frame],
    events: &[Event],
    policy: UnbalancedPolicy,
) -> CallscopeResult<CallgraphModel> {
    let (nodes, groups) = build_nodes(frames);

    let mut observed: Vec<OpenRecord> = Vec::with_capacity(events.len() / 2);
    let mut stack: Vec<usize> = Vec::new();
    let mut stray_closes = 0usize;

    for (idx, event) in events.iter().enumerate() {
        if event.frame >= frames.len() {
            return Err(CallscopeError::MalformedProfile(format!(
                "event {idx} references frame {} but only {} frames exist",
                event.frame,
                frames.len()
            )));
        }
        match event.kind {
            EventKind::Open => {
                observed.push(OpenRecord {
                    opened: *event,
                    closed: None,
                    parent: stack.last().copied(),
                });
                stack.push(observed.len() - 1);
            }
            EventKind::Close => match stack.pop() {
                Some(top) => {
                    let record = &mut observed[top];
                    if record.opened.frame != event.frame {
                        tracing::debug!(
                            "event {idx} closes frame {} while frame {} is open",
                            event.frame,
                            record.opened.frame
                        );
                    }
                    record.closed = Some(*event);
                }
                None => match policy {
                    UnbalancedPolicy::Strict => {
                        return Err(CallscopeError::UnbalancedEventStream {
                            index: idx,
                            reason: format!("close of frame {} with no open frame", event.frame),
                        });
                    }
                    UnbalancedPolicy::SkipDangling => {
                        stray_closes += 1;
                    }
                },
            },
        }
    }

    if !stack.is_empty() {
        match policy {
            UnbalancedPolicy::Strict => {
                let frames_left: Vec<String> = stack
                    .iter()
                    .map(|&r| observed[r].opened.frame.to_string())
                    .collect();
                return Err(CallscopeError::UnbalancedEventStream {
                    index: events.len(),
                    reason: format!(
                        "{} frame(s) still open at end of stream: [{}]",
                        stack.len(),
                        frames_left.join(", ")
                    ),
                });
            }
            UnbalancedPolicy::SkipDangling => {
                tracing::warn!("dropping {} unclosed record(s) at end of stream", stack.len());
            }
        }
    }
    if stray_closes > 0 {
        tracing::warn!("ignored {stray_closes} close event(s) with no open frame");
    }

    let mut edges = Vec::new();
    for record in &observed {
        let (Some(parent), Some(closed)) = (record.parent, record.closed) else {
            continue;
        };
        let source_frame = observed[parent].opened.frame;
        edges.push(CallEdge {
            id: format!("e-{}", edges.len()),
            source: node_id(source_frame),
            target: node_id(closed.frame),
            source_frame,
            target_frame: closed.frame,
            time: closed.at - record.opened.at,
        });
    }

    tracing::debug!(
        "compiled {} nodes, {} edges, {} groups from {} events",
        nodes.len(),
        edges.len(),
        groups.len(),
        events.len()
    );

    Ok(CallgraphModel { nodes, edges, groups })
}

fn build_nodes(frames: &[Frame]) -> (Vec<Node>, Vec<Group>) {
    let mut nodes = Vec::with_capacity(frames.len());
    let mut groups: Vec<Group> = Vec::new();
    let mut group_index = HashMap::<&str, usize>::new();

    for (i, frame) in frames.iter().enumerate() {
        let id = node_id(i);
        if let Some(file) = frame.file.as_deref() {
            let slot = *group_index.entry(file).or_insert_with(|| {
                groups.push(Group {
                    id: format!("g-{}", groups.len()),
                    file: file.to_string(),
                    nodes: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].nodes.push(id.clone());
        }
        nodes.push(Node {
            id,
            index: i,
            name: frame.name.clone(),
            file: frame.file.clone(),
            line: frame.line,
            extra: frame.extra.clone(),
        });
    }
    (nodes, groups)
}
