//! Speedscope document model: parsing and validation of evented profiles.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

use crate::{CallscopeError, CallscopeResult};

/// The canonical four-frame sample document. A fresh view renders this.
pub const SAMPLE_PROFILE_JSON: &str = r#"{
  "$schema": "https://www.speedscope.app/file-format-schema.json",
  "version": "0.0.1",
  "shared": {
    "frames": [
      {"name": "a"},
      {"name": "b"},
      {"name": "c"},
      {"name": "d"}
    ]
  },
  "profiles": [
    {
      "endValue": 14,
      "events": [
        {"at": 0, "frame": 0, "type": "O"},
        {"at": 0, "frame": 1, "type": "O"},
        {"at": 0, "frame": 2, "type": "O"},
        {"at": 2, "frame": 2, "type": "C"},
        {"at": 2, "frame": 3, "type": "O"},
        {"at": 6, "frame": 3, "type": "C"},
        {"at": 6, "frame": 2, "type": "O"},
        {"at": 9, "frame": 2, "type": "C"},
        {"at": 14, "frame": 1, "type": "C"},
        {"at": 14, "frame": 0, "type": "C"}
      ],
      "name": "simple.txt",
      "startValue": 0,
      "type": "evented",
      "unit": "none"
    }
  ]
}"#;

/// A named call site from `shared.frames`. Identity is its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u64>,
    /// Any other attributes (`col`, ...), passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Frame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: None,
            line: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_line(mut self, line: u64) -> Self {
        self.line = Some(line);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "O")]
    Open,
    #[serde(rename = "C")]
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub at: f64,
    pub frame: usize,
}

impl Event {
    pub fn open(frame: usize, at: f64) -> Self {
        Self {
            kind: EventKind::Open,
            at,
            frame,
        }
    }

    pub fn close(frame: usize, at: f64) -> Self {
        Self {
            kind: EventKind::Close,
            at,
            frame,
        }
    }
}

/// The first profile of a document, reduced to what the compiler consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventedProfile {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub start_value: Option<f64>,
    pub end_value: Option<f64>,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpeedscopeDocument {
    pub name: Option<String>,
    pub frames: Vec<Frame>,
    /// `None` when the document carries no `profiles` key at all.
    pub profile: Option<EventedProfile>,
    /// Number of profiles present; only the first is consumed.
    pub profile_count: usize,
}

impl SpeedscopeDocument {
    pub fn is_empty(&self) -> bool {
        self.profile.is_none()
    }

    pub fn events(&self) -> &[Event] {
        self.profile.as_ref().map(|p| p.events.as_slice()).unwrap_or_default()
    }
}

pub fn parse_profile(raw: &str) -> CallscopeResult<SpeedscopeDocument> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| CallscopeError::MalformedProfile(format!("invalid json: {e}")))?;
    let root = value
        .as_object()
        .ok_or_else(|| CallscopeError::MalformedProfile("top level must be an object".to_string()))?;

    let name = root.get("name").and_then(|v| v.as_str()).map(ToString::to_string);

    let Some(profiles) = root.get("profiles") else {
        tracing::debug!("document has no profiles; treating as empty");
        return Ok(SpeedscopeDocument {
            name,
            ..SpeedscopeDocument::default()
        });
    };
    let profiles = profiles
        .as_array()
        .ok_or_else(|| CallscopeError::MalformedProfile("`profiles` must be an array".to_string()))?;
    let first = profiles
        .first()
        .ok_or_else(|| CallscopeError::MalformedProfile("`profiles` is empty".to_string()))?;
    if profiles.len() > 1 {
        tracing::debug!("ignoring {} additional profiles", profiles.len() - 1);
    }

    let frames_value = root
        .get("shared")
        .and_then(|s| s.get("frames"))
        .ok_or_else(|| CallscopeError::MalformedProfile("missing `shared.frames`".to_string()))?;
    let frames = Vec::<Frame>::deserialize(frames_value)
        .map_err(|e| CallscopeError::MalformedProfile(format!("invalid frame table: {e}")))?;

    let profile = parse_evented(first, frames.len())?;

    Ok(SpeedscopeDocument {
        name,
        frames,
        profile: Some(profile),
        profile_count: profiles.len(),
    })
}

fn parse_evented(value: &serde_json::Value, frame_count: usize) -> CallscopeResult<EventedProfile> {
    if let Some(kind) = value.get("type").and_then(|v| v.as_str()) {
        if kind != "evented" {
            return Err(CallscopeError::MalformedProfile(format!(
                "profile type {kind:?} is not supported (expected \"evented\")"
            )));
        }
    }
    let events_value = value
        .get("events")
        .ok_or_else(|| CallscopeError::MalformedProfile("profile has no `events`".to_string()))?;
    let events = Vec::<Event>::deserialize(events_value)
        .map_err(|e| CallscopeError::MalformedProfile(format!("invalid event list: {e}")))?;

    if let Some((idx, e)) = events.iter().enumerate().find(|(_, e)| e.frame >= frame_count) {
        return Err(CallscopeError::MalformedProfile(format!(
            "event {idx} references frame {} but only {frame_count} frames exist",
            e.frame
        )));
    }

    Ok(EventedProfile {
        name: value.get("name").and_then(|v| v.as_str()).map(ToString::to_string),
        unit: value.get("unit").and_then(|v| v.as_str()).map(ToString::to_string),
        start_value: value.get("startValue").and_then(|v| v.as_f64()),
        end_value: value.get("endValue").and_then(|v| v.as_f64()),
        events,
    })
}
