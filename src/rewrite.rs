//! Textual rewriting and redaction of raw profile JSON.
//!
//! Two stages: ordered regex substitutions over the raw text (which need not
//! be valid JSON yet), then an optional structural pass that renames the
//! document and its profiles and re-serializes with sorted keys.

use regex::Regex;
use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};

use crate::{CallscopeError, CallscopeResult};

/// A kernel's cached copy of a notebook cell, e.g. `/tmp/ipykernel_12/3456.py`.
pub const KERNEL_CACHE_PATTERN: &str = r#""[^"]+?ipykernel_\d+.\d+\.py""#;
pub const KERNEL_CACHE_REPLACEMENT: &str = r#""__main__""#;
/// Synthetic notebook cell filenames, e.g. `ipython-input-3-abc`.
pub const CELL_INPUT_PATTERN: &str = r"ipython-input-\d+-\d+";
pub const CELL_INPUT_REPLACEMENT: &str = "__main__";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule {
    pub pattern: String,
    pub replacement: String,
}

impl RewriteRule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }

    /// Parse `PATTERN=REPLACEMENT`; the first `=` splits.
    pub fn parse_assignment(s: &str) -> CallscopeResult<Self> {
        let (pattern, replacement) = s.split_once('=').ok_or_else(|| {
            CallscopeError::InvalidArgument(format!("rewrite rule {s:?} must look like PATTERN=REPLACEMENT"))
        })?;
        if pattern.is_empty() {
            return Err(CallscopeError::InvalidArgument(format!("rewrite rule {s:?} has an empty pattern")));
        }
        Ok(Self::new(pattern, replacement))
    }
}

/// Machine-specific paths to redact, resolved once per session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedactionEnv {
    pub cwd: Option<PathBuf>,
    pub install_path: Option<PathBuf>,
}

impl RedactionEnv {
    pub fn detect(install_path: Option<PathBuf>) -> Self {
        Self {
            cwd: std::env::current_dir().ok(),
            install_path,
        }
    }
}

/// Ordered regex substitutions. Earlier rules run first.
#[derive(Debug, Clone, Default)]
pub struct RewriteRules {
    rules: Vec<(Regex, String)>,
}

impl RewriteRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pattern: &str, replacement: impl Into<String>) -> CallscopeResult<()> {
        self.rules.push((Regex::new(pattern)?, replacement.into()));
        Ok(())
    }

    pub fn push_literal(&mut self, literal: &str, replacement: impl Into<String>) -> CallscopeResult<()> {
        self.push(&regex::escape(literal), replacement)
    }

    pub fn from_rules(rules: &[RewriteRule]) -> CallscopeResult<Self> {
        let mut out = Self::new();
        out.extend(rules)?;
        Ok(out)
    }

    pub fn extend(&mut self, rules: &[RewriteRule]) -> CallscopeResult<()> {
        for rule in rules {
            self.push(&rule.pattern, rule.replacement.clone())?;
        }
        Ok(())
    }

    /// Working directory to `.`, kernel cache paths and cell names to
    /// `__main__`, the install path and its parent to nothing.
    pub fn defaults(env: &RedactionEnv) -> CallscopeResult<Self> {
        let mut rules = Self::new();
        if let Some(cwd) = env.cwd.as_deref().filter(|p| is_redactable(p)) {
            rules.push_literal(&cwd.to_string_lossy(), ".")?;
        }
        rules.push(KERNEL_CACHE_PATTERN, KERNEL_CACHE_REPLACEMENT)?;
        if let Some(install) = env.install_path.as_deref().filter(|p| is_redactable(p)) {
            rules.push_literal(&install.to_string_lossy(), "")?;
            if let Some(parent) = install.parent().filter(|p| is_redactable(p)) {
                rules.push_literal(&parent.to_string_lossy(), "")?;
            }
        }
        rules.push(CELL_INPUT_PATTERN, CELL_INPUT_REPLACEMENT)?;
        Ok(rules)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(re, _)| re.as_str())
    }

    pub fn apply(&self, raw: &str) -> String {
        let mut out = raw.to_string();
        for (re, replacement) in &self.rules {
            if let std::borrow::Cow::Owned(replaced) = re.replace_all(&out, replacement.as_str()) {
                out = replaced;
            }
        }
        out
    }
}

/// A filesystem root or empty path would turn every separator into a match.
fn is_redactable(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.parent().is_some()
}

pub fn rewrite_profile_json(raw: &str, rules: &RewriteRules, name: Option<&str>) -> CallscopeResult<String> {
    let rewritten = rules.apply(raw);
    let Some(name) = name else {
        return Ok(rewritten);
    };

    let mut value: serde_json::Value = serde_json::from_str(&rewritten)
        .map_err(|e| CallscopeError::MalformedProfile(format!("rewritten profile is not json: {e}")))?;
    let root = value
        .as_object_mut()
        .ok_or_else(|| CallscopeError::MalformedProfile("top level must be an object".to_string()))?;
    root.insert("name".to_string(), serde_json::json!(name));
    if let Some(profiles) = root.get_mut("profiles").and_then(|p| p.as_array_mut()) {
        for profile in profiles.iter_mut().filter_map(|p| p.as_object_mut()) {
            profile.insert("name".to_string(), serde_json::json!(name));
        }
    }
    Ok(serde_json::to_string_pretty(&sort_keys(value))?)
}

fn sort_keys(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            serde_json::Value::Object(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect())
        }
        serde_json::Value::Array(items) => serde_json::Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
