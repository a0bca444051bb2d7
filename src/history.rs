//! Append-only ledger of profiling sessions, optionally archived to disk.
//!
//! Archiving is opt-in: without a folder nothing is written and nothing is
//! recorded. The file write and the ledger append succeed or fail together.
//! A filename already used by an earlier entry, or already on disk, gets a
//! numeric suffix (`name-1.json`). No lock is taken, so two processes racing
//! for the same name still overwrite each other.

use minijinja::Environment;
use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};

use crate::{Clock, CallscopeError, CallscopeResult, SystemClock, rounded_timestamp, sanitize_filename};

pub const DEFAULT_FILENAME_TEMPLATE: &str = "{{ now_timestamp }}-{{ name }}.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub name: String,
    pub raw_json: String,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSettings {
    pub folder: Option<PathBuf>,
    pub filename_template: String,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            folder: None,
            filename_template: DEFAULT_FILENAME_TEMPLATE.to_string(),
        }
    }
}

impl ArchiveSettings {
    pub fn in_folder(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: Some(folder.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug)]
pub struct Ledger<C: Clock = SystemClock> {
    settings: ArchiveSettings,
    clock: C,
    items: Vec<HistoryItem>,
}

impl Ledger<SystemClock> {
    pub fn new(settings: ArchiveSettings) -> Self {
        Self::with_clock(settings, SystemClock)
    }
}

impl<C: Clock> Ledger<C> {
    pub fn with_clock(settings: ArchiveSettings, clock: C) -> Self {
        Self {
            settings,
            clock,
            items: Vec::new(),
        }
    }

    pub fn settings(&self) -> &ArchiveSettings {
        &self.settings
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Archive `raw_json` and append it. Returns `None` when no folder is
    /// configured.
    pub fn record_session(
        &mut self,
        raw_json: &str,
        name: &str,
        explicit_filename: Option<&str>,
    ) -> CallscopeResult<Option<HistoryItem>> {
        let Some(folder) = self.settings.folder.clone() else {
            tracing::debug!("no archive folder configured; not recording {name:?}");
            return Ok(None);
        };

        let filename = match explicit_filename {
            Some(f) => f.to_string(),
            None => self.render_filename(name)?,
        };
        let path = self.unique_path(&folder, &sanitize_filename(&filename)?);
        write_archive(&path, raw_json)?;
        tracing::info!("archived {name:?} to {}", path.display());

        let item = HistoryItem {
            name: name.to_string(),
            raw_json: raw_json.to_string(),
            path: Some(path),
        };
        self.items.push(item.clone());
        Ok(Some(item))
    }

    fn is_taken(&self, path: &Path) -> bool {
        path.exists() || self.items.iter().any(|i| i.path.as_deref() == Some(path))
    }

    fn unique_path(&self, folder: &Path, filename: &str) -> PathBuf {
        let first = folder.join(filename);
        if !self.is_taken(&first) {
            return first;
        }
        let as_path = Path::new(filename);
        let stem = as_path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        let ext = as_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let mut n = 1usize;
        loop {
            let candidate = folder.join(format!("{stem}-{n}{ext}"));
            if !self.is_taken(&candidate) {
                tracing::debug!("{} is taken; archiving to {}", first.display(), candidate.display());
                return candidate;
            }
            n += 1;
        }
    }

    fn render_filename(&self, name: &str) -> CallscopeResult<String> {
        let source = self.settings.filename_template.as_str();
        let now = rounded_timestamp(self.clock.now_unix());
        let mut env = Environment::new();
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        env.render_str(source, minijinja::context! { now_timestamp => now, name => name })
            .map_err(|e| CallscopeError::template(&e, source))
    }
}

fn write_archive(path: &Path, raw_json: &str) -> CallscopeResult<()> {
    let wrap = |source: std::io::Error| CallscopeError::ArchiveWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(wrap)?;
    }
    std::fs::write(path, raw_json).map_err(wrap)
}
