//! Small filesystem utilities.

use regex::Regex;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use walkdir::WalkDir;

use crate::{CallscopeError, CallscopeResult};

/// Replace every run of characters outside `[A-Za-z0-9_.-]` with one `_`.
pub fn sanitize_filename(name: &str) -> CallscopeResult<String> {
    static UNSAFE_RUN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    let re = UNSAFE_RUN
        .get_or_init(|| Regex::new(r"[^A-Za-z0-9_.\-]+"))
        .as_ref()
        .map_err(|e| CallscopeError::InvalidArgument(format!("filename pattern: {e}")))?;
    Ok(re.replace_all(name, "_").into_owned())
}

pub fn write_text(path: &Path, value: &str) -> CallscopeResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, value)?;
    Ok(())
}

pub fn write_json(path: &Path, value: &impl serde::Serialize) -> CallscopeResult<()> {
    write_text(path, &serde_json::to_string_pretty(value)?)
}

/// Archived profiles directly under `folder`, sorted by path.
pub fn list_archived(folder: &Path) -> CallscopeResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    if !folder.exists() {
        return Ok(out);
    }
    for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let msg = e.to_string();
            CallscopeError::Io(e.into_io_error().unwrap_or_else(|| std::io::Error::other(msg)))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_json = entry
            .path()
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            out.push(entry.path().to_path_buf());
        }
    }
    out.sort();
    Ok(out)
}
