//! Session archive commands (`callscope archive ...`).

use clap::Subcommand;

use std::path::PathBuf;

use crate::{
    ArchiveSettings, CallscopeError, CallscopeResult, Config, Ledger, list_archived, read_profile,
    rewrite_profile_json,
};

#[derive(Debug, Subcommand)]
pub enum ArchiveCommand {
    /// Redact, rename and archive one profile.
    Record {
        #[arg(value_name = "PROFILE")]
        profile: PathBuf,
        #[arg(long)]
        name: String,
        /// Overrides `[archive].folder`.
        #[arg(long)]
        folder: Option<PathBuf>,
        /// Use this filename instead of the configured template.
        #[arg(long)]
        filename: Option<String>,
    },
    /// List archived profiles, sorted by path.
    List {
        #[arg(long)]
        folder: Option<PathBuf>,
    },
}

fn resolve_settings(config: &Config, folder: Option<&PathBuf>) -> CallscopeResult<ArchiveSettings> {
    let mut settings = config.archive.clone();
    if let Some(folder) = folder {
        settings.folder = Some(folder.to_path_buf());
    }
    if settings.folder.is_none() {
        return Err(CallscopeError::Config(
            "no archive folder: pass --folder or set [archive].folder".to_string(),
        ));
    }
    Ok(settings)
}

pub fn archive_command(config: &Config, command: &ArchiveCommand) -> CallscopeResult<serde_json::Value> {
    match command {
        ArchiveCommand::Record {
            profile,
            name,
            folder,
            filename,
        } => {
            let settings = resolve_settings(config, folder.as_ref())?;
            let rules = config.rewrite.build_rules(&[])?;
            let raw = rewrite_profile_json(&read_profile(profile)?, &rules, Some(name))?;

            let mut ledger = Ledger::new(settings);
            let item = ledger.record_session(&raw, name, filename.as_deref())?;
            Ok(serde_json::json!({
                "name": name,
                "path": item.and_then(|i| i.path).map(|p| p.to_string_lossy().to_string()),
            }))
        }

        ArchiveCommand::List { folder } => {
            let settings = resolve_settings(config, folder.as_ref())?;
            let folder = settings.folder.unwrap_or_default();
            let files: Vec<String> = list_archived(&folder)?
                .into_iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect();
            Ok(serde_json::to_value(files)?)
        }
    }
}
