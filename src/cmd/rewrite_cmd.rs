//! `callscope rewrite`: redact and rename raw profile JSON.

use clap::Args;

use std::path::PathBuf;

use crate::{CallscopeResult, Config, RewriteRule, read_profile, rewrite_profile_json, write_text};

#[derive(Debug, Clone, Args)]
pub struct RewriteArgs {
    #[arg(value_name = "PROFILE")]
    pub profile: PathBuf,
    /// Set the document and profile names; output is re-serialized.
    #[arg(long)]
    pub name: Option<String>,
    /// Extra `PATTERN=REPLACEMENT` rule, applied after configured rules.
    #[arg(long = "rule", value_name = "PATTERN=REPLACEMENT")]
    pub rules: Vec<String>,
    /// Skip the working-directory and install-path redactions.
    #[arg(long)]
    pub no_default_rules: bool,
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn rewrite_command(config: &Config, args: &RewriteArgs) -> CallscopeResult<String> {
    let extra = args
        .rules
        .iter()
        .map(|s| RewriteRule::parse_assignment(s))
        .collect::<CallscopeResult<Vec<_>>>()?;
    let mut settings = config.rewrite.clone();
    if args.no_default_rules {
        settings.default_rules = false;
    }
    let rules = settings.build_rules(&extra)?;
    tracing::debug!("rewriting {} with {} rules", args.profile.display(), rules.len());

    let raw = read_profile(&args.profile)?;
    let rewritten = rewrite_profile_json(&raw, &rules, args.name.as_deref())?;
    if let Some(out) = &args.out {
        write_text(out, &rewritten)?;
    }
    Ok(rewritten)
}
