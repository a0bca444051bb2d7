//! Diagram and callgraph commands (`callscope render`, `callscope graph`).

use clap::Args;
use serde::Serialize;

use std::path::{Path, PathBuf};

use crate::{
    CallgraphModel, CallscopeResult, Config, DiagramRenderer, Direction, RenderOptions, UnbalancedPolicy,
    parse_profile, write_json, write_text,
};

const PROFILE_HELP: &str = "Speedscope JSON file, or `-` for stdin.";

#[derive(Debug, Clone, Args)]
pub struct RenderArgs {
    #[arg(value_name = "PROFILE", help = PROFILE_HELP)]
    pub profile: PathBuf,
    #[arg(long)]
    pub direction: Option<Direction>,
    /// Label every edge with its duration.
    #[arg(long, overrides_with = "no_show_time")]
    pub show_time: bool,
    #[arg(long, overrides_with = "show_time")]
    pub no_show_time: bool,
    #[arg(long)]
    pub time_precision: Option<usize>,
    /// Wrap nodes from the same file in a subgraph.
    #[arg(long, overrides_with = "no_group_by_file")]
    pub group_by_file: bool,
    #[arg(long, overrides_with = "group_by_file")]
    pub no_group_by_file: bool,
    /// Lay out with the elk renderer.
    #[arg(long, overrides_with = "no_elk")]
    pub elk: bool,
    #[arg(long, overrides_with = "elk")]
    pub no_elk: bool,
    /// First visible edge, 1-based; -1 for unbounded.
    #[arg(long = "first-edge", allow_negative_numbers = true)]
    pub first_edge: Option<i64>,
    /// Last visible edge, 1-based; -1 for unbounded.
    #[arg(long = "last-edge", allow_negative_numbers = true)]
    pub last_edge: Option<i64>,
    /// Template file replacing the built-in Mermaid template.
    #[arg(long)]
    pub template: Option<PathBuf>,
    #[arg(long)]
    pub unbalanced: Option<UnbalancedPolicy>,
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct GraphArgs {
    #[arg(value_name = "PROFILE", help = PROFILE_HELP)]
    pub profile: PathBuf,
    #[arg(long)]
    pub unbalanced: Option<UnbalancedPolicy>,
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderOutput {
    pub diagram: String,
    pub nodes: usize,
    pub edges: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out: Option<String>,
}

impl RenderArgs {
    /// Layer the flags over `base`. Unset switches keep the configured value.
    pub fn options(&self, base: &RenderOptions) -> CallscopeResult<RenderOptions> {
        let template = match &self.template {
            Some(path) => Some(std::fs::read_to_string(path)?),
            None => base.template.clone(),
        };
        Ok(RenderOptions {
            direction: self.direction.unwrap_or(base.direction),
            show_time: switch(self.show_time, self.no_show_time, base.show_time),
            time_precision: self.time_precision.unwrap_or(base.time_precision),
            group_by_file: switch(self.group_by_file, self.no_group_by_file, base.group_by_file),
            use_elk: switch(self.elk, self.no_elk, base.use_elk),
            first_edge_index: self.first_edge.unwrap_or(base.first_edge_index),
            last_edge_index: self.last_edge.unwrap_or(base.last_edge_index),
            mermaid_options: base.mermaid_options.clone(),
            template,
        })
    }
}

fn switch(on: bool, off: bool, configured: bool) -> bool {
    match (on, off) {
        (true, _) => true,
        (_, true) => false,
        _ => configured,
    }
}

pub fn read_profile(path: &Path) -> CallscopeResult<String> {
    if path.as_os_str() == "-" {
        return Ok(std::io::read_to_string(std::io::stdin())?);
    }
    Ok(std::fs::read_to_string(path)?)
}

fn load_model(path: &Path, policy: UnbalancedPolicy) -> CallscopeResult<CallgraphModel> {
    let doc = parse_profile(&read_profile(path)?)?;
    if doc.is_empty() {
        tracing::warn!("{} has no profiles; the graph is empty", path.display());
    }
    CallgraphModel::from_document(&doc, policy)
}

pub fn render_command(config: &Config, args: &RenderArgs) -> CallscopeResult<RenderOutput> {
    let options = args.options(&config.render)?;
    let renderer = DiagramRenderer::new(options)?;
    let model = load_model(&args.profile, args.unbalanced.unwrap_or(config.compile.unbalanced))?;
    let diagram = renderer.render(&model)?;

    if let Some(out) = &args.out {
        write_text(out, &diagram)?;
    }
    Ok(RenderOutput {
        diagram,
        nodes: model.nodes.len(),
        edges: model.edges.len(),
        out: args.out.as_ref().map(|p| p.to_string_lossy().to_string()),
    })
}

pub fn graph_command(config: &Config, args: &GraphArgs) -> CallscopeResult<serde_json::Value> {
    let model = load_model(&args.profile, args.unbalanced.unwrap_or(config.compile.unbalanced))?;
    if let Some(out) = &args.out {
        write_json(out, &model)?;
        return Ok(serde_json::json!({"ok": true, "out": out.to_string_lossy().to_string()}));
    }
    Ok(serde_json::to_value(model)?)
}
