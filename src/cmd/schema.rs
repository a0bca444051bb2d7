//! Template-context introspection for template authors.

use serde::Serialize;

use crate::{DEFAULT_FILENAME_TEMPLATE, DEFAULT_TEMPLATE, FIRST_EDGE_STYLE, LAST_EDGE_STYLE};

#[derive(Debug, Clone, Serialize)]
pub struct SchemaDoc {
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,
    #[serde(rename = "diagramContext")]
    pub diagram_context: Vec<ContextVariable>,
    #[serde(rename = "edgeFields")]
    pub edge_fields: Vec<ContextVariable>,
    pub callables: Vec<ContextVariable>,
    #[serde(rename = "filenameContext")]
    pub filename_context: Vec<ContextVariable>,
    #[serde(rename = "defaultTemplate")]
    pub default_template: &'static str,
    #[serde(rename = "defaultFilenameTemplate")]
    pub default_filename_template: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextVariable {
    pub name: &'static str,
    pub kind: &'static str,
    pub description: String,
}

fn var(name: &'static str, kind: &'static str, description: impl Into<String>) -> ContextVariable {
    ContextVariable {
        name,
        kind,
        description: description.into(),
    }
}

pub fn schema_doc() -> SchemaDoc {
    SchemaDoc {
        schema_version: "callscope.template_context.v1".to_string(),
        diagram_context: vec![
            var("nodes", "list", "one per frame: id, index, name, file, line and any extra frame keys"),
            var("groups", "list", "one per distinct file in first-seen order: id, file, nodes"),
            var("edges", "list", "call edges in open order, extended with layout fields"),
            var("direction", "string", "TB, BT, RL or LR"),
            var("show_time", "bool", "edges carry a time label segment"),
            var("time_precision", "int", "decimals in time_label"),
            var("group_by_file", "bool", "emit groups as subgraphs"),
            var("first_edge_index", "int", "1-based window start, -1 when unbounded; after last_edge_index hides every edge"),
            var("last_edge_index", "int", "1-based window end, -1 when unbounded"),
            var("mermaid_options", "map", "flowchart options; defaultRenderer is elk when use_elk is set"),
            var("first_links", "list", "link indices of the edge at first_edge_index"),
            var("last_links", "list", "link indices of the edge at last_edge_index"),
            var("first_edge_style", "string", format!("linkStyle for first_links ({FIRST_EDGE_STYLE})")),
            var("last_edge_style", "string", format!("linkStyle for last_links ({LAST_EDGE_STYLE})")),
        ],
        edge_fields: vec![
            var("id", "string", "e-{ordinal}"),
            var("source", "string", "caller node id"),
            var("target", "string", "callee node id"),
            var("source_frame", "int", "caller frame index"),
            var("target_frame", "int", "callee frame index"),
            var("time", "number", "callee close.at minus open.at"),
            var("position", "int", "1-based position in edges"),
            var("visible", "bool", "inside the edge window"),
            var("connector", "string", "--> when visible, ~~~ otherwise"),
            var("is_first", "bool", "sits at first_edge_index"),
            var("is_last", "bool", "sits at last_edge_index"),
            var("links", "list", "global link indices of this edge's segments"),
            var("time_label", "string", "time formatted with time_precision"),
        ],
        callables: vec![
            var(
                "escape_label",
                "function, filter",
                "entity-encode [ ] < > ( ) { } / \\ for Mermaid labels and trim trailing whitespace",
            ),
            var("escape_mmd", "function, filter", "alias of escape_label"),
        ],
        filename_context: vec![
            var("now_timestamp", "number", "unix seconds rounded to two decimals"),
            var("name", "string", "session name"),
        ],
        default_template: DEFAULT_TEMPLATE,
        default_filename_template: DEFAULT_FILENAME_TEMPLATE,
    }
}
