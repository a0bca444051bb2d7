//! Diagram template renderer: callgraph model to Mermaid flowchart text.

use minijinja::{Environment, UndefinedBehavior};
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

use crate::{
    CallgraphModel, CallscopeError, CallscopeResult, EdgeView, EdgeWindow, EscapeMode, Group,
    Node, escape_label, plan_edges,
};

pub const DEFAULT_TEMPLATE: &str = r#"%%{init: {"flowchart": {{ mermaid_options | tojson }}} }%%
flowchart {{ direction }}
{%- for node in nodes %}
    {{ node.id }}([{{ escape_label(node.name) }}])
{%- endfor %}
{%- if group_by_file %}
{%- for group in groups %}
    subgraph {{ group.id }} [{{ escape_label(group.file) }}]
{%- for node_id in group.nodes %}
        {{ node_id }}
{%- endfor %}
    end
{%- endfor %}
{%- endif %}
{%- for edge in edges %}
    {{ edge.source }} {{ edge.connector }}
{%- if show_time %} {{ edge.id }}>{{ edge.time_label }}] {{ edge.connector }}{% endif %} {{ edge.target }}
{%- endfor %}
{%- if first_links %}
    linkStyle {{ first_links | join(",") }} {{ first_edge_style }}
{%- endif %}
{%- if last_links %}
    linkStyle {{ last_links | join(",") }} {{ last_edge_style }}
{%- endif %}
"#;

/// Names the label escaper is registered under, as function and filter.
pub const ESCAPE_HELPERS: [&str; 2] = ["escape_label", "escape_mmd"];

pub const FIRST_EDGE_STYLE: &str = "stroke:#2f9e44,stroke-width:3px";
pub const LAST_EDGE_STYLE: &str = "stroke:#e03131,stroke-width:3px";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "TB")]
    TopToBottom,
    #[serde(rename = "BT")]
    BottomToTop,
    #[serde(rename = "RL")]
    RightToLeft,
    #[serde(rename = "LR")]
    LeftToRight,
}

impl clap::ValueEnum for Direction {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::TopToBottom, Self::BottomToTop, Self::RightToLeft, Self::LeftToRight]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::TopToBottom => clap::builder::PossibleValue::new("TB"),
            Self::BottomToTop => clap::builder::PossibleValue::new("BT"),
            Self::RightToLeft => clap::builder::PossibleValue::new("RL"),
            Self::LeftToRight => clap::builder::PossibleValue::new("LR"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub direction: Direction,
    pub show_time: bool,
    pub time_precision: usize,
    pub group_by_file: bool,
    pub use_elk: bool,
    /// 1-based, `-1` for unbounded.
    pub first_edge_index: i64,
    /// 1-based, `-1` for unbounded.
    pub last_edge_index: i64,
    pub mermaid_options: BTreeMap<String, serde_json::Value>,
    /// Template source; the built-in template when unset.
    pub template: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            direction: Direction::default(),
            show_time: false,
            time_precision: 3,
            group_by_file: false,
            use_elk: false,
            first_edge_index: -1,
            last_edge_index: -1,
            mermaid_options: BTreeMap::new(),
            template: None,
        }
    }
}

impl RenderOptions {
    pub fn window(&self) -> CallscopeResult<EdgeWindow> {
        EdgeWindow::from_indices(self.first_edge_index, self.last_edge_index)
    }

    /// User options, with `defaultRenderer = "elk"` layered on when requested.
    pub fn merged_mermaid_options(&self) -> BTreeMap<String, serde_json::Value> {
        let mut options = self.mermaid_options.clone();
        if self.use_elk {
            options.insert("defaultRenderer".to_string(), serde_json::json!("elk"));
        }
        options
    }

    pub fn template_source(&self) -> &str {
        self.template.as_deref().unwrap_or(DEFAULT_TEMPLATE)
    }
}

fn escape_mode(mermaid_options: &BTreeMap<String, serde_json::Value>) -> EscapeMode {
    match mermaid_options.get("defaultRenderer").and_then(|v| v.as_str()) {
        Some("elk") => EscapeMode::Elk,
        _ => EscapeMode::Mermaid,
    }
}

#[derive(Debug, Serialize)]
struct RenderContext<'a> {
    nodes: &'a [Node],
    edges: Vec<EdgeView<'a>>,
    groups: &'a [Group],
    direction: Direction,
    show_time: bool,
    time_precision: usize,
    group_by_file: bool,
    first_edge_index: i64,
    last_edge_index: i64,
    mermaid_options: BTreeMap<String, serde_json::Value>,
    first_links: Vec<usize>,
    last_links: Vec<usize>,
    first_edge_style: &'static str,
    last_edge_style: &'static str,
}

/// Renders callgraph models with one fixed set of options.
#[derive(Debug, Clone)]
pub struct DiagramRenderer {
    options: RenderOptions,
    window: EdgeWindow,
}

impl DiagramRenderer {
    pub fn new(options: RenderOptions) -> CallscopeResult<Self> {
        let window = options.window()?;
        Ok(Self { options, window })
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn render(&self, model: &CallgraphModel) -> CallscopeResult<String> {
        self.render_with(model, self.options.template_source())
    }

    pub fn render_with(&self, model: &CallgraphModel, template_source: &str) -> CallscopeResult<String> {
        let options = &self.options;
        let mermaid_options = options.merged_mermaid_options();
        let mode = escape_mode(&mermaid_options);
        let plan = plan_edges(&model.edges, self.window, options.show_time, options.time_precision);

        let context = RenderContext {
            nodes: &model.nodes,
            edges: plan.edges,
            groups: &model.groups,
            direction: options.direction,
            show_time: options.show_time,
            time_precision: options.time_precision,
            group_by_file: options.group_by_file,
            first_edge_index: options.first_edge_index,
            last_edge_index: options.last_edge_index,
            mermaid_options,
            first_links: plan.first_links,
            last_links: plan.last_links,
            first_edge_style: FIRST_EDGE_STYLE,
            last_edge_style: LAST_EDGE_STYLE,
        };

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        for name in ESCAPE_HELPERS {
            env.add_function(name, move |text: String| escape_label(&text, mode));
            env.add_filter(name, move |text: String| escape_label(&text, mode));
        }

        let template = env
            .template_from_str(template_source)
            .map_err(|e| CallscopeError::template(&e, template_source))?;
        let out = template
            .render(&context)
            .map_err(|e| CallscopeError::template(&e, template_source))?;

        tracing::debug!(
            "rendered {} nodes / {} edges into {} bytes",
            model.nodes.len(),
            model.edges.len(),
            out.len()
        );
        Ok(out)
    }
}

pub fn render_diagram(
    model: &CallgraphModel,
    options: &RenderOptions,
    template_source: &str,
) -> CallscopeResult<String> {
    DiagramRenderer::new(options.clone())?.render_with(model, template_source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CallEdge, Frame, SAMPLE_PROFILE_JSON, UnbalancedPolicy, compile, parse_profile};

    fn sample_model() -> CallgraphModel {
        let doc = parse_profile(SAMPLE_PROFILE_JSON).expect("sample");
        CallgraphModel::from_document(&doc, UnbalancedPolicy::Strict).expect("compile")
    }

    fn fan_out_model(n: usize) -> CallgraphModel {
        let frames: Vec<Frame> = (0..=n).map(|i| Frame::new(format!("f{i}"))).collect();
        let mut model = compile(&frames, &[], UnbalancedPolicy::Strict).expect("compile");
        model.edges = (0..n)
            .map(|i| CallEdge {
                id: format!("e-{i}"),
                source: "n-0".to_string(),
                target: format!("n-{}", i + 1),
                source_frame: 0,
                target_frame: i + 1,
                time: 1.0,
            })
            .collect();
        model
    }

    #[test]
    fn default_template_renders_sample() {
        let out = render_diagram(&sample_model(), &RenderOptions::default(), DEFAULT_TEMPLATE)
            .expect("render");
        let lines: Vec<&str> = out.lines().map(str::trim).collect();
        assert_eq!(lines[0], r#"%%{init: {"flowchart": {}} }%%"#);
        assert_eq!(lines[1], "flowchart TB");
        assert_eq!(&lines[2..6], &["n-0([a])", "n-1([b])", "n-2([c])", "n-3([d])"]);
        assert_eq!(&lines[6..], &["n-0 --> n-1", "n-1 --> n-2", "n-1 --> n-3", "n-1 --> n-2"]);
    }

    #[test]
    fn show_time_adds_labelled_segments() {
        let options = RenderOptions {
            show_time: true,
            time_precision: 1,
            ..RenderOptions::default()
        };
        let out = render_diagram(&sample_model(), &options, DEFAULT_TEMPLATE).expect("render");
        assert!(out.contains("n-0 --> e-0>14.0] --> n-1"), "{out}");
        assert!(out.contains("n-1 --> e-2>4.0] --> n-3"), "{out}");
    }

    #[test]
    fn rendering_is_deterministic() {
        let options = RenderOptions {
            show_time: true,
            group_by_file: true,
            use_elk: true,
            mermaid_options: BTreeMap::from([
                ("curve".to_string(), serde_json::json!("basis")),
                ("nodeSpacing".to_string(), serde_json::json!(30)),
            ]),
            ..RenderOptions::default()
        };
        let model = sample_model();
        let a = render_diagram(&model, &options, DEFAULT_TEMPLATE).expect("first");
        let b = render_diagram(&model, &options, DEFAULT_TEMPLATE).expect("second");
        assert_eq!(a, b);
    }

    #[test]
    fn direction_is_emitted() {
        let options = RenderOptions {
            direction: Direction::LeftToRight,
            ..RenderOptions::default()
        };
        let out = render_diagram(&sample_model(), &options, DEFAULT_TEMPLATE).expect("render");
        assert!(out.contains("flowchart LR"));
    }

    #[test]
    fn elk_merges_renderer_and_switches_escaping() {
        let frames = vec![Frame::new("<module>"), Frame::new("run[0]")];
        let model = compile(&frames, &[], UnbalancedPolicy::Strict).expect("compile");

        let plain = render_diagram(&model, &RenderOptions::default(), DEFAULT_TEMPLATE).expect("plain");
        assert!(plain.contains("n-0([#8249;module#8250;])"), "{plain}");
        assert!(plain.contains("n-1([run#91;0#93;])"), "{plain}");

        let options = RenderOptions {
            use_elk: true,
            ..RenderOptions::default()
        };
        let elk = render_diagram(&model, &options, DEFAULT_TEMPLATE).expect("elk");
        assert!(elk.contains(r#""defaultRenderer":"elk""#), "{elk}");
        assert!(elk.contains("n-0([&#8249;module&#8250;])"), "{elk}");
    }

    #[test]
    fn elk_requested_through_mermaid_options_also_switches_escaping() {
        let frames = vec![Frame::new("a/b")];
        let model = compile(&frames, &[], UnbalancedPolicy::Strict).expect("compile");
        let options = RenderOptions {
            mermaid_options: BTreeMap::from([("defaultRenderer".to_string(), serde_json::json!("elk"))]),
            ..RenderOptions::default()
        };
        let out = render_diagram(&model, &options, DEFAULT_TEMPLATE).expect("render");
        assert!(out.contains("n-0([a&#47;b])"), "{out}");
    }

    #[test]
    fn groups_render_before_edges_only_when_enabled() {
        let frames = vec![
            Frame::new("main").with_file("x.py"),
            Frame::new("helper").with_file("x.py"),
            Frame::new("builtin"),
        ];
        let events = vec![
            crate::Event::open(0, 0.0),
            crate::Event::open(1, 1.0),
            crate::Event::close(1, 2.0),
            crate::Event::close(0, 3.0),
        ];
        let model = compile(&frames, &events, UnbalancedPolicy::Strict).expect("compile");

        let off = render_diagram(&model, &RenderOptions::default(), DEFAULT_TEMPLATE).expect("off");
        assert!(!off.contains("subgraph"));

        let options = RenderOptions {
            group_by_file: true,
            ..RenderOptions::default()
        };
        let on = render_diagram(&model, &options, DEFAULT_TEMPLATE).expect("on");
        let lines: Vec<&str> = on.lines().map(str::trim).collect();
        let start = lines.iter().position(|l| *l == "subgraph g-0 [x.py]").expect("subgraph");
        assert_eq!(&lines[start..start + 4], &["subgraph g-0 [x.py]", "n-0", "n-1", "end"]);
        let edge = lines.iter().position(|l| *l == "n-0 --> n-1").expect("edge");
        assert!(start < edge);
    }

    #[test]
    fn edge_window_hides_and_marks_edges() {
        let options = RenderOptions {
            first_edge_index: 2,
            last_edge_index: 4,
            ..RenderOptions::default()
        };
        let out = render_diagram(&fan_out_model(5), &options, DEFAULT_TEMPLATE).expect("render");
        let lines: Vec<&str> = out.lines().map(str::trim).collect();
        assert!(lines.contains(&"n-0 ~~~ n-1"));
        assert!(lines.contains(&"n-0 --> n-2"));
        assert!(lines.contains(&"n-0 --> n-3"));
        assert!(lines.contains(&"n-0 --> n-4"));
        assert!(lines.contains(&"n-0 ~~~ n-5"));
        assert!(lines.contains(&format!("linkStyle 1 {FIRST_EDGE_STYLE}").as_str()));
        assert!(lines.contains(&format!("linkStyle 3 {LAST_EDGE_STYLE}").as_str()));
    }

    #[test]
    fn edge_window_with_time_addresses_both_segments() {
        let options = RenderOptions {
            show_time: true,
            first_edge_index: 1,
            last_edge_index: 2,
            ..RenderOptions::default()
        };
        let out = render_diagram(&fan_out_model(3), &options, DEFAULT_TEMPLATE).expect("render");
        assert!(out.contains(&format!("linkStyle 0,1 {FIRST_EDGE_STYLE}")), "{out}");
        assert!(out.contains(&format!("linkStyle 2,3 {LAST_EDGE_STYLE}")), "{out}");
        assert!(out.contains("n-0 ~~~ e-2>1.000] ~~~ n-3"), "{out}");
    }

    #[test]
    fn negative_window_index_is_rejected_before_rendering() {
        let options = RenderOptions {
            first_edge_index: -5,
            ..RenderOptions::default()
        };
        let err = render_diagram(&sample_model(), &options, DEFAULT_TEMPLATE).expect_err("window");
        assert!(matches!(err, CallscopeError::InvalidArgument(_)));
    }

    #[test]
    fn custom_templates_can_use_escape_filter() {
        let template = "{% for n in nodes %}{{ n.name | escape_label }};{% endfor %}";
        let frames = vec![Frame::new("f(x)"), Frame::new("g")];
        let model = compile(&frames, &[], UnbalancedPolicy::Strict).expect("compile");
        let out = render_diagram(&model, &RenderOptions::default(), template).expect("render");
        assert_eq!(out, "f#40;x#41;;g;");
    }

    #[test]
    fn escape_mmd_is_an_alias() {
        let template = "{% for n in nodes %}{{ escape_mmd(n.name) }}|{{ n.name | escape_mmd }};{% endfor %}";
        let frames = vec![Frame::new("a[0]")];
        let model = compile(&frames, &[], UnbalancedPolicy::Strict).expect("compile");
        let out = render_diagram(&model, &RenderOptions::default(), template).expect("render");
        assert_eq!(out, "a#91;0#93;|a#91;0#93;;");
    }

    #[test]
    fn inverted_window_renders_every_edge_hidden() {
        let options = RenderOptions {
            first_edge_index: 3,
            last_edge_index: 2,
            ..RenderOptions::default()
        };
        let out = render_diagram(&sample_model(), &options, DEFAULT_TEMPLATE).expect("render");
        assert!(!out.contains("-->"), "{out}");
        assert_eq!(out.matches("~~~").count(), 4);
    }

    #[test]
    fn undefined_variable_reports_the_fragment() {
        let template = "flowchart {{ direction }}\n{{ no_such_thing }}\n";
        let err = render_diagram(&sample_model(), &RenderOptions::default(), template)
            .expect_err("undefined");
        match err {
            CallscopeError::Template { fragment, .. } => assert_eq!(fragment, "{{ no_such_thing }}"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unknown_filter_is_a_template_error() {
        let template = "{{ direction | shout }}";
        let err = render_diagram(&sample_model(), &RenderOptions::default(), template)
            .expect_err("filter");
        assert!(matches!(err, CallscopeError::Template { .. }), "{err}");
    }

    #[test]
    fn empty_model_renders_header_only() {
        let out = render_diagram(&CallgraphModel::default(), &RenderOptions::default(), DEFAULT_TEMPLATE)
            .expect("render");
        assert_eq!(out.lines().count(), 2);
    }
}
