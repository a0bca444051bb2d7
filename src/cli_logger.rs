use anyhow::Result;
use callscope::{RenderOutput, SchemaDoc};
use serde::Serialize;
use serde_json::Value;

pub struct CliLogger {
    json: bool,
    no_color: bool,
}

impl CliLogger {
    pub fn new(json: bool, no_color: bool) -> Self {
        Self { json, no_color }
    }

    pub fn print_serialized<T: Serialize>(&self, value: &T) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(value)?);
            return Ok(());
        }

        let rendered = render_value(&serde_json::to_value(value)?, 0);
        println!("{rendered}");
        Ok(())
    }

    /// Raw text (a diagram, a rewritten profile) goes to stdout untouched.
    pub fn print_text(&self, text: &str) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(&serde_json::json!({ "text": text }))?);
            return Ok(());
        }
        println!("{}", text.trim_end());
        Ok(())
    }

    pub fn print_render(&self, output: &RenderOutput) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(output)?);
            return Ok(());
        }
        match &output.out {
            Some(path) => eprintln!(
                "{} {} nodes, {} edges -> {path}",
                self.style("rendered", "32;1"),
                output.nodes,
                output.edges
            ),
            None => println!("{}", output.diagram.trim_end()),
        }
        Ok(())
    }

    pub fn print_schema(&self, doc: &SchemaDoc) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(doc)?);
            return Ok(());
        }

        let mut out = String::new();
        out.push_str(&format!("{}\n\n", self.style(&doc.schema_version, "36;1")));
        for (title, vars) in [
            ("diagram context", &doc.diagram_context),
            ("edge fields", &doc.edge_fields),
            ("callables", &doc.callables),
            ("filename context", &doc.filename_context),
        ] {
            out.push_str(&format!("{}\n", self.style(title, "37;1")));
            for var in vars {
                out.push_str(&format!(
                    "  {} {} {}\n",
                    var.name,
                    self.style(var.kind, "90"),
                    var.description
                ));
            }
            out.push('\n');
        }
        println!("{}", out.trim_end());
        Ok(())
    }

    pub fn print_error(&self, msg: &str) {
        if self.json {
            let out = serde_json::json!({
                "status": "error",
                "code": "error",
                "message": msg,
            });
            println!("{out}");
            return;
        }
        eprintln!("{} {msg}", self.style("error", "31;1"));
    }

    fn style(&self, text: &str, ansi: &str) -> String {
        if self.no_color {
            return text.to_string();
        }
        format!("\x1b[{ansi}m{text}\x1b[0m")
    }
}

fn render_value(value: &Value, indent: usize) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(v) => v.to_string(),
        Value::Number(v) => v.to_string(),
        Value::String(v) => v.clone(),
        Value::Array(items) => render_array(items, indent),
        Value::Object(map) => render_object(map, indent),
    }
}

fn render_array(items: &[Value], indent: usize) -> String {
    if items.is_empty() {
        return "[]".to_string();
    }

    let pad = " ".repeat(indent);
    let mut out = String::new();
    for item in items {
        match item {
            Value::Object(_) | Value::Array(_) => {
                out.push_str(&format!("{pad}-\n{}\n", render_value(item, indent + 2)));
            }
            _ => out.push_str(&format!("{pad}- {}\n", render_value(item, indent + 2))),
        }
    }
    out.trim_end().to_string()
}

fn render_object(map: &serde_json::Map<String, Value>, indent: usize) -> String {
    if map.is_empty() {
        return "{}".to_string();
    }

    let pad = " ".repeat(indent);
    let mut out = String::new();
    for (key, value) in map {
        match value {
            Value::Object(_) | Value::Array(_) => {
                out.push_str(&format!("{pad}{key}:\n{}\n", render_value(value, indent + 2)));
            }
            _ => out.push_str(&format!("{pad}{key}: {}\n", render_value(value, indent + 2))),
        }
    }
    out.trim_end().to_string()
}
