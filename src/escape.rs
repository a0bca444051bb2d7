//! Mermaid label escaping.

/// Characters that are syntax in a Mermaid flowchart, with the code point
/// each is rewritten to.
pub const MERMAID_ESCAPES: [(char, u32); 10] = [
    ('[', 91),
    (']', 93),
    ('<', 8249),
    ('>', 8250),
    ('(', 40),
    (')', 41),
    ('{', 123),
    ('}', 125),
    ('/', 47),
    ('\\', 92),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeMode {
    /// Default dagre renderer: `#91;`
    Mermaid,
    /// elk renderer: `&#91;`
    Elk,
}

impl EscapeMode {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Mermaid => "#",
            Self::Elk => "&#",
        }
    }
}

pub fn escape_label(text: &str, mode: EscapeMode) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match MERMAID_ESCAPES.iter().find(|(ch, _)| *ch == c) {
            Some((_, code)) => {
                out.push_str(mode.prefix());
                out.push_str(&code.to_string());
                out.push(';');
            }
            None => out.push(c),
        }
    }
    out.truncate(out.trim_end().len());
    out
}
