//! Crate-wide error types.

use std::path::PathBuf;

use thiserror::Error;

pub type CallscopeResult<T> = Result<T, CallscopeError>;

#[derive(Debug, Error)]
pub enum CallscopeError {
    #[error("malformed profile: {0}")]
    MalformedProfile(String),

    #[error("unbalanced event stream at event {index}: {reason}")]
    UnbalancedEventStream { index: usize, reason: String },

    #[error("template error: {message} (in `{fragment}`)")]
    Template { message: String, fragment: String },

    #[error("failed to write archive {}: {source}", path.display())]
    ArchiveWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl CallscopeError {
    /// Build a template error, keeping the source line the engine blamed.
    pub fn template(err: &minijinja::Error, source: &str) -> Self {
        let fragment = err
            .line()
            .and_then(|line| source.lines().nth(line.saturating_sub(1)))
            .map(|line| line.trim().to_string())
            .unwrap_or_else(|| source.lines().next().unwrap_or_default().trim().to_string());
        Self::Template {
            message: err.to_string(),
            fragment,
        }
    }
}

impl From<regex::Error> for CallscopeError {
    fn from(value: regex::Error) -> Self {
        Self::InvalidArgument(format!("invalid pattern: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_error_keeps_offending_line() {
        let env = minijinja::Environment::new();
        let source = "ok line\n{{ missing(1) }}\n";
        let err = env
            .render_str(source, minijinja::context! {})
            .expect_err("unknown function must fail");
        match CallscopeError::template(&err, source) {
            CallscopeError::Template { fragment, .. } => {
                assert_eq!(fragment, "{{ missing(1) }}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
