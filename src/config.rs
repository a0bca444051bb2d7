//! `callscope.toml` config loading.

use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};

use crate::{
    ArchiveSettings, CallscopeError, CallscopeResult, RedactionEnv, RenderOptions, RewriteRule, RewriteRules,
    UnbalancedPolicy,
};

pub const DEFAULT_CONFIG_FILE: &str = "callscope.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Defaults for every render; CLI flags override them.
    #[serde(default)]
    pub render: RenderOptions,

    #[serde(default)]
    pub compile: CompileSettings,

    #[serde(default)]
    pub archive: ArchiveSettings,

    #[serde(default)]
    pub rewrite: RewriteSettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileSettings {
    pub unbalanced: UnbalancedPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteSettings {
    /// Prepend the environment redaction rules.
    pub default_rules: bool,
    pub install_path: Option<PathBuf>,
    /// Applied after the defaults, in order.
    pub rules: Vec<RewriteRule>,
}

impl Default for RewriteSettings {
    fn default() -> Self {
        Self {
            default_rules: true,
            install_path: None,
            rules: Vec::new(),
        }
    }
}

impl RewriteSettings {
    pub fn build_rules(&self, extra: &[RewriteRule]) -> CallscopeResult<RewriteRules> {
        let mut rules = if self.default_rules {
            RewriteRules::defaults(&RedactionEnv::detect(self.install_path.clone()))?
        } else {
            RewriteRules::new()
        };
        rules.extend(&self.rules)?;
        rules.extend(extra)?;
        Ok(rules)
    }
}

impl Config {
    pub fn load_optional(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => match toml::from_str::<Config>(&s) {
                Ok(cfg) => cfg,
                Err(err) => {
                    tracing::warn!("failed to parse config {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                tracing::warn!("failed to read config {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn load(path: &Path) -> CallscopeResult<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| CallscopeError::Config(format!("cannot read {}: {e}", path.display())))?;
        Ok(toml::from_str(&s)?)
    }

    /// A path the user named must load; otherwise `callscope.toml` in the
    /// working directory is optional.
    pub fn resolve(explicit: Option<&Path>) -> CallscopeResult<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => Ok(Self::load_optional(Path::new(DEFAULT_CONFIG_FILE))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Direction;
    use uuid::Uuid;

    fn temp_file(name: &str, body: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("callscope-config-{name}-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, body).expect("write");
        path
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join(format!("missing-{}.toml", Uuid::new_v4()));
        let cfg = Config::load_optional(&path);
        assert_eq!(cfg, Config::default());
        assert!(cfg.rewrite.default_rules);
        assert_eq!(cfg.render.time_precision, 3);
    }

    #[test]
    fn unparseable_file_falls_back_to_defaults() {
        let path = temp_file("broken", "render = [");
        assert_eq!(Config::load_optional(&path), Config::default());
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn explicit_config_must_exist_and_parse() {
        let missing = std::env::temp_dir().join(format!("missing-{}.toml", Uuid::new_v4()));
        let err = Config::resolve(Some(missing.as_path())).expect_err("missing");
        assert!(matches!(err, CallscopeError::Config(_)), "{err}");

        let broken = temp_file("explicit-broken", "render = [");
        assert!(matches!(Config::resolve(Some(broken.as_path())), Err(CallscopeError::Toml(_))));

        let good = temp_file("explicit-good", "[render]\ntime_precision = 1\n");
        assert_eq!(Config::resolve(Some(good.as_path())).expect("load").render.time_precision, 1);
    }

    #[test]
    fn full_file_round_trips_sections() {
        let path = temp_file(
            "full",
            r#"
[render]
direction = "LR"
show_time = true
first_edge_index = 2
[render.mermaid_options]
curve = "basis"

[compile]
unbalanced = "skip_dangling"

[archive]
folder = "profiles"

[rewrite]
default_rules = false
[[rewrite.rules]]
pattern = "secret"
replacement = "***"
"#,
        );
        let cfg = Config::load_optional(&path);
        assert_eq!(cfg.render.direction, Direction::LeftToRight);
        assert!(cfg.render.show_time);
        assert_eq!(cfg.render.first_edge_index, 2);
        assert_eq!(cfg.render.last_edge_index, -1);
        assert_eq!(cfg.render.mermaid_options["curve"], serde_json::json!("basis"));
        assert_eq!(cfg.compile.unbalanced, UnbalancedPolicy::SkipDangling);
        assert_eq!(cfg.archive.folder, Some(PathBuf::from("profiles")));
        assert_eq!(cfg.archive.filename_template, crate::DEFAULT_FILENAME_TEMPLATE);

        let rules = cfg.rewrite.build_rules(&[RewriteRule::new("x", "y")]).expect("rules");
        assert_eq!(rules.patterns().collect::<Vec<_>>(), vec!["secret", "x"]);
    }

    #[test]
    fn default_rules_come_first() {
        let settings = RewriteSettings {
            rules: vec![RewriteRule::new("tail", "")],
            ..RewriteSettings::default()
        };
        let rules = settings.build_rules(&[]).expect("rules");
        assert_eq!(rules.patterns().last(), Some("tail"));
        assert!(rules.len() >= 3);
    }
}
