use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::ProjectType;

pub const CONFIG_FILE_NAMES: &[&str] = &["monotui.yml", "monotui.yaml", ".monotui.yml"];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Written by `monotui init`
pub const DEFAULT_CONFIG_YAML: &str = r#"# monotui configuration
discovery:
  # how deep to scan below the workspace root
  max_depth: 4
  ignore: [node_modules, .git, dist, build]
  # path segments that decide a project's type
  folders:
    app: [apps]
    package: [packages]
    infra: [infra]
    contract: [contracts]
  # project types shown, in this order
  order: [workspace, app, contract, infra, package]
  scripts:
    exclude: []
  env:
    files: [.env.local, .env.development, .env, .env.example]
    port_keys: [PORT, APP_PORT, VITE_PORT, NEXT_PUBLIC_PORT]
  makefile:
    show_default: false

execution:
  # open attached commands in a new tmux window when running inside tmux
  use_tmux: true

runtime:
  poll_interval_ms: 5000
  probe_timeout_ms: 4000

logging:
  level: info
  file: true
  log_dir: ~/.monotui/logs
  truncate_on_start: true
"#;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MonotuiConfig {
    pub discovery: DiscoveryConfig,
    pub execution: ExecutionConfig,
    pub runtime: RuntimeConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub max_depth: usize,
    /// Directory names never descended into
    pub ignore: Vec<String>,
    pub folders: FolderConfig,
    /// Project type labels, in display order
    pub order: Vec<String>,
    pub scripts: ScriptsConfig,
    pub env: EnvConfig,
    pub makefile: MakefileConfig,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_depth: 4,
            ignore: strings(&["node_modules", ".git", "dist", "build"]),
            folders: FolderConfig::default(),
            order: strings(&["workspace", "app", "contract", "infra", "package"]),
            scripts: ScriptsConfig::default(),
            env: EnvConfig::default(),
            makefile: MakefileConfig::default(),
        }
    }
}

impl DiscoveryConfig {
    /// Parsed `order`; unknown labels are rejected by validation
    pub fn type_order(&self) -> Vec<ProjectType> {
        self.order
            .iter()
            .filter_map(|label| ProjectType::from_label(label))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FolderConfig {
    pub app: Vec<String>,
    pub package: Vec<String>,
    pub infra: Vec<String>,
    pub contract: Vec<String>,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            app: strings(&["apps"]),
            package: strings(&["packages"]),
            infra: strings(&["infra"]),
            contract: strings(&["contracts"]),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Script names hidden from every package.json facet
    pub exclude: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Env files read for port guessing, first hit wins
    pub files: Vec<String>,
    pub port_keys: Vec<String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            files: strings(&[".env.local", ".env.development", ".env", ".env.example"]),
            port_keys: strings(&["PORT", "APP_PORT", "VITE_PORT", "NEXT_PUBLIC_PORT"]),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MakefileConfig {
    pub show_default: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub use_tmux: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self { use_tmux: true }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub poll_interval_ms: u64,
    pub probe_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
            probe_timeout_ms: 4000,
        }
    }
}

impl RuntimeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Write logs to `<log_dir>/monotui.log`
    pub file: bool,
    /// `~` expands to the home directory
    pub log_dir: String,
    pub truncate_on_start: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: true,
            log_dir: "~/.monotui/logs".into(),
            truncate_on_start: true,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.into(),
    }
}

impl MonotuiConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a string; missing keys fall back to defaults
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: MonotuiConfig = if content.trim().is_empty() {
            MonotuiConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Looks for a config file in `root` (or `MONOTUI_CONFIG`).
    ///
    /// Returns the defaults and no path when none exists.
    pub fn discover(root: &Path) -> Result<(Option<PathBuf>, Self), ConfigError> {
        if let Ok(env_path) = std::env::var("MONOTUI_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                let config = Self::load(&path)?;
                return Ok((Some(path), config));
            }
        }

        for name in CONFIG_FILE_NAMES {
            let path = root.join(name);
            if path.exists() {
                let config = Self::load(&path)?;
                return Ok((Some(path), config));
            }
        }

        Ok((None, Self::default()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discovery.max_depth < 1 {
            return Err(invalid("discovery.max_depth", "must be at least 1"));
        }

        for label in &self.discovery.order {
            if ProjectType::from_label(label).is_none() {
                return Err(invalid(
                    "discovery.order",
                    format!("unknown project type '{}'", label),
                ));
            }
        }

        if self.runtime.poll_interval_ms < 250 {
            return Err(invalid("runtime.poll_interval_ms", "must be at least 250"));
        }

        if self.runtime.probe_timeout_ms < 100 {
            return Err(invalid("runtime.probe_timeout_ms", "must be at least 100"));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(
                "logging.level",
                format!("expected one of {}", LOG_LEVELS.join(", ")),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonotuiConfig::from_str("").unwrap();
        assert_eq!(config.discovery.max_depth, 4);
        assert_eq!(config.runtime.poll_interval(), Duration::from_millis(5000));
        assert_eq!(config.runtime.probe_timeout(), Duration::from_millis(4000));
        assert!(config.execution.use_tmux);
        assert_eq!(config.logging.level, "info");
        assert_eq!(
            config.discovery.type_order(),
            vec![
                ProjectType::Workspace,
                ProjectType::App,
                ProjectType::Contract,
                ProjectType::Infra,
                ProjectType::Package,
            ]
        );
    }

    #[test]
    fn test_default_yaml_matches_defaults() {
        let config = MonotuiConfig::from_str(DEFAULT_CONFIG_YAML).unwrap();
        assert_eq!(config, MonotuiConfig::default());
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let yaml = r#"
discovery:
  max_depth: 2
  folders:
    app: [apps, services]
runtime:
  poll_interval_ms: 1000
"#;
        let config = MonotuiConfig::from_str(yaml).unwrap();
        assert_eq!(config.discovery.max_depth, 2);
        assert_eq!(config.discovery.folders.app, vec!["apps", "services"]);
        assert_eq!(config.discovery.folders.package, vec!["packages"]);
        assert_eq!(config.discovery.ignore.len(), 4);
        assert_eq!(config.runtime.poll_interval_ms, 1000);
        assert_eq!(config.runtime.probe_timeout_ms, 4000);
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            "discovery:\n  max_depth: 0\n",
            "discovery:\n  order: [app, frontend]\n",
            "runtime:\n  poll_interval_ms: 10\n",
            "runtime:\n  probe_timeout_ms: 5\n",
            "logging:\n  level: verbose\n",
        ];
        for yaml in cases {
            let result = MonotuiConfig::from_str(yaml);
            assert!(
                matches!(result, Err(ConfigError::Invalid { .. })),
                "expected invalid for {yaml:?}"
            );
        }
    }

    #[test]
    fn test_bad_yaml() {
        let result = MonotuiConfig::from_str("discovery: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_discover_in_root() {
        let dir = tempfile::tempdir().unwrap();
        let (path, config) = MonotuiConfig::discover(dir.path()).unwrap();
        assert!(path.is_none());
        assert_eq!(config, MonotuiConfig::default());

        std::fs::write(dir.path().join("monotui.yml"), "execution:\n  use_tmux: false\n").unwrap();
        let (path, config) = MonotuiConfig::discover(dir.path()).unwrap();
        assert_eq!(path, Some(dir.path().join("monotui.yml")));
        assert!(!config.execution.use_tmux);
    }
}
