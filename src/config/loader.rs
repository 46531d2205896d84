//! Configuration loader with tier-based merging.
//!
//! Loads configuration from multiple tiers and merges them field-by-field.

use super::merge::deep_merge_all;
use super::types::Config;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CONFIG_FILE: &str = "config.yaml";

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Built-in defaults (lowest priority)
    Defaults = 0,
    /// Project-level config (./.tasks-md/)
    Project = 1,
    /// User-level config (~/.config/tasks-md/)
    User = 2,
    /// Environment variables (highest priority)
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Directories searched for each configuration tier.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project-level config directory
    pub project_dir: Option<PathBuf>,
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration paths from the working directory and platform dirs.
    pub fn discover() -> Self {
        Self {
            project_dir: Some(PathBuf::from(".tasks-md")),
            user_dir: dirs::config_dir().map(|d| d.join("tasks-md")),
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }

    fn config_file(&self, tier: ConfigTier) -> Option<PathBuf> {
        let dir = match tier {
            ConfigTier::Project => self.project_dir.as_ref(),
            ConfigTier::User => self.user_dir.as_ref(),
            ConfigTier::Defaults | ConfigTier::Environment => None,
        }?;
        Some(dir.join(CONFIG_FILE))
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Paths for each tier
    pub paths: ConfigPaths,
    config: Config,
    /// Files that contributed to the merged configuration, lowest tier first
    sources: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration from all tiers with proper merging.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load configuration with explicit paths.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        // An explicit file replaces every file tier
        if let Ok(explicit_path) = std::env::var("TASKS_MD_CONFIG_PATH") {
            let path = PathBuf::from(&explicit_path);
            let mut config = Config::load(&path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            Self::apply_env_overrides(&mut config)?;
            return Ok(Self {
                paths,
                config,
                sources: vec![path],
            });
        }

        let mut layers: Vec<Value> = vec![serde_json::to_value(Config::default())?];
        let mut sources = Vec::new();

        for tier in [ConfigTier::Project, ConfigTier::User] {
            let Some(file) = paths.config_file(tier) else {
                continue;
            };
            if let Some(layer) = Self::read_layer(&file, tier) {
                layers.push(layer);
                sources.push(file);
            }
        }

        let merged = deep_merge_all(layers);
        let mut config: Config = serde_json::from_value(merged)?;
        Self::apply_env_overrides(&mut config)?;

        debug!(sources = sources.len(), "configuration loaded");
        Ok(Self {
            paths,
            config,
            sources,
        })
    }

    /// Read one tier's YAML as a JSON value. Unreadable or invalid files are
    /// skipped with a warning.
    fn read_layer(file: &Path, tier: ConfigTier) -> Option<Value> {
        if !file.exists() {
            return None;
        }
        let content = match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                warn!(%tier, path = %file.display(), error = %e, "cannot read config file");
                return None;
            }
        };
        match serde_yaml::from_str::<Value>(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(%tier, path = %file.display(), error = %e, "ignoring invalid config file");
                None
            }
        }
    }

    /// Apply environment variable overrides to config.
    fn apply_env_overrides(config: &mut Config) -> Result<()> {
        if let Ok(max_tasks) = std::env::var("TASKS_MD_MAX_TASKS") {
            config.limits.max_tasks = max_tasks
                .parse()
                .with_context(|| format!("TASKS_MD_MAX_TASKS: invalid value {max_tasks:?}"))?;
        }

        if let Ok(max_depth) = std::env::var("TASKS_MD_MAX_DEPTH") {
            config.limits.max_depth = max_depth
                .parse()
                .with_context(|| format!("TASKS_MD_MAX_DEPTH: invalid value {max_depth:?}"))?;
        }

        if let Ok(auto) = std::env::var("TASKS_MD_AUTO_COMPLETE_PARENTS") {
            config.behavior.auto_complete_parents = parse_bool(&auto).with_context(|| {
                format!("TASKS_MD_AUTO_COMPLETE_PARENTS: invalid value {auto:?}")
            })?;
        }

        Ok(())
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Config files that were merged, lowest tier first.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_paths_discover() {
        let paths = ConfigPaths::discover();
        assert_eq!(paths.project_dir, Some(PathBuf::from(".tasks-md")));
        // user_dir depends on the platform
    }

    #[test]
    fn test_load_defaults_only() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::with_dirs(
            Some(temp.path().join("project")),
            Some(temp.path().join("user")),
        );

        let loader = ConfigLoader::load_with_paths(paths).unwrap();
        let config = loader.config();

        assert_eq!(config.limits.max_tasks, 10_000);
        assert_eq!(config.limits.max_depth, 10);
        assert!(config.behavior.auto_complete_parents);
        assert!(loader.sources().is_empty());
    }

    #[test]
    fn test_project_config_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join(".tasks-md");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(
            project_dir.join("config.yaml"),
            "limits:\n  max_depth: 3\nbehavior:\n  auto_complete_parents: false\n",
        )
        .unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), Some(temp.path().join("user")));
        let loader = ConfigLoader::load_with_paths(paths).unwrap();
        let config = loader.config();

        assert_eq!(config.limits.max_depth, 3);
        assert_eq!(config.limits.max_tasks, 10_000);
        assert!(!config.behavior.auto_complete_parents);
        assert_eq!(loader.sources().len(), 1);
    }

    #[test]
    fn test_user_config_overrides_project() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("project");
        let user_dir = temp.path().join("user");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::create_dir_all(&user_dir).unwrap();

        std::fs::write(
            project_dir.join("config.yaml"),
            "limits:\n  max_depth: 3\n  max_tasks: 50\n",
        )
        .unwrap();
        std::fs::write(user_dir.join("config.yaml"), "limits:\n  max_depth: 6\n").unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), Some(user_dir));
        let config = ConfigLoader::load_with_paths(paths).unwrap().into_config();

        assert_eq!(config.limits.max_depth, 6);
        assert_eq!(config.limits.max_tasks, 50);
    }

    #[test]
    fn test_invalid_tier_is_skipped() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("project");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(project_dir.join("config.yaml"), "limits: [oops\n").unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), None);
        let loader = ConfigLoader::load_with_paths(paths).unwrap();
        assert_eq!(loader.config(), &Config::default());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
