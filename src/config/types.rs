//! Configuration types.

use crate::types::DEFAULT_REQUIREMENTS_FILE;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub behavior: BehaviorConfig,

    #[serde(default)]
    pub files: FilesConfig,
}

impl Config {
    /// Load a single configuration file without tier merging.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        // Empty or comment-only files parse as null
        let config: Option<Config> = serde_yaml::from_str(&content)?;
        Ok(config.unwrap_or_default())
    }
}

/// Resource limits enforced by the parser and mutation engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LimitsConfig {
    /// Maximum number of tasks in one document (default: 10000).
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,

    /// Maximum nesting depth (default: 10).
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum length of a single detail line in bytes (default: 1000).
    #[serde(default = "default_max_detail_length")]
    pub max_detail_length: usize,

    /// Maximum title length in bytes (default: 500).
    #[serde(default = "default_max_title_length")]
    pub max_title_length: usize,

    /// Maximum document size in bytes (default: 10 MiB).
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
}

/// Limits as passed to engine operations.
pub type Limits = LimitsConfig;

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_tasks: default_max_tasks(),
            max_depth: default_max_depth(),
            max_detail_length: default_max_detail_length(),
            max_title_length: default_max_title_length(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_max_tasks() -> usize {
    10_000
}

fn default_max_depth() -> usize {
    10
}

fn default_max_detail_length() -> usize {
    1_000
}

fn default_max_title_length() -> usize {
    500
}

fn default_max_file_size() -> usize {
    10 * 1024 * 1024
}

/// Mutation policies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BehaviorConfig {
    /// Completing the last open task of a subtree also completes its
    /// ancestors (default: true).
    #[serde(default = "default_true")]
    pub auto_complete_parents: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            auto_complete_parents: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// File naming defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilesConfig {
    /// Link target for requirement references in new documents.
    #[serde(default = "default_requirements_file")]
    pub requirements_file: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            requirements_file: default_requirements_file(),
        }
    }
}

fn default_requirements_file() -> String {
    DEFAULT_REQUIREMENTS_FILE.to_string()
}
