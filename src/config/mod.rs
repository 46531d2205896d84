//! Tiered engine configuration.
//!
//! Configuration is merged field-by-field from three tiers:
//! 1. **Defaults** - built into [`Config::default`]
//! 2. **Project** - `./.tasks-md/config.yaml`
//! 3. **User** - `<config dir>/tasks-md/config.yaml`
//!
//! ## Environment Variables
//! - `TASKS_MD_CONFIG_PATH` - Explicit config file (replaces the file tiers)
//! - `TASKS_MD_MAX_TASKS` - Maximum tasks per document
//! - `TASKS_MD_MAX_DEPTH` - Maximum nesting depth
//! - `TASKS_MD_AUTO_COMPLETE_PARENTS` - Cascade completion to ancestors

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
