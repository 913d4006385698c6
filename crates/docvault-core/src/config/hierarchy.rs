//! Folder tree limits.

use serde::{Deserialize, Serialize};

/// Limits applied when nodes are created, renamed, or moved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Maximum length of a folder or document name, in characters.
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
    /// Maximum folder depth below a department (a department's direct
    /// children are at depth 1).
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_name_length: default_max_name_length(),
            max_depth: default_max_depth(),
        }
    }
}

fn default_max_name_length() -> usize {
    255
}

fn default_max_depth() -> usize {
    64
}
