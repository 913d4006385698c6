//! Version chain configuration.

use serde::{Deserialize, Serialize};

/// Settings for appending and restoring document versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersioningConfig {
    /// How many times an append that lost a race is retried before the
    /// conflict is surfaced to the caller.
    #[serde(default = "default_conflict_retries")]
    pub conflict_retries: u32,
    /// Change description for a restore; `{n}` is replaced by the source
    /// version number.
    #[serde(default = "default_restore_template")]
    pub restore_description_template: String,
    /// Change description recorded on version 1.
    #[serde(default = "default_initial_description")]
    pub initial_description: String,
}

impl VersioningConfig {
    /// Render the change description for a restore from version `n`.
    pub fn restore_description(&self, n: i32) -> String {
        self.restore_description_template
            .replace("{n}", &n.to_string())
    }
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            conflict_retries: default_conflict_retries(),
            restore_description_template: default_restore_template(),
            initial_description: default_initial_description(),
        }
    }
}

fn default_conflict_retries() -> u32 {
    1
}

fn default_restore_template() -> String {
    "Restored from version {n}".to_string()
}

fn default_initial_description() -> String {
    "Initial upload".to_string()
}
