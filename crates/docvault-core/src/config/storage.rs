//! Store backend configuration.

use serde::{Deserialize, Serialize};

/// Which store implementation backs the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// PostgreSQL through the sqlx pool in `database`.
    #[default]
    Postgres,
    /// Process-local store; contents are lost on exit.
    Memory,
}

/// Store selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// The backend to use.
    #[serde(default)]
    pub backend: StoreBackend,
}
