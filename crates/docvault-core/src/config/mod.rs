//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. Every field carries a default so a partial file is enough.

pub mod database;
pub mod hierarchy;
pub mod logging;
pub mod storage;
pub mod versioning;

use serde::{Deserialize, Serialize};

pub use self::database::DatabaseConfig;
pub use self::hierarchy::HierarchyConfig;
pub use self::logging::LoggingConfig;
pub use self::storage::{StoreBackend, StoreConfig};
pub use self::versioning::VersioningConfig;

use crate::error::AppError;

/// Environment variable selecting the overlay file under `config/`.
pub const ENV_VAR: &str = "DOCVAULT_ENV";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Store backend selection.
    #[serde(default)]
    pub storage: StoreConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Name and depth limits for the folder tree.
    #[serde(default)]
    pub hierarchy: HierarchyConfig,
    /// Version chain behaviour.
    #[serde(default)]
    pub versioning: VersioningConfig,
}

impl AppConfig {
    /// Load configuration from `path`, the `config/{env}` overlay named by
    /// `DOCVAULT_ENV`, and environment variables prefixed with `DOCVAULT__`.
    pub fn load(path: &str) -> Result<Self, AppError> {
        let env = std::env::var(ENV_VAR).unwrap_or_else(|_| "development".to_string());
        Self::load_with_env(path, &env)
    }

    /// Load configuration with an explicit environment overlay name.
    pub fn load_with_env(path: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("DOCVAULT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, AppError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
            .map_err(AppError::from)
    }
}
