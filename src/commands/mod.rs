//! CLI command definitions and dispatch.

pub mod config;
pub mod department;
pub mod migrate;
pub mod tree;
pub mod verify;
pub mod versions;

use clap::{Parser, Subcommand};

use docvault_core::config::AppConfig;
use docvault_core::error::AppError;
use docvault_database::store::open_store;
use docvault_service::Services;

use crate::output::OutputFormat;

/// DocVault: departments, folders, and versioned documents
#[derive(Debug, Parser)]
#[command(name = "docvault", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Configuration inspection
    Config(config::ConfigArgs),
    /// Department management
    Department(department::DepartmentArgs),
    /// Show a department's folder tree
    Tree(tree::TreeArgs),
    /// Show a document's version history
    Versions(versions::VersionsArgs),
    /// Check a department's paths, deleted state, and version chains
    Verify(verify::VerifyArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &config).await,
            Commands::Config(args) => config::execute(args, &self.config, &config, self.format),
            Commands::Department(args) => {
                department::execute(args, &connect(&config).await?, self.format).await
            }
            Commands::Tree(args) => tree::execute(args, &connect(&config).await?, self.format).await,
            Commands::Versions(args) => {
                versions::execute(args, &connect(&config).await?, self.format).await
            }
            Commands::Verify(args) => {
                verify::execute(args, &connect(&config).await?, self.format).await
            }
        }
    }
}

/// Helper: open the configured store and wire the services over it
pub async fn connect(config: &AppConfig) -> Result<Services, AppError> {
    let store = open_store(config).await?;
    Ok(Services::new(store, config))
}
