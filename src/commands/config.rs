//! Configuration inspection commands.

use clap::{Args, Subcommand};

use docvault_core::config::AppConfig;
use docvault_core::error::AppError;
use docvault_database::connection::mask_password;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
}

/// Execute config commands
pub fn execute(
    args: &ConfigArgs,
    config_path: &str,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let mut shown = config.clone();
            shown.database.url = mask_password(&shown.database.url);
            output::print_item(&shown, format);
        }
        ConfigCommand::Validate => {
            if config.hierarchy.max_depth == 0 {
                return Err(AppError::configuration("hierarchy.max_depth must be at least 1"));
            }
            if config.hierarchy.max_name_length == 0 {
                return Err(AppError::configuration(
                    "hierarchy.max_name_length must be at least 1",
                ));
            }
            if !config.versioning.restore_description_template.contains("{n}") {
                output::print_warning(
                    "versioning.restore_description_template has no {n} placeholder",
                );
            }

            output::print_success(&format!("Configuration '{config_path}' is valid"));
            output::print_kv("Store", &format!("{:?}", config.storage.backend));
            output::print_kv("Database", &mask_password(&config.database.url));
            output::print_kv("Max depth", &config.hierarchy.max_depth.to_string());
            output::print_kv(
                "Conflict retries",
                &config.versioning.conflict_retries.to_string(),
            );
        }
    }

    Ok(())
}
