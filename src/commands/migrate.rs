//! Database migration management commands.

use clap::{Args, Subcommand};

use docvault_core::config::AppConfig;
use docvault_core::error::AppError;
use docvault_database::DatabasePool;
use docvault_database::migration;

use crate::output;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run {
        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show migration status
    Status,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, config: &AppConfig) -> Result<(), AppError> {
    let db = DatabasePool::connect(&config.database).await?;

    match &args.command {
        MigrateCommand::Run { yes } => {
            if !yes {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!(
                        "Apply pending migrations to {}?",
                        docvault_database::connection::mask_password(&config.database.url)
                    ))
                    .default(true)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            println!("Running database migrations...");
            migration::run_migrations(db.pool()).await?;
            output::print_success("All migrations applied successfully.");
        }
        MigrateCommand::Status => {
            for entry in migration::migration_status(db.pool()).await? {
                let state = if entry.applied { "applied" } else { "pending" };
                println!("  {} - {} ({state})", entry.version, entry.description);
            }
        }
    }

    db.close().await;
    Ok(())
}
