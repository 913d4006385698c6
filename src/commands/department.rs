//! Department management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use docvault_core::error::AppError;
use docvault_core::types::DepartmentId;
use docvault_entity::department::Department;
use docvault_service::{CreateDepartmentRequest, RequestContext, Services};

use crate::output::{self, OutputFormat};

/// Arguments for department commands
#[derive(Debug, Args)]
pub struct DepartmentArgs {
    /// Department subcommand
    #[command(subcommand)]
    pub command: DepartmentCommand,
}

/// Department subcommands
#[derive(Debug, Subcommand)]
pub enum DepartmentCommand {
    /// List all departments
    List,
    /// Create a new department
    Create {
        /// Department name (unique)
        #[arg(short, long)]
        name: String,
        /// Short code
        #[arg(short, long)]
        code: String,
    },
    /// Stop a department from accepting new children
    Deactivate {
        /// Department ID
        id: DepartmentId,
    },
    /// List a department's trash
    Trash {
        /// Department ID
        id: DepartmentId,
    },
}

/// Department display row
#[derive(Debug, Serialize, Tabled)]
struct DepartmentRow {
    /// Department ID
    id: String,
    /// Name
    name: String,
    /// Code
    code: String,
    /// Active
    active: bool,
    /// Created at
    created_at: String,
}

impl From<&Department> for DepartmentRow {
    fn from(d: &Department) -> Self {
        Self {
            id: d.id.to_string(),
            name: d.name.clone(),
            code: d.code.clone(),
            active: d.is_active,
            created_at: d.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Trash display row
#[derive(Debug, Serialize, Tabled)]
struct TrashRow {
    /// Node
    node: String,
    /// Path
    path: String,
    /// Deleted at
    deleted_at: String,
}

/// Execute department commands
pub async fn execute(
    args: &DepartmentArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), AppError> {
    let ctx = RequestContext::system();

    match &args.command {
        DepartmentCommand::List => {
            let departments = services.departments.list().await?;
            let rows: Vec<DepartmentRow> = departments.iter().map(DepartmentRow::from).collect();
            output::print_list(&rows, format);
        }
        DepartmentCommand::Create { name, code } => {
            let outcome = services
                .departments
                .create(
                    &ctx,
                    CreateDepartmentRequest {
                        name: name.clone(),
                        code: code.clone(),
                    },
                )
                .await?;
            output::print_success(&format!(
                "Department '{}' created ({})",
                outcome.value.name, outcome.value.id
            ));
        }
        DepartmentCommand::Deactivate { id } => {
            let outcome = services.departments.deactivate(&ctx, *id).await?;
            output::print_success(&format!("Department '{}' deactivated", outcome.value.name));
        }
        DepartmentCommand::Trash { id } => {
            let rows: Vec<TrashRow> = services
                .lifecycle
                .list_trash(*id)
                .await?
                .into_iter()
                .map(|item| TrashRow {
                    node: item.node.to_string(),
                    path: item.path,
                    deleted_at: item.deleted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                })
                .collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
