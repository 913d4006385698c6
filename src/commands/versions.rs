//! Document version history display.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use docvault_core::error::AppError;
use docvault_core::types::DocumentId;
use docvault_service::Services;

use crate::output::{self, OutputFormat};

/// Arguments for the versions command
#[derive(Debug, Args)]
pub struct VersionsArgs {
    /// Document ID
    pub document_id: DocumentId,
}

/// Version display row
#[derive(Debug, Serialize, Tabled)]
struct VersionRow {
    /// Version number
    version: i32,
    /// Latest marker
    latest: String,
    /// Name at creation
    name: String,
    /// Size in bytes
    size: i64,
    /// Path at creation
    path: String,
    /// Change description
    description: String,
    /// Created at
    created_at: String,
}

/// Execute the versions command
pub async fn execute(
    args: &VersionsArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), AppError> {
    let versions = services.versions().get_all(args.document_id).await?;
    let rows: Vec<VersionRow> = versions
        .iter()
        .map(|v| VersionRow {
            version: v.version_number,
            latest: if v.is_latest { "*".into() } else { String::new() },
            name: v.original_name.clone(),
            size: v.size_bytes,
            path: v.path_at_creation.clone(),
            description: v.change_description.clone().unwrap_or_default(),
            created_at: v.created_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();

    output::print_list(&rows, format);
    Ok(())
}
