//! Folder tree display.

use clap::Args;

use docvault_core::error::AppError;
use docvault_core::types::DepartmentId;
use docvault_entity::folder::FolderNode;
use docvault_service::Services;

use crate::output::{self, OutputFormat};

/// Arguments for the tree command
#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Department ID
    pub department_id: DepartmentId,

    /// Max depth to print (0 for unlimited)
    #[arg(short, long, default_value = "0")]
    pub depth: usize,
}

/// Execute the tree command
pub async fn execute(
    args: &TreeArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), AppError> {
    let department = services.departments.get(args.department_id).await?;
    let tree = services.tree.build_tree(args.department_id).await?;

    match format {
        OutputFormat::Json => output::print_json(&tree),
        OutputFormat::Table => {
            println!("{} ({} documents)", department.path(), tree.root_document_count);
            for node in &tree.roots {
                print_node(node, 1, args.depth);
            }
            println!();
            output::print_kv("Folders", &tree.total_folders.to_string());
            output::print_kv("Documents", &tree.total_documents.to_string());
        }
    }

    Ok(())
}

fn print_node(node: &FolderNode, level: usize, max_depth: usize) {
    if max_depth != 0 && level > max_depth {
        return;
    }
    println!(
        "{}{}/ ({} documents)",
        "  ".repeat(level),
        node.name,
        node.document_count
    );
    for child in &node.children {
        print_node(child, level + 1, max_depth);
    }
}
