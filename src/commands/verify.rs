//! Integrity verification command.

use clap::Args;

use docvault_core::error::AppError;
use docvault_core::types::DepartmentId;
use docvault_service::{Services, Violation};

use crate::output::{self, OutputFormat};

/// Arguments for the verify command
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Department ID
    pub department_id: DepartmentId,
}

/// Execute the verify command. Fails when any violation is found.
pub async fn execute(
    args: &VerifyArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), AppError> {
    let report = services.integrity.verify(args.department_id).await?;

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => {
            output::print_kv("Folders checked", &report.folders_checked.to_string());
            output::print_kv("Documents checked", &report.documents_checked.to_string());
            output::print_kv("Versions checked", &report.versions_checked.to_string());
            for violation in &report.violations {
                output::print_warning(&describe(violation));
            }
        }
    }

    if report.is_consistent() {
        output::print_success("No violations found");
        Ok(())
    } else {
        Err(AppError::internal(format!(
            "{} integrity violation(s) found",
            report.violations.len()
        )))
    }
}

fn describe(violation: &Violation) -> String {
    match violation {
        Violation::PathMismatch {
            node,
            stored,
            expected,
        } => format!("{node}: path '{stored}' should be '{expected}'"),
        Violation::DanglingParent { node, parent } => {
            format!("{node}: parent {parent} does not exist")
        }
        Violation::DepartmentMismatch {
            node,
            stored,
            expected,
        } => format!("{node}: department {stored} should be {expected}"),
        Violation::LiveUnderDeleted { node, parent } => {
            format!("{node}: live under deleted {parent}")
        }
        Violation::LatestCount { document_id, count } => {
            format!("document:{document_id}: {count} versions marked latest")
        }
        Violation::VersionGap {
            document_id,
            numbers,
        } => format!("document:{document_id}: version numbers {numbers:?} are not contiguous"),
        Violation::CurrentVersionMismatch {
            document_id,
            cached,
            latest,
        } => format!("document:{document_id}: cached version {cached}, latest is {latest}"),
    }
}
