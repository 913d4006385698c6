//! Consistency verification for one department's tree.
//!
//! Re-derives every stored path from its parent, checks that deleted
//! state never leaves a live node under a trashed parent, and walks each
//! document's version chain. Nothing is repaired; the report lists what
//! is wrong.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};

use docvault_core::error::AppError;
use docvault_core::result::AppResult;
use docvault_core::types::{DepartmentId, DocumentId, FolderId, NodeRef, ParentRef};
use docvault_database::{HierarchyStore, SharedStore, VersionStore};
use docvault_entity::department::Department;
use docvault_entity::folder::Folder;
use docvault_entity::node::Node;

use crate::hierarchy::child_path;

/// One broken rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum Violation {
    /// The stored path differs from the parent's path plus the name.
    PathMismatch {
        /// The node.
        node: NodeRef,
        /// What is stored.
        stored: String,
        /// What the parent implies.
        expected: String,
    },
    /// The parent reference points at nothing.
    DanglingParent {
        /// The node.
        node: NodeRef,
        /// The missing parent.
        parent: ParentRef,
    },
    /// The node's department differs from its parent's.
    DepartmentMismatch {
        /// The node.
        node: NodeRef,
        /// The department stored on the node.
        stored: DepartmentId,
        /// The parent's department.
        expected: DepartmentId,
    },
    /// A live node sits under a deleted folder.
    LiveUnderDeleted {
        /// The node.
        node: NodeRef,
        /// Its deleted parent.
        parent: ParentRef,
    },
    /// A document does not have exactly one latest version.
    LatestCount {
        /// The document.
        document_id: DocumentId,
        /// How many versions are flagged latest.
        count: usize,
    },
    /// Version numbers are not exactly `1..=max`.
    VersionGap {
        /// The document.
        document_id: DocumentId,
        /// The numbers present, ascending.
        numbers: Vec<i32>,
    },
    /// The document's cached current version is not the latest row.
    CurrentVersionMismatch {
        /// The document.
        document_id: DocumentId,
        /// The version number cached on the document.
        cached: i32,
        /// The number of the version flagged latest.
        latest: i32,
    },
}

/// Result of [`IntegrityService::verify`].
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    /// The department that was checked.
    pub department_id: DepartmentId,
    /// Folders examined, deleted ones included.
    pub folders_checked: u64,
    /// Documents examined, deleted ones included.
    pub documents_checked: u64,
    /// Version rows examined.
    pub versions_checked: u64,
    /// Everything found wrong.
    pub violations: Vec<Violation>,
}

impl IntegrityReport {
    /// Whether no violation was found.
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

/// The parent as the checker sees it.
struct ParentView {
    department_id: DepartmentId,
    path: String,
    is_deleted: bool,
}

/// Verifies a department's hierarchy and version chains.
#[derive(Debug, Clone)]
pub struct IntegrityService {
    store: SharedStore,
}

impl IntegrityService {
    /// Creates a new integrity service.
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Check every folder, document and version of a department.
    pub async fn verify(&self, department_id: DepartmentId) -> AppResult<IntegrityReport> {
        let department = self
            .store
            .find_department(department_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Department {department_id} not found")))?;

        let folders = self.store.list_department_folders(department_id).await?;
        let documents = self.store.list_department_documents(department_id).await?;
        let by_id: HashMap<_, &Folder> = folders.iter().map(|f| (f.id, f)).collect();

        let mut report = IntegrityReport {
            department_id,
            folders_checked: folders.len() as u64,
            documents_checked: documents.len() as u64,
            versions_checked: 0,
            violations: Vec::new(),
        };

        let nodes = folders
            .iter()
            .cloned()
            .map(Node::from)
            .chain(documents.iter().cloned().map(Node::from));
        for node in nodes {
            let Some(parent) = self.parent_view(&department, &by_id, node.parent()).await? else {
                report.violations.push(Violation::DanglingParent {
                    node: node.node_ref(),
                    parent: node.parent(),
                });
                continue;
            };
            check_node(&node, &parent, &mut report.violations);
        }

        for document in &documents {
            let versions = self.store.list_versions(document.id).await?;
            report.versions_checked += versions.len() as u64;

            let latest: Vec<_> = versions.iter().filter(|v| v.is_latest).collect();
            if latest.len() != 1 {
                report.violations.push(Violation::LatestCount {
                    document_id: document.id,
                    count: latest.len(),
                });
            }
            let stale_cache = latest.first().filter(|v| {
                v.id != document.current_version_id
                    || v.version_number != document.current_version
            });
            if let Some(latest) = stale_cache {
                report.violations.push(Violation::CurrentVersionMismatch {
                    document_id: document.id,
                    cached: document.current_version,
                    latest: latest.version_number,
                });
            }

            let mut numbers: Vec<i32> = versions.iter().map(|v| v.version_number).collect();
            numbers.sort_unstable();
            if !numbers.iter().copied().eq(1..=numbers.len() as i32) {
                report.violations.push(Violation::VersionGap {
                    document_id: document.id,
                    numbers,
                });
            }
        }

        if report.is_consistent() {
            info!(
                department_id = %department_id,
                folders = report.folders_checked,
                documents = report.documents_checked,
                versions = report.versions_checked,
                "Integrity check passed"
            );
        } else {
            warn!(
                department_id = %department_id,
                violations = report.violations.len(),
                "Integrity check found violations"
            );
        }
        Ok(report)
    }

    async fn parent_view(
        &self,
        department: &Department,
        folders: &HashMap<FolderId, &Folder>,
        parent: ParentRef,
    ) -> AppResult<Option<ParentView>> {
        match parent {
            ParentRef::Department(id) if id == department.id => Ok(Some(ParentView {
                department_id: department.id,
                path: department.path(),
                is_deleted: false,
            })),
            ParentRef::Department(id) => Ok(self.store.find_department(id).await?.map(|d| {
                ParentView {
                    department_id: d.id,
                    path: d.path(),
                    is_deleted: false,
                }
            })),
            ParentRef::Folder(id) => {
                let found = match folders.get(&id) {
                    Some(folder) => Some((*folder).clone()),
                    None => self.store.find_folder(id).await?,
                };
                Ok(found.map(|f| ParentView {
                    department_id: f.department_id,
                    path: f.path,
                    is_deleted: f.is_deleted,
                }))
            }
        }
    }
}

fn check_node(node: &Node, parent: &ParentView, violations: &mut Vec<Violation>) {
    let display = match node {
        Node::Folder(f) => f.name.clone(),
        Node::Document(d) => d.file_name(),
    };
    let expected = child_path(&parent.path, &display);
    if node.path() != expected {
        violations.push(Violation::PathMismatch {
            node: node.node_ref(),
            stored: node.path().to_string(),
            expected,
        });
    }
    if node.department_id() != parent.department_id {
        violations.push(Violation::DepartmentMismatch {
            node: node.node_ref(),
            stored: node.department_id(),
            expected: parent.department_id,
        });
    }
    if parent.is_deleted && !node.is_deleted() {
        violations.push(Violation::LiveUnderDeleted {
            node: node.node_ref(),
            parent: node.parent(),
        });
    }
}
