//! Folder tree structures for hierarchical display.

use serde::{Deserialize, Serialize};

use docvault_core::types::{DepartmentId, FolderId};

/// A node in a folder tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderNode {
    /// Folder ID.
    pub id: FolderId,
    /// Folder name.
    pub name: String,
    /// Full path.
    pub path: String,
    /// Depth level (1 for a department's direct children).
    pub depth: usize,
    /// Number of live documents directly in this folder.
    pub document_count: u64,
    /// Child folder nodes, ordered by name.
    pub children: Vec<FolderNode>,
}

/// The live folder tree of one department.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderTree {
    /// The department the tree hangs off.
    pub department_id: DepartmentId,
    /// Live documents directly under the department.
    pub root_document_count: u64,
    /// The department's direct child folders.
    pub roots: Vec<FolderNode>,
    /// Total number of folders in the tree.
    pub total_folders: u64,
    /// Total number of live documents in the tree.
    pub total_documents: u64,
}

impl FolderTree {
    /// Create an empty folder tree.
    pub fn empty(department_id: DepartmentId) -> Self {
        Self {
            department_id,
            root_document_count: 0,
            roots: Vec::new(),
            total_folders: 0,
            total_documents: 0,
        }
    }
}
