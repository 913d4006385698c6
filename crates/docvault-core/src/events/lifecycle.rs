//! Lifecycle event payloads.

use serde::{Deserialize, Serialize};

use crate::types::{DepartmentId, DocumentId, FolderId, NodeRef, ParentRef};

/// What a committed hierarchy operation changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LifecycleEvent {
    /// A department was registered.
    DepartmentCreated {
        /// The department ID.
        department_id: DepartmentId,
        /// Its unique name.
        name: String,
    },
    /// A department stopped accepting new content.
    DepartmentDeactivated {
        /// The department ID.
        department_id: DepartmentId,
    },
    /// A folder was created.
    FolderCreated {
        /// The folder ID.
        folder_id: FolderId,
        /// Where it was created.
        parent: ParentRef,
        /// Its materialized path.
        path: String,
    },
    /// A document was created with its first version.
    DocumentCreated {
        /// The document ID.
        document_id: DocumentId,
        /// Where it was created.
        parent: ParentRef,
        /// Its materialized path.
        path: String,
        /// Always 1.
        version_number: i32,
    },
    /// A node changed name.
    Renamed {
        /// The renamed node.
        node: NodeRef,
        /// Name before the rename.
        old_name: String,
        /// Name after the rename.
        new_name: String,
        /// Path before the rename.
        old_path: String,
        /// Path after the rename.
        new_path: String,
        /// Descendant rows whose path prefix was rewritten.
        descendants_updated: u64,
    },
    /// A node changed parent.
    Moved {
        /// The moved node.
        node: NodeRef,
        /// Parent before the move.
        old_parent: ParentRef,
        /// Parent after the move.
        new_parent: ParentRef,
        /// Path before the move.
        old_path: String,
        /// Path after the move.
        new_path: String,
        /// Descendant rows whose path prefix was rewritten.
        descendants_updated: u64,
    },
    /// A new version became the latest one.
    VersionAppended {
        /// The document ID.
        document_id: DocumentId,
        /// The version that was latest before.
        previous_version: i32,
        /// The new latest version.
        new_version: i32,
        /// Set when the version re-instates an older one.
        restored_from: Option<i32>,
    },
    /// A node (and its live descendants) moved to the trash.
    SoftDeleted {
        /// The deleted node.
        node: NodeRef,
        /// Its path.
        path: String,
        /// Rows marked deleted, including the node itself.
        affected: u64,
    },
    /// A node (and descendants deleted with it) left the trash.
    Restored {
        /// The restored node.
        node: NodeRef,
        /// Its path.
        path: String,
        /// Rows restored, including the node itself.
        affected: u64,
    },
    /// A trashed node and its subtree were removed for good.
    Purged {
        /// The purged node.
        node: NodeRef,
        /// Its path at removal time.
        path: String,
        /// Folder and document rows removed.
        removed: u64,
    },
}

impl LifecycleEvent {
    /// Short machine-readable name, for log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DepartmentCreated { .. } => "department_created",
            Self::DepartmentDeactivated { .. } => "department_deactivated",
            Self::FolderCreated { .. } => "folder_created",
            Self::DocumentCreated { .. } => "document_created",
            Self::Renamed { .. } => "renamed",
            Self::Moved { .. } => "moved",
            Self::VersionAppended { .. } => "version_appended",
            Self::SoftDeleted { .. } => "soft_deleted",
            Self::Restored { .. } => "restored",
            Self::Purged { .. } => "purged",
        }
    }
}
