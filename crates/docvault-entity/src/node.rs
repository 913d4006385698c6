//! A folder or a document, viewed uniformly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docvault_core::types::{DepartmentId, NodeRef, ParentRef};

use crate::document::Document;
use crate::folder::Folder;

/// Either kind of tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    /// A folder.
    Folder(Folder),
    /// A document.
    Document(Document),
}

impl Node {
    /// The tagged id of this node.
    pub fn node_ref(&self) -> NodeRef {
        match self {
            Self::Folder(f) => NodeRef::Folder(f.id),
            Self::Document(d) => NodeRef::Document(d.id),
        }
    }

    /// The parent reference.
    pub fn parent(&self) -> ParentRef {
        match self {
            Self::Folder(f) => f.parent,
            Self::Document(d) => d.parent,
        }
    }

    /// The owning department.
    pub fn department_id(&self) -> DepartmentId {
        match self {
            Self::Folder(f) => f.department_id,
            Self::Document(d) => d.department_id,
        }
    }

    /// The display name (documents: without extension).
    pub fn name(&self) -> &str {
        match self {
            Self::Folder(f) => &f.name,
            Self::Document(d) => &d.name,
        }
    }

    /// The materialized path.
    pub fn path(&self) -> &str {
        match self {
            Self::Folder(f) => &f.path,
            Self::Document(d) => &d.path,
        }
    }

    /// Whether the node is in the trash.
    pub fn is_deleted(&self) -> bool {
        match self {
            Self::Folder(f) => f.is_deleted,
            Self::Document(d) => d.is_deleted,
        }
    }

    /// When the node was trashed.
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Folder(f) => f.deleted_at,
            Self::Document(d) => d.deleted_at,
        }
    }
}

impl From<Folder> for Node {
    fn from(folder: Folder) -> Self {
        Self::Folder(folder)
    }
}

impl From<Document> for Node {
    fn from(document: Document) -> Self {
        Self::Document(document)
    }
}

/// A trash listing entry: a deleted node whose parent is still live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashItem {
    /// The trashed node.
    pub node: NodeRef,
    /// Display name.
    pub name: String,
    /// Path at deletion time.
    pub path: String,
    /// When it was trashed.
    pub deleted_at: DateTime<Utc>,
}
