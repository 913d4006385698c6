//! Tagged references into the hierarchy.
//!
//! A folder or document hangs off either a department or a folder, so the
//! parent is a discriminated reference rather than two nullable ids.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::id::{DepartmentId, DocumentId, FolderId};
use crate::error::AppError;

/// Which table a parent reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentKind {
    /// The parent is a department (tree root).
    Department,
    /// The parent is a folder.
    Folder,
}

impl ParentKind {
    /// Return the kind as stored in the `parent_kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Department => "department",
            Self::Folder => "folder",
        }
    }
}

impl fmt::Display for ParentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ParentKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "department" => Ok(Self::Department),
            "folder" => Ok(Self::Folder),
            _ => Err(AppError::internal(format!("Unknown parent kind '{s}'"))),
        }
    }
}

/// The parent of a folder or document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ParentRef {
    /// Directly under a department.
    Department(DepartmentId),
    /// Inside a folder.
    Folder(FolderId),
}

impl ParentRef {
    /// Rebuild a reference from its stored `(kind, id)` pair.
    pub fn from_parts(kind: ParentKind, id: Uuid) -> Self {
        match kind {
            ParentKind::Department => Self::Department(DepartmentId(id)),
            ParentKind::Folder => Self::Folder(FolderId(id)),
        }
    }

    /// The discriminant.
    pub fn kind(&self) -> ParentKind {
        match self {
            Self::Department(_) => ParentKind::Department,
            Self::Folder(_) => ParentKind::Folder,
        }
    }

    /// The raw id, whichever table it refers to.
    pub fn id(&self) -> Uuid {
        match self {
            Self::Department(id) => id.0,
            Self::Folder(id) => id.0,
        }
    }

    /// The folder id, if the parent is a folder.
    pub fn as_folder(&self) -> Option<FolderId> {
        match self {
            Self::Folder(id) => Some(*id),
            Self::Department(_) => None,
        }
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

impl From<DepartmentId> for ParentRef {
    fn from(id: DepartmentId) -> Self {
        Self::Department(id)
    }
}

impl From<FolderId> for ParentRef {
    fn from(id: FolderId) -> Self {
        Self::Folder(id)
    }
}

/// A movable, renamable node: a folder or a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum NodeRef {
    /// A folder node.
    Folder(FolderId),
    /// A document leaf.
    Document(DocumentId),
}

impl NodeRef {
    /// The raw id.
    pub fn id(&self) -> Uuid {
        match self {
            Self::Folder(id) => id.0,
            Self::Document(id) => id.0,
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Folder(id) => write!(f, "folder:{id}"),
            Self::Document(id) => write!(f, "document:{id}"),
        }
    }
}

impl From<FolderId> for NodeRef {
    fn from(id: FolderId) -> Self {
        Self::Folder(id)
    }
}

impl From<DocumentId> for NodeRef {
    fn from(id: DocumentId) -> Self {
        Self::Document(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_round_trips_through_parts() {
        let folder = FolderId::new();
        let parent = ParentRef::from(folder);
        let kind: ParentKind = parent.kind().as_str().parse().expect("known kind");
        assert_eq!(ParentRef::from_parts(kind, parent.id()), parent);
        assert_eq!(parent.as_folder(), Some(folder));
    }

    #[test]
    fn test_parent_serializes_as_tagged_object() {
        let dept = DepartmentId::new();
        let json = serde_json::to_value(ParentRef::Department(dept)).expect("serialize");
        assert_eq!(json["kind"], "department");
        assert_eq!(json["id"], dept.to_string());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!("drive".parse::<ParentKind>().is_err());
    }
}
