//! Folder entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use docvault_core::types::{DepartmentId, FolderId, ParentRef, UserId};

use crate::row::decode_parent;

/// A folder in a department's tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Unique folder identifier.
    pub id: FolderId,
    /// The department at the root of this folder's tree.
    pub department_id: DepartmentId,
    /// The folder or department this folder sits in.
    pub parent: ParentRef,
    /// Folder name.
    pub name: String,
    /// Full materialized path (e.g., `/Engineering/Projects/Q4`).
    pub path: String,
    /// Whether the folder is in the trash.
    pub is_deleted: bool,
    /// When the folder (or the ancestor whose deletion cascaded here) was trashed.
    pub deleted_at: Option<DateTime<Utc>>,
    /// The user who created the folder.
    pub created_by: UserId,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last updated.
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for Folder {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            department_id: row.try_get("department_id")?,
            parent: decode_parent(row)?,
            name: row.try_get("name")?,
            path: row.try_get("path")?,
            is_deleted: row.try_get("is_deleted")?,
            deleted_at: row.try_get("deleted_at")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
