//! Document entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use docvault_core::types::{DepartmentId, DocumentId, DocumentVersionId, ParentRef, UserId};

use crate::row::decode_parent;

/// One uploaded file identity. Its content history lives in
/// [`DocumentVersion`](super::DocumentVersion) rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Unique document identifier.
    pub id: DocumentId,
    /// The department at the root of this document's tree.
    pub department_id: DepartmentId,
    /// The folder or department this document sits in.
    pub parent: ParentRef,
    /// Display name, without extension.
    pub name: String,
    /// File name as uploaded (or as last renamed).
    pub original_name: String,
    /// Materialized path, ending in `name.extension`.
    pub path: String,
    /// Lowercase extension without the dot; fixed at creation.
    pub extension: String,
    /// MIME type of the latest version.
    pub mime_type: String,
    /// Size in bytes of the latest version.
    pub size_bytes: i64,
    /// Opaque blob storage key of the latest version.
    pub file_url: String,
    /// The version row currently marked latest.
    pub current_version_id: DocumentVersionId,
    /// Its version number.
    pub current_version: i32,
    /// Whether the document is in the trash.
    pub is_deleted: bool,
    /// When the document (or the ancestor whose deletion cascaded here) was trashed.
    pub deleted_at: Option<DateTime<Utc>>,
    /// The user who created the document.
    pub created_by: UserId,
    /// When the document was created.
    pub created_at: DateTime<Utc>,
    /// When the document was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// The last path segment: the name plus extension, if any.
    pub fn file_name(&self) -> String {
        file_name(&self.name, &self.extension)
    }
}

/// Join a display name and extension the way document paths do.
pub fn file_name(name: &str, extension: &str) -> String {
    if extension.is_empty() {
        name.to_string()
    } else {
        format!("{name}.{extension}")
    }
}

impl<'r> FromRow<'r, PgRow> for Document {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            department_id: row.try_get("department_id")?,
            parent: decode_parent(row)?,
            name: row.try_get("name")?,
            original_name: row.try_get("original_name")?,
            path: row.try_get("path")?,
            extension: row.try_get("extension")?,
            mime_type: row.try_get("mime_type")?,
            size_bytes: row.try_get("size_bytes")?,
            file_url: row.try_get("file_url")?,
            current_version_id: row.try_get("current_version_id")?,
            current_version: row.try_get("current_version")?,
            is_deleted: row.try_get("is_deleted")?,
            deleted_at: row.try_get("deleted_at")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
