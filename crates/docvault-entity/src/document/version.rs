//! Document version entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use docvault_core::types::{DocumentId, DocumentVersionId, UserId};

/// An immutable snapshot of a document's content.
///
/// Only `is_latest` ever flips after insertion, plus the rename
/// projection that rewrites the display fields of the latest row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DocumentVersion {
    /// Unique version identifier.
    pub id: DocumentVersionId,
    /// The document this version belongs to.
    pub document_id: DocumentId,
    /// Sequential version number, starting at 1.
    pub version_number: i32,
    /// Display name when the version was created.
    pub name: String,
    /// Uploaded file name when the version was created.
    pub original_name: String,
    /// Opaque blob storage key.
    pub file_url: String,
    /// Size in bytes.
    pub size_bytes: i64,
    /// MIME type.
    pub mime_type: String,
    /// Lowercase extension without the dot.
    pub extension: String,
    /// Whether this is the document's current version.
    pub is_latest: bool,
    /// The document's path when this version was created.
    pub path_at_creation: String,
    /// Optional comment describing the change.
    pub change_description: Option<String>,
    /// User who created this version.
    pub created_by: UserId,
    /// When this version was created.
    pub created_at: DateTime<Utc>,
}
