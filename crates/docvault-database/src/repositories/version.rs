//! Document version repository implementation.

use sqlx::{PgConnection, PgPool};

use docvault_core::result::AppResult;
use docvault_core::types::{DocumentId, DocumentVersionId};
use docvault_entity::document::DocumentVersion;

use super::map_db_error;

/// Repository for the append-only version log.
#[derive(Debug, Clone)]
pub struct VersionRepository {
    pool: PgPool,
}

impl VersionRepository {
    /// Create a new version repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The row currently marked latest for a document.
    pub async fn find_latest(&self, document_id: DocumentId) -> AppResult<Option<DocumentVersion>> {
        sqlx::query_as::<_, DocumentVersion>(
            "SELECT * FROM document_versions WHERE document_id = $1 AND is_latest",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error("Failed to find latest version"))
    }

    /// A specific version by number.
    pub async fn find_by_number(
        &self,
        document_id: DocumentId,
        version_number: i32,
    ) -> AppResult<Option<DocumentVersion>> {
        sqlx::query_as::<_, DocumentVersion>(
            "SELECT * FROM document_versions WHERE document_id = $1 AND version_number = $2",
        )
        .bind(document_id)
        .bind(version_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error("Failed to find version"))
    }

    /// All versions of a document, latest first, then newest number first.
    pub async fn find_by_document(&self, document_id: DocumentId) -> AppResult<Vec<DocumentVersion>> {
        sqlx::query_as::<_, DocumentVersion>(
            "SELECT * FROM document_versions WHERE document_id = $1 \
             ORDER BY is_latest DESC, version_number DESC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error("Failed to list versions"))
    }

    /// Highest version number recorded for a document, inside a transaction.
    pub async fn max_number(&self, conn: &mut PgConnection, document_id: DocumentId) -> AppResult<i32> {
        let max: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(version_number) FROM document_versions WHERE document_id = $1",
        )
        .bind(document_id)
        .fetch_one(conn)
        .await
        .map_err(map_db_error("Failed to read version counter"))?;
        Ok(max.unwrap_or(0))
    }

    /// Insert a version row.
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        version: &DocumentVersion,
    ) -> AppResult<DocumentVersion> {
        sqlx::query_as::<_, DocumentVersion>(
            "INSERT INTO document_versions (id, document_id, version_number, name, \
             original_name, file_url, size_bytes, mime_type, extension, is_latest, \
             path_at_creation, change_description, created_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING *",
        )
        .bind(version.id)
        .bind(version.document_id)
        .bind(version.version_number)
        .bind(&version.name)
        .bind(&version.original_name)
        .bind(&version.file_url)
        .bind(version.size_bytes)
        .bind(&version.mime_type)
        .bind(&version.extension)
        .bind(version.is_latest)
        .bind(&version.path_at_creation)
        .bind(&version.change_description)
        .bind(version.created_by)
        .bind(version.created_at)
        .fetch_one(conn)
        .await
        .map_err(map_db_error("Failed to create version"))
    }

    /// Clear the latest flag on `expected`, but only while it still holds it.
    ///
    /// Returns `false` when some other writer already demoted it.
    pub async fn demote(
        &self,
        conn: &mut PgConnection,
        document_id: DocumentId,
        expected: DocumentVersionId,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE document_versions SET is_latest = FALSE \
             WHERE id = $1 AND document_id = $2 AND is_latest",
        )
        .bind(expected)
        .bind(document_id)
        .execute(conn)
        .await
        .map_err(map_db_error("Failed to demote latest version"))?;
        Ok(result.rows_affected() == 1)
    }

    /// Rewrite the display fields of the latest version after a rename or
    /// move. Returns `false` when `version_id` is no longer latest.
    pub async fn project_location(
        &self,
        conn: &mut PgConnection,
        version_id: DocumentVersionId,
        name: &str,
        original_name: &str,
        path: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE document_versions SET name = $2, original_name = $3, path_at_creation = $4 \
             WHERE id = $1 AND is_latest",
        )
        .bind(version_id)
        .bind(name)
        .bind(original_name)
        .bind(path)
        .execute(conn)
        .await
        .map_err(map_db_error("Failed to project rename onto latest version"))?;
        Ok(result.rows_affected() == 1)
    }
}
