//! Document repository implementation.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use docvault_core::result::AppResult;
use docvault_core::types::{DepartmentId, DocumentId, ParentRef};
use docvault_entity::document::{Document, DocumentVersion};

use super::map_db_error;

/// Repository for document rows.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    /// Create a new document repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a document by ID.
    pub async fn find_by_id(&self, id: DocumentId) -> AppResult<Option<Document>> {
        sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error("Failed to find document"))
    }

    /// List documents directly under a parent, ordered by name.
    pub async fn find_children(
        &self,
        parent: ParentRef,
        include_deleted: bool,
    ) -> AppResult<Vec<Document>> {
        sqlx::query_as::<_, Document>(
            "SELECT * FROM documents \
             WHERE parent_kind = $1 AND parent_id = $2 AND ($3 OR NOT is_deleted) \
             ORDER BY name ASC",
        )
        .bind(parent.kind().as_str())
        .bind(parent.id())
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error("Failed to list child documents"))
    }

    /// List every document of a department, live or trashed, ordered by path.
    pub async fn find_by_department(
        &self,
        department_id: DepartmentId,
    ) -> AppResult<Vec<Document>> {
        sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE department_id = $1 ORDER BY path ASC",
        )
        .bind(department_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error("Failed to list department documents"))
    }

    /// Read a document under an exclusive row lock. Every writer touching a
    /// document's version chain takes this lock first.
    pub async fn lock_for_update(
        &self,
        conn: &mut PgConnection,
        id: DocumentId,
    ) -> AppResult<Option<Document>> {
        sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(map_db_error("Failed to lock document"))
    }

    /// IDs of the documents directly inside any of `folder_ids`.
    pub async fn ids_in_folders(
        &self,
        conn: &mut PgConnection,
        folder_ids: &[Uuid],
    ) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM documents WHERE parent_kind = 'folder' AND parent_id = ANY($1)",
        )
        .bind(folder_ids)
        .fetch_all(conn)
        .await
        .map_err(map_db_error("Failed to collect subtree documents"))
    }

    /// Exclusively lock the documents in `ids`, in id order, and return the
    /// ids that still exist.
    pub async fn lock_many(&self, conn: &mut PgConnection, ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM documents WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(ids)
        .fetch_all(conn)
        .await
        .map_err(map_db_error("Failed to lock subtree documents"))
    }

    /// Insert a document row.
    pub async fn insert(&self, conn: &mut PgConnection, document: &Document) -> AppResult<Document> {
        sqlx::query_as::<_, Document>(
            "INSERT INTO documents (id, department_id, parent_kind, parent_id, name, \
             original_name, path, extension, mime_type, size_bytes, file_url, \
             current_version_id, current_version, is_deleted, deleted_at, created_by, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
             $16, $17, $18) RETURNING *",
        )
        .bind(document.id)
        .bind(document.department_id)
        .bind(document.parent.kind().as_str())
        .bind(document.parent.id())
        .bind(&document.name)
        .bind(&document.original_name)
        .bind(&document.path)
        .bind(&document.extension)
        .bind(&document.mime_type)
        .bind(document.size_bytes)
        .bind(&document.file_url)
        .bind(document.current_version_id)
        .bind(document.current_version)
        .bind(document.is_deleted)
        .bind(document.deleted_at)
        .bind(document.created_by)
        .bind(document.created_at)
        .bind(document.updated_at)
        .fetch_one(conn)
        .await
        .map_err(map_db_error("Failed to create document"))
    }

    /// Rewrite a document's own location and name columns.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_location(
        &self,
        conn: &mut PgConnection,
        id: DocumentId,
        department_id: DepartmentId,
        parent: ParentRef,
        name: &str,
        original_name: &str,
        path: &str,
    ) -> AppResult<Option<Document>> {
        sqlx::query_as::<_, Document>(
            "UPDATE documents SET department_id = $2, parent_kind = $3, parent_id = $4, \
             name = $5, original_name = $6, path = $7, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(department_id)
        .bind(parent.kind().as_str())
        .bind(parent.id())
        .bind(name)
        .bind(original_name)
        .bind(path)
        .fetch_optional(conn)
        .await
        .map_err(map_db_error("Failed to update document location"))
    }

    /// Copy the cached content fields from a newly latest version.
    pub async fn sync_latest(
        &self,
        conn: &mut PgConnection,
        version: &DocumentVersion,
    ) -> AppResult<Option<Document>> {
        sqlx::query_as::<_, Document>(
            "UPDATE documents SET file_url = $2, size_bytes = $3, mime_type = $4, \
             current_version_id = $5, current_version = $6, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(version.document_id)
        .bind(&version.file_url)
        .bind(version.size_bytes)
        .bind(&version.mime_type)
        .bind(version.id)
        .bind(version.version_number)
        .fetch_optional(conn)
        .await
        .map_err(map_db_error("Failed to sync document with latest version"))
    }

    /// Replace the `old_path` prefix on every document directly inside
    /// `folder_ids`, moving them to `department_id` as well.
    pub async fn rewrite_paths_in_folders(
        &self,
        conn: &mut PgConnection,
        folder_ids: &[Uuid],
        department_id: DepartmentId,
        old_path: &str,
        new_path: &str,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE documents SET path = $3 || substr(path, char_length($2) + 1), \
             department_id = $4, updated_at = NOW() \
             WHERE parent_kind = 'folder' AND parent_id = ANY($1)",
        )
        .bind(folder_ids)
        .bind(old_path)
        .bind(new_path)
        .bind(department_id)
        .execute(conn)
        .await
        .map_err(map_db_error("Failed to rewrite document paths"))?;
        Ok(result.rows_affected())
    }

    /// Trash every live document in `ids`.
    pub async fn mark_deleted(
        &self,
        conn: &mut PgConnection,
        ids: &[Uuid],
        deleted_at: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE documents SET is_deleted = TRUE, deleted_at = $2, updated_at = NOW() \
             WHERE id = ANY($1) AND NOT is_deleted",
        )
        .bind(ids)
        .bind(deleted_at)
        .execute(conn)
        .await
        .map_err(map_db_error("Failed to delete documents"))?;
        Ok(result.rows_affected())
    }

    /// Restore the documents in `ids` that were trashed at `deleted_at`.
    pub async fn restore(
        &self,
        conn: &mut PgConnection,
        ids: &[Uuid],
        deleted_at: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE documents SET is_deleted = FALSE, deleted_at = NULL, updated_at = NOW() \
             WHERE id = ANY($1) AND is_deleted AND deleted_at = $2",
        )
        .bind(ids)
        .bind(deleted_at)
        .execute(conn)
        .await
        .map_err(map_db_error("Failed to restore documents"))?;
        Ok(result.rows_affected())
    }

    /// Permanently remove the documents in `ids`; their versions cascade.
    pub async fn delete_many(&self, conn: &mut PgConnection, ids: &[Uuid]) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ANY($1)")
            .bind(ids)
            .execute(conn)
            .await
            .map_err(map_db_error("Failed to purge documents"))?;
        Ok(result.rows_affected())
    }
}
