//! Folder repository implementation.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use docvault_core::result::AppResult;
use docvault_core::types::{DepartmentId, FolderId, ParentRef};
use docvault_entity::folder::Folder;

use super::{SUBTREE_FOLDERS_CTE, map_db_error};

/// Repository for folder rows and subtree statements.
#[derive(Debug, Clone)]
pub struct FolderRepository {
    pool: PgPool,
}

impl FolderRepository {
    /// Create a new folder repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a folder by ID.
    pub async fn find_by_id(&self, id: FolderId) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error("Failed to find folder"))
    }

    /// List direct child folders of a parent, ordered by name.
    pub async fn find_children(
        &self,
        parent: ParentRef,
        include_deleted: bool,
    ) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders \
             WHERE parent_kind = $1 AND parent_id = $2 AND ($3 OR NOT is_deleted) \
             ORDER BY name ASC",
        )
        .bind(parent.kind().as_str())
        .bind(parent.id())
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error("Failed to list child folders"))
    }

    /// List every folder of a department, live or trashed, ordered by path.
    pub async fn find_by_department(&self, department_id: DepartmentId) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE department_id = $1 ORDER BY path ASC",
        )
        .bind(department_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error("Failed to list department folders"))
    }

    /// Read a folder under a share lock (blocks concurrent delete/move of it).
    pub async fn lock_for_share(
        &self,
        conn: &mut PgConnection,
        id: FolderId,
    ) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = $1 FOR SHARE")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(map_db_error("Failed to lock folder"))
    }

    /// Read a folder under an exclusive row lock.
    pub async fn lock_for_update(
        &self,
        conn: &mut PgConnection,
        id: FolderId,
    ) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(map_db_error("Failed to lock folder"))
    }

    /// IDs of every folder strictly below `root`.
    pub async fn subtree_ids(&self, conn: &mut PgConnection, root: FolderId) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(&format!("{SUBTREE_FOLDERS_CTE} SELECT id FROM subtree"))
            .bind(root)
            .fetch_all(conn)
            .await
            .map_err(map_db_error("Failed to collect folder subtree"))
    }

    /// Exclusively lock the folders in `ids`, in id order, and return the
    /// ids that still exist.
    pub async fn lock_many(&self, conn: &mut PgConnection, ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM folders WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(ids)
        .fetch_all(conn)
        .await
        .map_err(map_db_error("Failed to lock folder subtree"))
    }

    /// Insert a folder.
    pub async fn insert(&self, conn: &mut PgConnection, folder: &Folder) -> AppResult<Folder> {
        sqlx::query_as::<_, Folder>(
            "INSERT INTO folders (id, department_id, parent_kind, parent_id, name, path, \
             is_deleted, deleted_at, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
        )
        .bind(folder.id)
        .bind(folder.department_id)
        .bind(folder.parent.kind().as_str())
        .bind(folder.parent.id())
        .bind(&folder.name)
        .bind(&folder.path)
        .bind(folder.is_deleted)
        .bind(folder.deleted_at)
        .bind(folder.created_by)
        .bind(folder.created_at)
        .bind(folder.updated_at)
        .fetch_one(conn)
        .await
        .map_err(map_db_error("Failed to create folder"))
    }

    /// Rewrite a folder's own location columns.
    pub async fn update_location(
        &self,
        conn: &mut PgConnection,
        id: FolderId,
        department_id: DepartmentId,
        parent: ParentRef,
        name: &str,
        path: &str,
    ) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>(
            "UPDATE folders SET department_id = $2, parent_kind = $3, parent_id = $4, \
             name = $5, path = $6, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(department_id)
        .bind(parent.kind().as_str())
        .bind(parent.id())
        .bind(name)
        .bind(path)
        .fetch_optional(conn)
        .await
        .map_err(map_db_error("Failed to update folder location"))
    }

    /// Replace the `old_path` prefix with `new_path` on the given folders in
    /// one statement, moving them to `department_id` as well.
    pub async fn rewrite_paths(
        &self,
        conn: &mut PgConnection,
        ids: &[Uuid],
        department_id: DepartmentId,
        old_path: &str,
        new_path: &str,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE folders SET path = $3 || substr(path, char_length($2) + 1), \
             department_id = $4, updated_at = NOW() \
             WHERE id = ANY($1)",
        )
        .bind(ids)
        .bind(old_path)
        .bind(new_path)
        .bind(department_id)
        .execute(conn)
        .await
        .map_err(map_db_error("Failed to rewrite folder paths"))?;
        Ok(result.rows_affected())
    }

    /// Trash every live folder in `ids`.
    pub async fn mark_deleted(
        &self,
        conn: &mut PgConnection,
        ids: &[Uuid],
        deleted_at: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE folders SET is_deleted = TRUE, deleted_at = $2, updated_at = NOW() \
             WHERE id = ANY($1) AND NOT is_deleted",
        )
        .bind(ids)
        .bind(deleted_at)
        .execute(conn)
        .await
        .map_err(map_db_error("Failed to delete folders"))?;
        Ok(result.rows_affected())
    }

    /// Restore the folders in `ids` that were trashed at `deleted_at`.
    pub async fn restore(
        &self,
        conn: &mut PgConnection,
        ids: &[Uuid],
        deleted_at: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE folders SET is_deleted = FALSE, deleted_at = NULL, updated_at = NOW() \
             WHERE id = ANY($1) AND is_deleted AND deleted_at = $2",
        )
        .bind(ids)
        .bind(deleted_at)
        .execute(conn)
        .await
        .map_err(map_db_error("Failed to restore folders"))?;
        Ok(result.rows_affected())
    }

    /// Permanently remove the folders in `ids`.
    pub async fn delete_many(&self, conn: &mut PgConnection, ids: &[Uuid]) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM folders WHERE id = ANY($1)")
            .bind(ids)
            .execute(conn)
            .await
            .map_err(map_db_error("Failed to purge folders"))?;
        Ok(result.rows_affected())
    }
}
