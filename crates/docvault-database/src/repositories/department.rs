//! Department repository implementation.

use sqlx::{PgConnection, PgPool};

use docvault_core::result::AppResult;
use docvault_core::types::DepartmentId;
use docvault_entity::department::Department;

use super::map_db_error;

/// Repository for department rows.
#[derive(Debug, Clone)]
pub struct DepartmentRepository {
    pool: PgPool,
}

impl DepartmentRepository {
    /// Create a new department repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a department by ID.
    pub async fn find_by_id(&self, id: DepartmentId) -> AppResult<Option<Department>> {
        sqlx::query_as::<_, Department>("SELECT * FROM departments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error("Failed to find department"))
    }

    /// Find a department by its unique name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<Department>> {
        sqlx::query_as::<_, Department>("SELECT * FROM departments WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error("Failed to find department by name"))
    }

    /// List all departments ordered by name.
    pub async fn list(&self) -> AppResult<Vec<Department>> {
        sqlx::query_as::<_, Department>("SELECT * FROM departments ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error("Failed to list departments"))
    }

    /// Read a department and hold a share lock until the transaction ends,
    /// so it cannot be deactivated underneath a concurrent insert or move.
    pub async fn lock_for_share(
        &self,
        conn: &mut PgConnection,
        id: DepartmentId,
    ) -> AppResult<Option<Department>> {
        sqlx::query_as::<_, Department>("SELECT * FROM departments WHERE id = $1 FOR SHARE")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(map_db_error("Failed to lock department"))
    }

    /// Insert a department.
    pub async fn insert(&self, department: &Department) -> AppResult<Department> {
        sqlx::query_as::<_, Department>(
            "INSERT INTO departments (id, name, code, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(department.id)
        .bind(&department.name)
        .bind(&department.code)
        .bind(department.is_active)
        .bind(department.created_at)
        .bind(department.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error("Failed to create department"))
    }

    /// Flip the active flag.
    pub async fn set_active(&self, id: DepartmentId, active: bool) -> AppResult<Option<Department>> {
        sqlx::query_as::<_, Department>(
            "UPDATE departments SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error("Failed to update department"))
    }
}
