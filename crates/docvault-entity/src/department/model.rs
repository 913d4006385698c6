//! Department entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use docvault_core::types::DepartmentId;

/// The root container of one folder tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Department {
    /// Unique department identifier.
    pub id: DepartmentId,
    /// Globally unique display name; the first path segment of every node below.
    pub name: String,
    /// Short code (e.g. `ENG`).
    pub code: String,
    /// Deactivated departments accept no new children.
    pub is_active: bool,
    /// When the department was created.
    pub created_at: DateTime<Utc>,
    /// When the department was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Department {
    /// Build a new active department.
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: DepartmentId::new(),
            name: name.into(),
            code: code.into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// The path children of this department are computed from.
    pub fn path(&self) -> String {
        format!("/{}", self.name)
    }
}
