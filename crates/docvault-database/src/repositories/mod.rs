//! PostgreSQL repositories, one per table.
//!
//! Plain reads go through the pool. Writes take a `&mut PgConnection` so
//! [`PgStore`](crate::store::PgStore) can compose several of them inside
//! one transaction.

pub mod department;
pub mod document;
pub mod folder;
pub mod version;

pub use department::DepartmentRepository;
pub use document::DocumentRepository;
pub use folder::FolderRepository;
pub use version::VersionRepository;

use docvault_core::error::{AppError, ErrorKind};

/// Unique key on `(document_id, version_number)`.
pub const VERSION_NUMBER_KEY: &str = "document_versions_number_key";
/// Partial unique index on `document_id WHERE is_latest`.
pub const LATEST_VERSION_KEY: &str = "document_versions_latest_key";
/// Unique key on department names.
pub const DEPARTMENT_NAME_KEY: &str = "departments_name_key";

/// SQLSTATE raised when a serializable transaction loses a conflict.
pub const SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE raised when the server breaks a lock cycle.
pub const DEADLOCK_DETECTED: &str = "40P01";

/// Map a sqlx error to an [`AppError`]. Version-chain uniqueness
/// violations, serialization failures and deadlocks become retryable
/// invariant violations.
pub(crate) fn map_db_error(context: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| {
        let (constraint, code) = match &e {
            sqlx::Error::Database(db_err) => (
                db_err.constraint().map(str::to_owned),
                db_err.code().map(|c| c.into_owned()),
            ),
            _ => (None, None),
        };

        if matches!(code.as_deref(), Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED)) {
            return AppError::with_source(
                ErrorKind::InvariantViolation,
                format!("{context}: lost a lock race with a concurrent write"),
                e,
            );
        }

        match constraint.as_deref() {
            Some(VERSION_NUMBER_KEY) | Some(LATEST_VERSION_KEY) => AppError::with_source(
                ErrorKind::InvariantViolation,
                format!("{context}: a concurrent version write won the race"),
                e,
            ),
            Some(DEPARTMENT_NAME_KEY) => AppError::with_source(
                ErrorKind::InvalidOperation,
                format!("{context}: department name already exists"),
                e,
            ),
            _ => AppError::with_source(ErrorKind::Database, context, e),
        }
    }
}

/// Recursive CTE selecting every folder below `$1` (excluding `$1`).
pub(crate) const SUBTREE_FOLDERS_CTE: &str = "WITH RECURSIVE subtree AS ( \
        SELECT id FROM folders WHERE parent_kind = 'folder' AND parent_id = $1 \
        UNION ALL \
        SELECT f.id FROM folders f \
        INNER JOIN subtree s ON f.parent_kind = 'folder' AND f.parent_id = s.id \
     )";
