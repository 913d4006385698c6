//! The persistence seam the service layer is written against.
//!
//! Every mutating method is one atomic operation: it either commits all of
//! its rows or none. Preconditions that can race with another writer
//! (parent still live, node still where the caller saw it, expected latest
//! version still latest) are re-checked inside that operation.

pub mod memory;
pub mod postgres;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use docvault_core::config::{AppConfig, StoreBackend};
use docvault_core::result::AppResult;
use docvault_core::types::{
    DepartmentId, DocumentId, DocumentVersionId, FolderId, NodeRef, ParentRef,
};
use docvault_entity::department::Department;
use docvault_entity::document::{Document, DocumentVersion};
use docvault_entity::folder::Folder;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::connection::DatabasePool;

/// New location for a folder. `path` is the folder's new full path;
/// `old_path` is the path the caller computed it from.
#[derive(Debug, Clone)]
pub struct FolderRelocation {
    /// The folder being renamed or moved.
    pub folder_id: FolderId,
    /// Department of the destination tree.
    pub department_id: DepartmentId,
    /// New parent (unchanged on a plain rename).
    pub parent: ParentRef,
    /// New name.
    pub name: String,
    /// New materialized path.
    pub path: String,
    /// Path the folder had when the caller read it.
    pub old_path: String,
}

/// Rename of the latest version's display fields that accompanies a
/// document rename.
#[derive(Debug, Clone)]
pub struct VersionProjection {
    /// The version the caller saw as latest.
    pub version_id: DocumentVersionId,
    /// New display name.
    pub name: String,
    /// New original file name.
    pub original_name: String,
    /// New `path_at_creation`.
    pub path_at_creation: String,
}

/// New location for a document.
#[derive(Debug, Clone)]
pub struct DocumentRelocation {
    /// The document being renamed or moved.
    pub document_id: DocumentId,
    /// Department of the destination tree.
    pub department_id: DepartmentId,
    /// New parent.
    pub parent: ParentRef,
    /// New display name.
    pub name: String,
    /// New original file name.
    pub original_name: String,
    /// New materialized path.
    pub path: String,
    /// Path the document had when the caller read it.
    pub old_path: String,
    /// Set on renames; moves leave version rows alone.
    pub latest_projection: Option<VersionProjection>,
}

/// A new version to append on top of `expected_latest`.
#[derive(Debug, Clone)]
pub struct VersionAppend {
    /// The version the caller read as latest.
    pub expected_latest: DocumentVersionId,
    /// The row to insert; `is_latest` must be true and `version_number`
    /// must be one past the current maximum.
    pub version: DocumentVersion,
}

/// Result of a folder relocation.
#[derive(Debug, Clone)]
pub struct RelocatedFolder {
    /// The folder after the change.
    pub folder: Folder,
    /// Descendant folders and documents whose paths were rewritten.
    pub descendants_updated: u64,
}

/// Departments and the folder/document tree.
#[async_trait]
pub trait HierarchyStore: Send + Sync + fmt::Debug {
    /// Find a department by ID.
    async fn find_department(&self, id: DepartmentId) -> AppResult<Option<Department>>;

    /// Find a department by its unique name.
    async fn find_department_by_name(&self, name: &str) -> AppResult<Option<Department>>;

    /// All departments, by name.
    async fn list_departments(&self) -> AppResult<Vec<Department>>;

    /// Insert a department. A duplicate name is `InvalidOperation`.
    async fn insert_department(&self, department: &Department) -> AppResult<Department>;

    /// Activate or deactivate a department.
    async fn set_department_active(&self, id: DepartmentId, active: bool)
    -> AppResult<Department>;

    /// Find a folder by ID, deleted or not.
    async fn find_folder(&self, id: FolderId) -> AppResult<Option<Folder>>;

    /// Find a document by ID, deleted or not.
    async fn find_document(&self, id: DocumentId) -> AppResult<Option<Document>>;

    /// Direct child folders of a parent, by name.
    async fn list_child_folders(
        &self,
        parent: ParentRef,
        include_deleted: bool,
    ) -> AppResult<Vec<Folder>>;

    /// Direct child documents of a parent, by name.
    async fn list_child_documents(
        &self,
        parent: ParentRef,
        include_deleted: bool,
    ) -> AppResult<Vec<Document>>;

    /// Every folder of a department, including trashed ones, by path.
    async fn list_department_folders(&self, department_id: DepartmentId) -> AppResult<Vec<Folder>>;

    /// Every document of a department, including trashed ones, by path.
    async fn list_department_documents(
        &self,
        department_id: DepartmentId,
    ) -> AppResult<Vec<Document>>;

    /// Insert a folder under a live parent whose path is the prefix of the
    /// folder's path.
    async fn insert_folder(&self, folder: &Folder) -> AppResult<Folder>;

    /// Insert a document together with its first version.
    async fn insert_document(
        &self,
        document: &Document,
        first_version: &DocumentVersion,
    ) -> AppResult<(Document, DocumentVersion)>;

    /// Rename or move a folder and rewrite the path prefix of its whole
    /// subtree.
    async fn relocate_folder(&self, change: &FolderRelocation) -> AppResult<RelocatedFolder>;

    /// Rename or move a document, projecting a rename onto its latest version.
    async fn relocate_document(&self, change: &DocumentRelocation) -> AppResult<Document>;

    /// Trash a live node and, for a folder, every live descendant, all with
    /// the same `deleted_at`. Returns the number of nodes marked.
    async fn mark_deleted(&self, node: NodeRef, deleted_at: DateTime<Utc>) -> AppResult<u64>;

    /// Restore a trashed node whose parent is live, plus the descendants
    /// trashed by the same deletion. Returns the number of nodes restored.
    async fn restore(&self, node: NodeRef) -> AppResult<u64>;

    /// Permanently remove a trashed node and its subtree. Returns the number
    /// of folders and documents removed.
    async fn purge(&self, node: NodeRef) -> AppResult<u64>;
}

/// The per-document version log.
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// The version currently marked latest.
    async fn find_latest_version(&self, document_id: DocumentId)
    -> AppResult<Option<DocumentVersion>>;

    /// A version by number.
    async fn find_version(
        &self,
        document_id: DocumentId,
        version_number: i32,
    ) -> AppResult<Option<DocumentVersion>>;

    /// All versions, latest first, then by descending number.
    async fn list_versions(&self, document_id: DocumentId) -> AppResult<Vec<DocumentVersion>>;

    /// Demote `expected_latest`, insert the new latest, and sync the
    /// document's cached content fields, atomically. A lost race is
    /// `InvariantViolation`.
    async fn append_version(&self, append: &VersionAppend)
    -> AppResult<(Document, DocumentVersion)>;
}

/// The full store the service layer depends on.
pub trait Store: HierarchyStore + VersionStore {}

impl<T: HierarchyStore + VersionStore> Store for T {}

/// Shared handle to the configured store.
pub type SharedStore = Arc<dyn Store>;

/// Open the store selected by `storage.backend`.
pub async fn open_store(config: &AppConfig) -> AppResult<SharedStore> {
    let store: SharedStore = match config.storage.backend {
        StoreBackend::Postgres => {
            info!("Initializing PostgreSQL store");
            let pool = DatabasePool::connect(&config.database).await?;
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            info!("Initializing in-memory store");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}

/// The path a node's parent must have for `path` to be correct.
pub(crate) fn parent_path_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(prefix, _)| prefix).unwrap_or("")
}
