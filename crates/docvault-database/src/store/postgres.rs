//! PostgreSQL store: one transaction per atomic operation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use docvault_core::error::AppError;
use docvault_core::result::AppResult;
use docvault_core::types::{DepartmentId, DocumentId, FolderId, NodeRef, ParentRef};
use docvault_entity::department::Department;
use docvault_entity::document::{Document, DocumentVersion};
use docvault_entity::folder::Folder;

use super::{
    DocumentRelocation, FolderRelocation, HierarchyStore, RelocatedFolder, VersionAppend,
    VersionStore, parent_path_of,
};
use crate::connection::DatabasePool;
use crate::repositories::{
    DepartmentRepository, DocumentRepository, FolderRepository, VersionRepository, map_db_error,
};

/// Store backed by the PostgreSQL repositories.
#[derive(Debug, Clone)]
pub struct PgStore {
    db: DatabasePool,
    departments: DepartmentRepository,
    folders: FolderRepository,
    documents: DocumentRepository,
    versions: VersionRepository,
}

/// What a locked parent looks like from inside a transaction.
struct ParentState {
    department_id: DepartmentId,
    path: String,
    is_deleted: bool,
    is_active: bool,
}

impl PgStore {
    /// Build a store over an open pool.
    pub fn new(db: DatabasePool) -> Self {
        let pool = db.pool().clone();
        Self {
            departments: DepartmentRepository::new(pool.clone()),
            folders: FolderRepository::new(pool.clone()),
            documents: DocumentRepository::new(pool.clone()),
            versions: VersionRepository::new(pool),
            db,
        }
    }

    /// The underlying pool.
    pub fn database(&self) -> &DatabasePool {
        &self.db
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.db.begin().await
    }

    async fn commit(tx: Transaction<'static, Postgres>) -> AppResult<()> {
        tx.commit()
            .await
            .map_err(map_db_error("Failed to commit transaction"))
    }

    /// Share-lock the parent row so it cannot be trashed, moved, or
    /// deactivated before this transaction ends.
    async fn lock_parent(&self, conn: &mut PgConnection, parent: ParentRef) -> AppResult<ParentState> {
        match parent {
            ParentRef::Department(id) => {
                let dept = self
                    .departments
                    .lock_for_share(conn, id)
                    .await?
                    .ok_or_else(|| {
                        AppError::dependency_unavailable(format!("Parent department {id} does not exist"))
                    })?;
                Ok(ParentState {
                    department_id: dept.id,
                    path: dept.path(),
                    is_deleted: false,
                    is_active: dept.is_active,
                })
            }
            ParentRef::Folder(id) => {
                let folder = self.folders.lock_for_share(conn, id).await?.ok_or_else(|| {
                    AppError::dependency_unavailable(format!("Parent folder {id} does not exist"))
                })?;
                Ok(ParentState {
                    department_id: folder.department_id,
                    path: folder.path,
                    is_deleted: folder.is_deleted,
                    is_active: true,
                })
            }
        }
    }

    /// Lock a parent that is about to hold a node at `path` in
    /// `department_id` and check it can. Only new arrivals need an active
    /// department.
    async fn lock_live_parent(
        &self,
        conn: &mut PgConnection,
        parent: ParentRef,
        department_id: DepartmentId,
        path: &str,
        require_active: bool,
    ) -> AppResult<()> {
        let state = self.lock_parent(conn, parent).await?;
        if state.is_deleted {
            return Err(AppError::invalid_operation(format!(
                "Parent {parent} is deleted"
            )));
        }
        if require_active && !state.is_active {
            return Err(AppError::invalid_operation(format!(
                "Department {} is inactive",
                state.department_id
            )));
        }
        if state.department_id != department_id || state.path != parent_path_of(path) {
            return Err(AppError::invariant_violation(format!(
                "Parent {parent} changed location concurrently"
            )));
        }
        Ok(())
    }

    async fn lock_folder(&self, conn: &mut PgConnection, id: FolderId) -> AppResult<Folder> {
        self.folders
            .lock_for_update(conn, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))
    }

    async fn lock_document(&self, conn: &mut PgConnection, id: DocumentId) -> AppResult<Document> {
        self.documents
            .lock_for_update(conn, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Document {id} not found")))
    }

    /// Share-lock the parent a node is leaving and check the node still
    /// sits where its stored path says.
    async fn lock_current_parent(
        &self,
        conn: &mut PgConnection,
        parent: ParentRef,
        node_path: &str,
    ) -> AppResult<()> {
        let state = self.lock_parent(conn, parent).await?;
        if state.path != parent_path_of(node_path) {
            return Err(AppError::invariant_violation(format!(
                "Parent {parent} changed location concurrently"
            )));
        }
        Ok(())
    }

    /// Exclusively lock the subtree below an already locked `root`. Returns
    /// the folder ids (root first) and the ids of every document inside
    /// them. A subtree that changed between collecting and locking it is a
    /// lost race.
    async fn lock_subtree(
        &self,
        conn: &mut PgConnection,
        root: FolderId,
    ) -> AppResult<(Vec<Uuid>, Vec<Uuid>)> {
        let mut folder_ids = vec![root.into_uuid()];
        folder_ids.extend(self.folders.subtree_ids(conn, root).await?);
        let locked = self.folders.lock_many(conn, &folder_ids[1..]).await?;

        let mut current = vec![root.into_uuid()];
        current.extend(self.folders.subtree_ids(conn, root).await?);
        if !same_ids(&folder_ids[1..], &locked) || !same_ids(&folder_ids, &current) {
            return Err(AppError::invariant_violation(format!(
                "Subtree of folder {root} changed concurrently"
            )));
        }

        let document_ids = self.documents.ids_in_folders(conn, &folder_ids).await?;
        let locked = self.documents.lock_many(conn, &document_ids).await?;
        let current = self.documents.ids_in_folders(conn, &folder_ids).await?;
        if !same_ids(&document_ids, &locked) || !same_ids(&document_ids, &current) {
            return Err(AppError::invariant_violation(format!(
                "Documents below folder {root} changed concurrently"
            )));
        }
        Ok((folder_ids, document_ids))
    }
}

#[async_trait]
impl HierarchyStore for PgStore {
    async fn find_department(&self, id: DepartmentId) -> AppResult<Option<Department>> {
        self.departments.find_by_id(id).await
    }

    async fn find_department_by_name(&self, name: &str) -> AppResult<Option<Department>> {
        self.departments.find_by_name(name).await
    }

    async fn list_departments(&self) -> AppResult<Vec<Department>> {
        self.departments.list().await
    }

    async fn insert_department(&self, department: &Department) -> AppResult<Department> {
        self.departments.insert(department).await
    }

    async fn set_department_active(
        &self,
        id: DepartmentId,
        active: bool,
    ) -> AppResult<Department> {
        self.departments
            .set_active(id, active)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Department {id} not found")))
    }

    async fn find_folder(&self, id: FolderId) -> AppResult<Option<Folder>> {
        self.folders.find_by_id(id).await
    }

    async fn find_document(&self, id: DocumentId) -> AppResult<Option<Document>> {
        self.documents.find_by_id(id).await
    }

    async fn list_child_folders(
        &self,
        parent: ParentRef,
        include_deleted: bool,
    ) -> AppResult<Vec<Folder>> {
        self.folders.find_children(parent, include_deleted).await
    }

    async fn list_child_documents(
        &self,
        parent: ParentRef,
        include_deleted: bool,
    ) -> AppResult<Vec<Document>> {
        self.documents.find_children(parent, include_deleted).await
    }

    async fn list_department_folders(&self, department_id: DepartmentId) -> AppResult<Vec<Folder>> {
        self.folders.find_by_department(department_id).await
    }

    async fn list_department_documents(
        &self,
        department_id: DepartmentId,
    ) -> AppResult<Vec<Document>> {
        self.documents.find_by_department(department_id).await
    }

    async fn insert_folder(&self, folder: &Folder) -> AppResult<Folder> {
        let mut tx = self.begin().await?;
        self.lock_live_parent(&mut tx, folder.parent, folder.department_id, &folder.path, true)
            .await?;
        let created = self.folders.insert(&mut tx, folder).await?;
        Self::commit(tx).await?;
        Ok(created)
    }

    async fn insert_document(
        &self,
        document: &Document,
        first_version: &DocumentVersion,
    ) -> AppResult<(Document, DocumentVersion)> {
        let mut tx = self.begin().await?;
        self.lock_live_parent(&mut tx, document.parent, document.department_id, &document.path, true)
            .await?;
        let created = self.documents.insert(&mut tx, document).await?;
        let version = self.versions.insert(&mut tx, first_version).await?;
        Self::commit(tx).await?;
        Ok((created, version))
    }

    async fn relocate_folder(&self, change: &FolderRelocation) -> AppResult<RelocatedFolder> {
        let mut tx = self.begin().await?;

        let folder = self.lock_folder(&mut tx, change.folder_id).await?;
        if folder.is_deleted {
            return Err(AppError::invalid_operation(format!(
                "Folder {} is deleted",
                folder.id
            )));
        }
        if folder.path != change.old_path {
            return Err(AppError::invariant_violation(format!(
                "Folder {} moved concurrently",
                folder.id
            )));
        }

        let arriving = change.parent != folder.parent;
        if arriving {
            self.lock_current_parent(&mut tx, folder.parent, &folder.path).await?;
        }
        self.lock_live_parent(&mut tx, change.parent, change.department_id, &change.path, arriving)
            .await?;

        let (folder_ids, _) = self.lock_subtree(&mut tx, folder.id).await?;
        if let Some(target) = change.parent.as_folder() {
            if folder_ids.contains(&target.into_uuid()) {
                return Err(AppError::invalid_operation(format!(
                    "Cannot move folder {} into itself or its own subtree",
                    folder.id
                )));
            }
        }

        let updated = self
            .folders
            .update_location(
                &mut tx,
                folder.id,
                change.department_id,
                change.parent,
                &change.name,
                &change.path,
            )
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {} not found", folder.id)))?;

        let mut descendants_updated = 0;
        let descendants = &folder_ids[1..];
        if !descendants.is_empty() {
            descendants_updated += self
                .folders
                .rewrite_paths(
                    &mut tx,
                    descendants,
                    change.department_id,
                    &change.old_path,
                    &change.path,
                )
                .await?;
        }
        descendants_updated += self
            .documents
            .rewrite_paths_in_folders(
                &mut tx,
                &folder_ids,
                change.department_id,
                &change.old_path,
                &change.path,
            )
            .await?;

        Self::commit(tx).await?;
        debug!(
            folder_id = %folder.id,
            descendants_updated,
            "Rewrote subtree paths"
        );
        Ok(RelocatedFolder {
            folder: updated,
            descendants_updated,
        })
    }

    async fn relocate_document(&self, change: &DocumentRelocation) -> AppResult<Document> {
        let mut tx = self.begin().await?;

        let document = self.lock_document(&mut tx, change.document_id).await?;
        if document.is_deleted {
            return Err(AppError::invalid_operation(format!(
                "Document {} is deleted",
                document.id
            )));
        }
        if document.path != change.old_path {
            return Err(AppError::invariant_violation(format!(
                "Document {} moved concurrently",
                document.id
            )));
        }

        let arriving = change.parent != document.parent;
        if arriving {
            self.lock_current_parent(&mut tx, document.parent, &document.path).await?;
        }
        self.lock_live_parent(&mut tx, change.parent, change.department_id, &change.path, arriving)
            .await?;

        let updated = self
            .documents
            .update_location(
                &mut tx,
                document.id,
                change.department_id,
                change.parent,
                &change.name,
                &change.original_name,
                &change.path,
            )
            .await?
            .ok_or_else(|| AppError::not_found(format!("Document {} not found", document.id)))?;

        if let Some(projection) = &change.latest_projection {
            let projected = self
                .versions
                .project_location(
                    &mut tx,
                    projection.version_id,
                    &projection.name,
                    &projection.original_name,
                    &projection.path_at_creation,
                )
                .await?;
            if !projected {
                return Err(AppError::invariant_violation(format!(
                    "Version {} of document {} is no longer latest",
                    projection.version_id, document.id
                )));
            }
        }

        Self::commit(tx).await?;
        Ok(updated)
    }

    async fn mark_deleted(&self, node: NodeRef, deleted_at: DateTime<Utc>) -> AppResult<u64> {
        let mut tx = self.begin().await?;
        let affected = match node {
            NodeRef::Folder(id) => {
                let folder = self.lock_folder(&mut tx, id).await?;
                if folder.is_deleted {
                    return Err(AppError::invalid_operation(format!(
                        "Folder {id} is already deleted"
                    )));
                }
                let (folder_ids, document_ids) = self.lock_subtree(&mut tx, id).await?;
                let folders = self
                    .folders
                    .mark_deleted(&mut tx, &folder_ids, deleted_at)
                    .await?;
                let documents = self
                    .documents
                    .mark_deleted(&mut tx, &document_ids, deleted_at)
                    .await?;
                folders + documents
            }
            NodeRef::Document(id) => {
                let document = self.lock_document(&mut tx, id).await?;
                if document.is_deleted {
                    return Err(AppError::invalid_operation(format!(
                        "Document {id} is already deleted"
                    )));
                }
                self.documents
                    .mark_deleted(&mut tx, &[id.into_uuid()], deleted_at)
                    .await?
            }
        };
        Self::commit(tx).await?;
        Ok(affected)
    }

    async fn restore(&self, node: NodeRef) -> AppResult<u64> {
        let mut tx = self.begin().await?;
        let (parent, deleted_at) = match node {
            NodeRef::Folder(id) => {
                let folder = self.lock_folder(&mut tx, id).await?;
                (folder.parent, folder.deleted_at.filter(|_| folder.is_deleted))
            }
            NodeRef::Document(id) => {
                let document = self.lock_document(&mut tx, id).await?;
                (
                    document.parent,
                    document.deleted_at.filter(|_| document.is_deleted),
                )
            }
        };
        let deleted_at =
            deleted_at.ok_or_else(|| AppError::invalid_operation(format!("{node} is not deleted")))?;

        let state = self.lock_parent(&mut tx, parent).await?;
        if state.is_deleted {
            return Err(AppError::invalid_operation(format!(
                "Cannot restore {node}: parent {parent} is still deleted"
            )));
        }

        let restored = match node {
            NodeRef::Folder(id) => {
                let (folder_ids, document_ids) = self.lock_subtree(&mut tx, id).await?;
                let folders = self.folders.restore(&mut tx, &folder_ids, deleted_at).await?;
                let documents = self
                    .documents
                    .restore(&mut tx, &document_ids, deleted_at)
                    .await?;
                folders + documents
            }
            NodeRef::Document(id) => {
                self.documents
                    .restore(&mut tx, &[id.into_uuid()], deleted_at)
                    .await?
            }
        };
        Self::commit(tx).await?;
        Ok(restored)
    }

    async fn purge(&self, node: NodeRef) -> AppResult<u64> {
        let mut tx = self.begin().await?;
        let removed = match node {
            NodeRef::Folder(id) => {
                let folder = self.lock_folder(&mut tx, id).await?;
                if !folder.is_deleted {
                    return Err(AppError::invalid_operation(format!(
                        "Folder {id} must be deleted before it is purged"
                    )));
                }
                let (folder_ids, document_ids) = self.lock_subtree(&mut tx, id).await?;
                let documents = self.documents.delete_many(&mut tx, &document_ids).await?;
                let folders = self.folders.delete_many(&mut tx, &folder_ids).await?;
                documents + folders
            }
            NodeRef::Document(id) => {
                let document = self.lock_document(&mut tx, id).await?;
                if !document.is_deleted {
                    return Err(AppError::invalid_operation(format!(
                        "Document {id} must be deleted before it is purged"
                    )));
                }
                self.documents
                    .delete_many(&mut tx, &[id.into_uuid()])
                    .await?
            }
        };
        Self::commit(tx).await?;
        Ok(removed)
    }
}

#[async_trait]
impl VersionStore for PgStore {
    async fn find_latest_version(
        &self,
        document_id: DocumentId,
    ) -> AppResult<Option<DocumentVersion>> {
        self.versions.find_latest(document_id).await
    }

    async fn find_version(
        &self,
        document_id: DocumentId,
        version_number: i32,
    ) -> AppResult<Option<DocumentVersion>> {
        self.versions.find_by_number(document_id, version_number).await
    }

    async fn list_versions(&self, document_id: DocumentId) -> AppResult<Vec<DocumentVersion>> {
        self.versions.find_by_document(document_id).await
    }

    async fn append_version(
        &self,
        append: &VersionAppend,
    ) -> AppResult<(Document, DocumentVersion)> {
        let document_id = append.version.document_id;
        let mut tx = self.begin().await?;

        // Serializes appends on one document; the partial unique index
        // still rejects a writer that bypasses this path.
        let document = self.lock_document(&mut tx, document_id).await?;
        if document.is_deleted {
            return Err(AppError::invalid_operation(format!(
                "Document {document_id} is deleted"
            )));
        }

        let max = self.versions.max_number(&mut tx, document_id).await?;
        if append.version.version_number != max + 1 {
            return Err(AppError::invariant_violation(format!(
                "Document {document_id} is at version {max}, cannot append version {}",
                append.version.version_number
            )));
        }

        if !self
            .versions
            .demote(&mut tx, document_id, append.expected_latest)
            .await?
        {
            return Err(AppError::invariant_violation(format!(
                "Version {} of document {document_id} is no longer latest",
                append.expected_latest
            )));
        }

        let version = self.versions.insert(&mut tx, &append.version).await?;
        let document = self
            .documents
            .sync_latest(&mut tx, &version)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Document {document_id} not found")))?;

        Self::commit(tx).await?;
        Ok((document, version))
    }
}

fn same_ids(left: &[Uuid], right: &[Uuid]) -> bool {
    let mut left = left.to_vec();
    let mut right = right.to_vec();
    left.sort_unstable();
    right.sort_unstable();
    left == right
}
