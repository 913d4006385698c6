//! Process-local store.
//!
//! All state sits behind one `RwLock`. Each trait method takes the lock
//! once and validates everything before it mutates anything, so a failed
//! operation leaves no trace and readers never see half a cascade.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

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

/// In-memory store used by tests and the `memory` backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

#[derive(Debug, Default)]
struct State {
    departments: HashMap<DepartmentId, Department>,
    folders: HashMap<FolderId, Folder>,
    documents: HashMap<DocumentId, Document>,
    /// Per-document version arena, ordered by version number.
    versions: HashMap<DocumentId, Vec<DocumentVersion>>,
}

struct ParentState {
    department_id: DepartmentId,
    path: String,
    is_deleted: bool,
    is_active: bool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl State {
    fn parent_state(&self, parent: ParentRef) -> AppResult<ParentState> {
        match parent {
            ParentRef::Department(id) => {
                let dept = self.departments.get(&id).ok_or_else(|| {
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
                let folder = self.folders.get(&id).ok_or_else(|| {
                    AppError::dependency_unavailable(format!("Parent folder {id} does not exist"))
                })?;
                Ok(ParentState {
                    department_id: folder.department_id,
                    path: folder.path.clone(),
                    is_deleted: folder.is_deleted,
                    is_active: true,
                })
            }
        }
    }

    fn require_live_parent(
        &self,
        parent: ParentRef,
        department_id: DepartmentId,
        path: &str,
        require_active: bool,
    ) -> AppResult<()> {
        let state = self.parent_state(parent)?;
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

    fn folder(&self, id: FolderId) -> AppResult<&Folder> {
        self.folders
            .get(&id)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))
    }

    fn document(&self, id: DocumentId) -> AppResult<&Document> {
        self.documents
            .get(&id)
            .ok_or_else(|| AppError::not_found(format!("Document {id} not found")))
    }

    /// Every folder strictly below `root`, found by walking parent links.
    fn subtree_folders(&self, root: FolderId) -> Vec<FolderId> {
        let mut found = Vec::new();
        let mut queue = VecDeque::from([root]);
        while let Some(current) = queue.pop_front() {
            for folder in self.folders.values() {
                if folder.parent == ParentRef::Folder(current) {
                    found.push(folder.id);
                    queue.push_back(folder.id);
                }
            }
        }
        found
    }

    /// `root` plus its subtree, and every document directly inside them.
    fn collect_subtree(&self, root: FolderId) -> (Vec<FolderId>, Vec<DocumentId>) {
        let mut folder_ids = vec![root];
        folder_ids.extend(self.subtree_folders(root));
        let containing: HashSet<FolderId> = folder_ids.iter().copied().collect();
        let document_ids = self
            .documents
            .values()
            .filter(|d| d.parent.as_folder().is_some_and(|f| containing.contains(&f)))
            .map(|d| d.id)
            .collect();
        (folder_ids, document_ids)
    }

    fn node_deleted_at(&self, node: NodeRef) -> AppResult<(ParentRef, Option<DateTime<Utc>>)> {
        match node {
            NodeRef::Folder(id) => {
                let folder = self.folder(id)?;
                Ok((folder.parent, folder.deleted_at.filter(|_| folder.is_deleted)))
            }
            NodeRef::Document(id) => {
                let document = self.document(id)?;
                Ok((
                    document.parent,
                    document.deleted_at.filter(|_| document.is_deleted),
                ))
            }
        }
    }

    fn subtree_of(&self, node: NodeRef) -> (Vec<FolderId>, Vec<DocumentId>) {
        match node {
            NodeRef::Folder(id) => self.collect_subtree(id),
            NodeRef::Document(id) => (Vec::new(), vec![id]),
        }
    }
}

fn rewrite_prefix(path: &mut String, old_prefix: &str, new_prefix: &str) {
    if let Some(rest) = path.strip_prefix(old_prefix) {
        *path = format!("{new_prefix}{rest}");
    }
}

#[async_trait]
impl HierarchyStore for MemoryStore {
    async fn find_department(&self, id: DepartmentId) -> AppResult<Option<Department>> {
        Ok(self.state.read().await.departments.get(&id).cloned())
    }

    async fn find_department_by_name(&self, name: &str) -> AppResult<Option<Department>> {
        let state = self.state.read().await;
        Ok(state.departments.values().find(|d| d.name == name).cloned())
    }

    async fn list_departments(&self) -> AppResult<Vec<Department>> {
        let state = self.state.read().await;
        let mut departments: Vec<Department> = state.departments.values().cloned().collect();
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(departments)
    }

    async fn insert_department(&self, department: &Department) -> AppResult<Department> {
        let mut state = self.state.write().await;
        if state.departments.values().any(|d| d.name == department.name) {
            return Err(AppError::invalid_operation(format!(
                "Department '{}' already exists",
                department.name
            )));
        }
        state.departments.insert(department.id, department.clone());
        Ok(department.clone())
    }

    async fn set_department_active(
        &self,
        id: DepartmentId,
        active: bool,
    ) -> AppResult<Department> {
        let mut state = self.state.write().await;
        let dept = state
            .departments
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Department {id} not found")))?;
        dept.is_active = active;
        dept.updated_at = Utc::now();
        Ok(dept.clone())
    }

    async fn find_folder(&self, id: FolderId) -> AppResult<Option<Folder>> {
        Ok(self.state.read().await.folders.get(&id).cloned())
    }

    async fn find_document(&self, id: DocumentId) -> AppResult<Option<Document>> {
        Ok(self.state.read().await.documents.get(&id).cloned())
    }

    async fn list_child_folders(
        &self,
        parent: ParentRef,
        include_deleted: bool,
    ) -> AppResult<Vec<Folder>> {
        let state = self.state.read().await;
        let mut folders: Vec<Folder> = state
            .folders
            .values()
            .filter(|f| f.parent == parent && (include_deleted || !f.is_deleted))
            .cloned()
            .collect();
        folders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(folders)
    }

    async fn list_child_documents(
        &self,
        parent: ParentRef,
        include_deleted: bool,
    ) -> AppResult<Vec<Document>> {
        let state = self.state.read().await;
        let mut documents: Vec<Document> = state
            .documents
            .values()
            .filter(|d| d.parent == parent && (include_deleted || !d.is_deleted))
            .cloned()
            .collect();
        documents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(documents)
    }

    async fn list_department_folders(&self, department_id: DepartmentId) -> AppResult<Vec<Folder>> {
        let state = self.state.read().await;
        let mut folders: Vec<Folder> = state
            .folders
            .values()
            .filter(|f| f.department_id == department_id)
            .cloned()
            .collect();
        folders.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(folders)
    }

    async fn list_department_documents(
        &self,
        department_id: DepartmentId,
    ) -> AppResult<Vec<Document>> {
        let state = self.state.read().await;
        let mut documents: Vec<Document> = state
            .documents
            .values()
            .filter(|d| d.department_id == department_id)
            .cloned()
            .collect();
        documents.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(documents)
    }

    async fn insert_folder(&self, folder: &Folder) -> AppResult<Folder> {
        let mut state = self.state.write().await;
        state.require_live_parent(folder.parent, folder.department_id, &folder.path, true)?;
        state.folders.insert(folder.id, folder.clone());
        Ok(folder.clone())
    }

    async fn insert_document(
        &self,
        document: &Document,
        first_version: &DocumentVersion,
    ) -> AppResult<(Document, DocumentVersion)> {
        let mut state = self.state.write().await;
        state.require_live_parent(document.parent, document.department_id, &document.path, true)?;
        if state.versions.contains_key(&document.id) {
            return Err(AppError::invariant_violation(format!(
                "Document {} already has a version chain",
                document.id
            )));
        }
        state.documents.insert(document.id, document.clone());
        state
            .versions
            .insert(document.id, vec![first_version.clone()]);
        Ok((document.clone(), first_version.clone()))
    }

    async fn relocate_folder(&self, change: &FolderRelocation) -> AppResult<RelocatedFolder> {
        let mut state = self.state.write().await;

        let folder = state.folder(change.folder_id)?;
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
        state.require_live_parent(change.parent, change.department_id, &change.path, arriving)?;

        let (folder_ids, document_ids) = state.collect_subtree(change.folder_id);
        if let Some(target) = change.parent.as_folder() {
            if folder_ids.contains(&target) {
                return Err(AppError::invalid_operation(format!(
                    "Cannot move folder {} into itself or its own subtree",
                    change.folder_id
                )));
            }
        }

        let now = Utc::now();
        let mut descendants_updated = 0u64;
        for id in &folder_ids {
            let Some(f) = state.folders.get_mut(id) else {
                continue;
            };
            if f.id == change.folder_id {
                f.parent = change.parent;
                f.name = change.name.clone();
                f.path = change.path.clone();
            } else {
                rewrite_prefix(&mut f.path, &change.old_path, &change.path);
                descendants_updated += 1;
            }
            f.department_id = change.department_id;
            f.updated_at = now;
        }
        for id in &document_ids {
            if let Some(d) = state.documents.get_mut(id) {
                rewrite_prefix(&mut d.path, &change.old_path, &change.path);
                d.department_id = change.department_id;
                d.updated_at = now;
                descendants_updated += 1;
            }
        }

        let folder = state.folder(change.folder_id)?.clone();
        debug!(folder_id = %folder.id, descendants_updated, "Rewrote subtree paths");
        Ok(RelocatedFolder {
            folder,
            descendants_updated,
        })
    }

    async fn relocate_document(&self, change: &DocumentRelocation) -> AppResult<Document> {
        let mut state = self.state.write().await;

        let document = state.document(change.document_id)?;
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
        state.require_live_parent(change.parent, change.department_id, &change.path, arriving)?;

        let projection_index = match &change.latest_projection {
            Some(projection) => {
                let index = state
                    .versions
                    .get(&change.document_id)
                    .and_then(|chain| {
                        chain
                            .iter()
                            .position(|v| v.id == projection.version_id && v.is_latest)
                    })
                    .ok_or_else(|| {
                        AppError::invariant_violation(format!(
                            "Version {} of document {} is no longer latest",
                            projection.version_id, change.document_id
                        ))
                    })?;
                Some((index, projection))
            }
            None => None,
        };

        if let Some((index, projection)) = projection_index {
            if let Some(version) = state
                .versions
                .get_mut(&change.document_id)
                .and_then(|chain| chain.get_mut(index))
            {
                version.name = projection.name.clone();
                version.original_name = projection.original_name.clone();
                version.path_at_creation = projection.path_at_creation.clone();
            }
        }

        let document = state
            .documents
            .get_mut(&change.document_id)
            .ok_or_else(|| AppError::not_found(format!("Document {} not found", change.document_id)))?;
        document.department_id = change.department_id;
        document.parent = change.parent;
        document.name = change.name.clone();
        document.original_name = change.original_name.clone();
        document.path = change.path.clone();
        document.updated_at = Utc::now();
        Ok(document.clone())
    }

    async fn mark_deleted(&self, node: NodeRef, deleted_at: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let (_, current) = state.node_deleted_at(node)?;
        if current.is_some() {
            return Err(AppError::invalid_operation(format!("{node} is already deleted")));
        }

        let (folder_ids, document_ids) = state.subtree_of(node);
        let mut affected = 0u64;
        for id in &folder_ids {
            if let Some(f) = state.folders.get_mut(id).filter(|f| !f.is_deleted) {
                f.is_deleted = true;
                f.deleted_at = Some(deleted_at);
                affected += 1;
            }
        }
        for id in &document_ids {
            if let Some(d) = state.documents.get_mut(id).filter(|d| !d.is_deleted) {
                d.is_deleted = true;
                d.deleted_at = Some(deleted_at);
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn restore(&self, node: NodeRef) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let (parent, deleted_at) = state.node_deleted_at(node)?;
        let deleted_at =
            deleted_at.ok_or_else(|| AppError::invalid_operation(format!("{node} is not deleted")))?;
        if state.parent_state(parent)?.is_deleted {
            return Err(AppError::invalid_operation(format!(
                "Cannot restore {node}: parent {parent} is still deleted"
            )));
        }

        let (folder_ids, document_ids) = state.subtree_of(node);
        let mut restored = 0u64;
        for id in &folder_ids {
            if let Some(f) = state
                .folders
                .get_mut(id)
                .filter(|f| f.is_deleted && f.deleted_at == Some(deleted_at))
            {
                f.is_deleted = false;
                f.deleted_at = None;
                restored += 1;
            }
        }
        for id in &document_ids {
            if let Some(d) = state
                .documents
                .get_mut(id)
                .filter(|d| d.is_deleted && d.deleted_at == Some(deleted_at))
            {
                d.is_deleted = false;
                d.deleted_at = None;
                restored += 1;
            }
        }
        Ok(restored)
    }

    async fn purge(&self, node: NodeRef) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let (_, deleted_at) = state.node_deleted_at(node)?;
        if deleted_at.is_none() {
            return Err(AppError::invalid_operation(format!(
                "{node} must be deleted before it is purged"
            )));
        }

        let (folder_ids, document_ids) = state.subtree_of(node);
        let mut removed = 0u64;
        for id in &document_ids {
            if state.documents.remove(id).is_some() {
                state.versions.remove(id);
                removed += 1;
            }
        }
        for id in &folder_ids {
            if state.folders.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl VersionStore for MemoryStore {
    async fn find_latest_version(
        &self,
        document_id: DocumentId,
    ) -> AppResult<Option<DocumentVersion>> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .get(&document_id)
            .and_then(|chain| chain.iter().find(|v| v.is_latest))
            .cloned())
    }

    async fn find_version(
        &self,
        document_id: DocumentId,
        version_number: i32,
    ) -> AppResult<Option<DocumentVersion>> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .get(&document_id)
            .and_then(|chain| chain.iter().find(|v| v.version_number == version_number))
            .cloned())
    }

    async fn list_versions(&self, document_id: DocumentId) -> AppResult<Vec<DocumentVersion>> {
        let state = self.state.read().await;
        let mut versions = state.versions.get(&document_id).cloned().unwrap_or_default();
        versions.sort_by(|a, b| {
            b.is_latest
                .cmp(&a.is_latest)
                .then(b.version_number.cmp(&a.version_number))
        });
        Ok(versions)
    }

    async fn append_version(
        &self,
        append: &VersionAppend,
    ) -> AppResult<(Document, DocumentVersion)> {
        let document_id = append.version.document_id;
        let mut state = self.state.write().await;

        if state.document(document_id)?.is_deleted {
            return Err(AppError::invalid_operation(format!(
                "Document {document_id} is deleted"
            )));
        }

        let chain = state
            .versions
            .get_mut(&document_id)
            .ok_or_else(|| AppError::not_found(format!("Document {document_id} has no versions")))?;
        let max = chain.iter().map(|v| v.version_number).max().unwrap_or(0);
        if append.version.version_number != max + 1 {
            return Err(AppError::invariant_violation(format!(
                "Document {document_id} is at version {max}, cannot append version {}",
                append.version.version_number
            )));
        }
        let previous = chain
            .iter_mut()
            .find(|v| v.id == append.expected_latest && v.is_latest)
            .ok_or_else(|| {
                AppError::invariant_violation(format!(
                    "Version {} of document {document_id} is no longer latest",
                    append.expected_latest
                ))
            })?;

        previous.is_latest = false;
        let mut version = append.version.clone();
        version.is_latest = true;
        chain.push(version.clone());

        let document = state
            .documents
            .get_mut(&document_id)
            .ok_or_else(|| AppError::not_found(format!("Document {document_id} not found")))?;
        document.file_url = version.file_url.clone();
        document.size_bytes = version.size_bytes;
        document.mime_type = version.mime_type.clone();
        document.current_version_id = version.id;
        document.current_version = version.version_number;
        document.updated_at = Utc::now();
        Ok((document.clone(), version))
    }
}
