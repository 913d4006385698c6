//! Lifecycle controller: rename, move, re-upload, revert, delete, restore.

use chrono::Utc;
use tracing::info;
use validator::Validate;

use docvault_core::error::{AppError, ErrorKind};
use docvault_core::events::LifecycleEvent;
use docvault_core::result::AppResult;
use docvault_core::types::{
    DepartmentId, DocumentId, DocumentVersionId, FolderId, NodeRef, PageRequest, PageResponse,
    ParentRef,
};
use docvault_database::{HierarchyStore, SharedStore};
use docvault_entity::document::model::file_name;
use docvault_entity::document::{Document, FileMetadata};
use docvault_entity::folder::Folder;
use docvault_entity::node::{Node, TrashItem};

use super::outcome::LifecycleOutcome;
use crate::context::RequestContext;
use crate::hierarchy::PathHierarchyStore;
use crate::retry::with_conflict_retry;
use crate::version::{AppendedVersion, VersionChain, VersionedDocument};

/// Orchestrates the path hierarchy and the version chain.
///
/// Every mutation is a single store operation (or a retried sequence of
/// them after a lost race); preconditions are checked here first so the
/// common failures come back with a precise error, and re-checked by the
/// store under its own lock.
#[derive(Debug, Clone)]
pub struct LifecycleController {
    store: SharedStore,
    hierarchy: PathHierarchyStore,
    versions: VersionChain,
}

impl LifecycleController {
    /// Creates a new lifecycle controller.
    pub fn new(store: SharedStore, hierarchy: PathHierarchyStore, versions: VersionChain) -> Self {
        Self {
            store,
            hierarchy,
            versions,
        }
    }

    /// The path hierarchy this controller drives.
    pub fn hierarchy(&self) -> &PathHierarchyStore {
        &self.hierarchy
    }

    /// The version chain this controller drives.
    pub fn versions(&self) -> &VersionChain {
        &self.versions
    }

    fn retries(&self) -> u32 {
        self.versions.config().conflict_retries
    }

    /// Load a folder or document, deleted or not.
    pub async fn get_node(&self, node: NodeRef) -> AppResult<Node> {
        match node {
            NodeRef::Folder(id) => self.folder(id).await.map(Node::from),
            NodeRef::Document(id) => self.document(id).await.map(Node::from),
        }
    }

    async fn folder(&self, id: FolderId) -> AppResult<Folder> {
        self.store
            .find_folder(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))
    }

    async fn document(&self, id: DocumentId) -> AppResult<Document> {
        self.store
            .find_document(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Document {id} not found")))
    }

    async fn live_node(&self, node: NodeRef) -> AppResult<Node> {
        let current = self.get_node(node).await?;
        if current.is_deleted() {
            return Err(AppError::invalid_operation(format!("{node} is deleted")));
        }
        Ok(current)
    }

    /// Create a folder under a live parent.
    pub async fn create_folder(
        &self,
        ctx: &RequestContext,
        parent: ParentRef,
        name: &str,
    ) -> AppResult<LifecycleOutcome<Folder>> {
        let name = self.hierarchy.validate_name(name)?;
        let folder = with_conflict_retry("create_folder", self.retries(), || {
            self.create_folder_once(ctx, parent, &name)
        })
        .await?;

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder.id,
            path = %folder.path,
            "Folder created"
        );
        let event = LifecycleEvent::FolderCreated {
            folder_id: folder.id,
            parent,
            path: folder.path.clone(),
        };
        Ok(LifecycleOutcome::new(folder, event))
    }

    async fn create_folder_once(
        &self,
        ctx: &RequestContext,
        parent: ParentRef,
        name: &str,
    ) -> AppResult<Folder> {
        let target = self.hierarchy.resolve_target(parent).await?;
        self.hierarchy.check_depth(&target, 0)?;

        let now = Utc::now();
        let folder = Folder {
            id: FolderId::new(),
            department_id: target.department_id,
            parent,
            name: name.to_string(),
            path: self.hierarchy.compute_path(&target, name),
            is_deleted: false,
            deleted_at: None,
            created_by: ctx.user_id,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_folder(&folder).await
    }

    /// Create a document and its version 1 from a finished upload.
    pub async fn create_document(
        &self,
        ctx: &RequestContext,
        parent: ParentRef,
        upload: &FileMetadata,
    ) -> AppResult<LifecycleOutcome<VersionedDocument>> {
        upload
            .validate()
            .map_err(|e| AppError::validation(format!("Invalid upload metadata: {e}")))?;
        let name = self.hierarchy.validate_name(&upload.stem())?;

        let created = with_conflict_retry("create_document", self.retries(), || {
            self.create_document_once(ctx, parent, &name, upload)
        })
        .await?;

        info!(
            user_id = %ctx.user_id,
            document_id = %created.document.id,
            path = %created.document.path,
            "Document created"
        );
        let event = LifecycleEvent::DocumentCreated {
            document_id: created.document.id,
            parent,
            path: created.document.path.clone(),
            version_number: created.version.version_number,
        };
        Ok(LifecycleOutcome::new(created, event))
    }

    async fn create_document_once(
        &self,
        ctx: &RequestContext,
        parent: ParentRef,
        name: &str,
        upload: &FileMetadata,
    ) -> AppResult<VersionedDocument> {
        let target = self.hierarchy.resolve_target(parent).await?;
        let extension = upload.normalized_extension();
        let display = file_name(name, &extension);

        let now = Utc::now();
        let document = Document {
            id: DocumentId::new(),
            department_id: target.department_id,
            parent,
            name: name.to_string(),
            original_name: upload.original_name.clone(),
            path: self.hierarchy.compute_path(&target, &display),
            extension,
            mime_type: upload.mime_type.clone(),
            size_bytes: upload.size_bytes,
            file_url: upload.file_url.clone(),
            current_version_id: DocumentVersionId::new(),
            current_version: 1,
            is_deleted: false,
            deleted_at: None,
            created_by: ctx.user_id,
            created_at: now,
            updated_at: now,
        };
        let first = self.versions.first_version(ctx, &document, upload);
        let (document, version) = self.store.insert_document(&document, &first).await?;
        Ok(VersionedDocument { document, version })
    }

    /// Rename a live node. A folder's whole subtree follows; a document's
    /// latest version takes the new name too.
    pub async fn rename(
        &self,
        ctx: &RequestContext,
        node: NodeRef,
        new_name: &str,
    ) -> AppResult<LifecycleOutcome<Node>> {
        let new_name = self.hierarchy.validate_name(new_name)?;
        let (before, after, descendants_updated) =
            with_conflict_retry("rename", self.retries(), || {
                self.rename_once(node, &new_name)
            })
            .await?;

        info!(
            user_id = %ctx.user_id,
            node = %node,
            old_path = %before.path(),
            new_path = %after.path(),
            descendants_updated,
            "Node renamed"
        );
        let event = LifecycleEvent::Renamed {
            node,
            old_name: before.name().to_string(),
            new_name: after.name().to_string(),
            old_path: before.path().to_string(),
            new_path: after.path().to_string(),
            descendants_updated,
        };
        Ok(LifecycleOutcome::new(after, event))
    }

    async fn rename_once(&self, node: NodeRef, new_name: &str) -> AppResult<(Node, Node, u64)> {
        match self.live_node(node).await? {
            Node::Folder(folder) => {
                let relocated = self.hierarchy.cascade_rename(&folder, new_name).await?;
                Ok((
                    Node::Folder(folder),
                    Node::Folder(relocated.folder),
                    relocated.descendants_updated,
                ))
            }
            Node::Document(document) => {
                let name = strip_extension(new_name, &document.extension);
                if name.is_empty() {
                    return Err(AppError::validation("Name must not be empty"));
                }
                let parent = self.hierarchy.resolve_current(document.parent).await?;
                let original_name = file_name(name, &document.extension);
                let mut change =
                    self.hierarchy
                        .plan_document(&document, &parent, name, &original_name);
                change.latest_projection = Some(self.versions.rename_projection(&change).await?);
                let updated = self.hierarchy.relocate_document(&change).await?;
                Ok((Node::Document(document), Node::Document(updated), 0))
            }
        }
    }

    /// Move a live node under another live parent, possibly in another
    /// department.
    pub async fn move_to(
        &self,
        ctx: &RequestContext,
        node: NodeRef,
        new_parent: ParentRef,
    ) -> AppResult<LifecycleOutcome<Node>> {
        let (before, after, descendants_updated) =
            with_conflict_retry("move_to", self.retries(), || {
                self.move_once(node, new_parent)
            })
            .await?;

        info!(
            user_id = %ctx.user_id,
            node = %node,
            old_path = %before.path(),
            new_path = %after.path(),
            descendants_updated,
            "Node moved"
        );
        let event = LifecycleEvent::Moved {
            node,
            old_parent: before.parent(),
            new_parent,
            old_path: before.path().to_string(),
            new_path: after.path().to_string(),
            descendants_updated,
        };
        Ok(LifecycleOutcome::new(after, event))
    }

    async fn move_once(&self, node: NodeRef, new_parent: ParentRef) -> AppResult<(Node, Node, u64)> {
        let current = self.live_node(node).await?;
        let target = self.hierarchy.resolve_target(new_parent).await?;
        match current {
            Node::Folder(folder) => {
                let relocated = self.hierarchy.cascade_move(&folder, &target).await?;
                Ok((
                    Node::Folder(folder),
                    Node::Folder(relocated.folder),
                    relocated.descendants_updated,
                ))
            }
            Node::Document(document) => {
                let change = self.hierarchy.plan_document(
                    &document,
                    &target,
                    &document.name,
                    &document.original_name,
                );
                let updated = self.hierarchy.relocate_document(&change).await?;
                Ok((Node::Document(document), Node::Document(updated), 0))
            }
        }
    }

    /// Upload new content for a document. The extension must match.
    pub async fn re_upload(
        &self,
        ctx: &RequestContext,
        document_id: DocumentId,
        upload: &FileMetadata,
        change_description: Option<&str>,
    ) -> AppResult<LifecycleOutcome<VersionedDocument>> {
        let appended = self
            .versions
            .append(ctx, document_id, upload, change_description)
            .await?;
        Ok(self.version_outcome(ctx, appended, None))
    }

    /// Make the content of version `version_number` current again by
    /// appending a copy of it.
    pub async fn revert_to_version(
        &self,
        ctx: &RequestContext,
        document_id: DocumentId,
        version_number: i32,
    ) -> AppResult<LifecycleOutcome<VersionedDocument>> {
        let appended = self
            .versions
            .revert(ctx, document_id, version_number)
            .await?;
        Ok(self.version_outcome(ctx, appended, Some(version_number)))
    }

    fn version_outcome(
        &self,
        ctx: &RequestContext,
        appended: AppendedVersion,
        restored_from: Option<i32>,
    ) -> LifecycleOutcome<VersionedDocument> {
        info!(
            user_id = %ctx.user_id,
            document_id = %appended.document.id,
            previous_version = appended.previous_version,
            new_version = appended.version.version_number,
            restored_from,
            "Document version appended"
        );
        let event = LifecycleEvent::VersionAppended {
            document_id: appended.document.id,
            previous_version: appended.previous_version,
            new_version: appended.version.version_number,
            restored_from,
        };
        LifecycleOutcome::new(
            VersionedDocument {
                document: appended.document,
                version: appended.version,
            },
            event,
        )
    }

    /// Move a live node, and for a folder every live descendant, to the trash.
    pub async fn soft_delete(
        &self,
        ctx: &RequestContext,
        node: NodeRef,
    ) -> AppResult<LifecycleOutcome<Node>> {
        self.live_node(node).await?;
        let affected = self.store.mark_deleted(node, Utc::now()).await?;
        let deleted = self.get_node(node).await?;

        info!(
            user_id = %ctx.user_id,
            node = %node,
            path = %deleted.path(),
            affected,
            "Node moved to trash"
        );
        let event = LifecycleEvent::SoftDeleted {
            node,
            path: deleted.path().to_string(),
            affected,
        };
        Ok(LifecycleOutcome::new(deleted, event))
    }

    /// Bring a trashed node back, with whatever was trashed together with
    /// it. The immediate parent must be live.
    pub async fn restore(
        &self,
        ctx: &RequestContext,
        node: NodeRef,
    ) -> AppResult<LifecycleOutcome<Node>> {
        let current = self.get_node(node).await?;
        if !current.is_deleted() {
            return Err(AppError::invalid_operation(format!("{node} is not deleted")));
        }
        let parent = self.hierarchy.resolve_current(current.parent()).await?;
        if parent.is_deleted {
            return Err(AppError::invalid_operation(format!(
                "Cannot restore {node}: parent {} is still deleted",
                parent.parent
            )));
        }

        let affected = self.store.restore(node).await?;
        let restored = self.get_node(node).await?;

        info!(
            user_id = %ctx.user_id,
            node = %node,
            path = %restored.path(),
            affected,
            "Node restored from trash"
        );
        let event = LifecycleEvent::Restored {
            node,
            path: restored.path().to_string(),
            affected,
        };
        Ok(LifecycleOutcome::new(restored, event))
    }

    /// Permanently remove a trashed node and everything below it.
    pub async fn purge(&self, ctx: &RequestContext, node: NodeRef) -> AppResult<LifecycleOutcome<u64>> {
        let current = self.get_node(node).await?;
        if !current.is_deleted() {
            return Err(AppError::invalid_operation(format!(
                "{node} must be deleted before it is purged"
            )));
        }
        let removed = self.store.purge(node).await?;

        info!(
            user_id = %ctx.user_id,
            node = %node,
            path = %current.path(),
            removed,
            "Node purged"
        );
        let event = LifecycleEvent::Purged {
            node,
            path: current.path().to_string(),
            removed,
        };
        Ok(LifecycleOutcome::new(removed, event))
    }

    /// Live folders then live documents directly under `parent`, by name.
    pub async fn list_children(
        &self,
        parent: ParentRef,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Node>> {
        let resolved = self
            .hierarchy
            .resolve_current(parent)
            .await
            .map_err(|e| match e.kind {
                ErrorKind::DependencyUnavailable => {
                    AppError::not_found(format!("Parent {parent} not found"))
                }
                _ => e,
            })?;
        if resolved.is_deleted {
            return Err(AppError::invalid_operation(format!(
                "Parent {parent} is deleted"
            )));
        }

        let mut children: Vec<Node> = self
            .store
            .list_child_folders(parent, false)
            .await?
            .into_iter()
            .map(Node::from)
            .collect();
        children.extend(
            self.store
                .list_child_documents(parent, false)
                .await?
                .into_iter()
                .map(Node::from),
        );
        Ok(PageResponse::from_vec(children, page))
    }

    /// Trashed nodes of a department whose parent is live: the roots of
    /// each deletion, newest first.
    pub async fn list_trash(&self, department_id: DepartmentId) -> AppResult<Vec<TrashItem>> {
        if self.store.find_department(department_id).await?.is_none() {
            return Err(AppError::not_found(format!(
                "Department {department_id} not found"
            )));
        }

        let folders = self.store.list_department_folders(department_id).await?;
        let documents = self.store.list_department_documents(department_id).await?;
        let deleted_folders: std::collections::HashSet<FolderId> = folders
            .iter()
            .filter(|f| f.is_deleted)
            .map(|f| f.id)
            .collect();
        let parent_live = |parent: ParentRef| match parent {
            ParentRef::Department(_) => true,
            ParentRef::Folder(id) => !deleted_folders.contains(&id),
        };

        let nodes = folders
            .into_iter()
            .map(Node::from)
            .chain(documents.into_iter().map(Node::from));
        let mut items: Vec<TrashItem> = nodes
            .filter(|n| n.is_deleted() && parent_live(n.parent()))
            .filter_map(|n| {
                n.deleted_at().map(|deleted_at| TrashItem {
                    node: n.node_ref(),
                    name: n.name().to_string(),
                    path: n.path().to_string(),
                    deleted_at,
                })
            })
            .collect();
        items.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at).then(a.path.cmp(&b.path)));
        Ok(items)
    }
}

/// Drop a trailing `.{extension}` the caller may have typed.
fn strip_extension<'a>(name: &'a str, extension: &str) -> &'a str {
    if extension.is_empty() {
        return name;
    }
    let suffix_len = extension.len() + 1;
    match name.len().checked_sub(suffix_len) {
        Some(split) if split > 0 && name.is_char_boundary(split) => {
            let (stem, suffix) = name.split_at(split);
            if suffix.eq_ignore_ascii_case(&format!(".{extension}")) {
                stem.trim_end()
            } else {
                name
            }
        }
        _ => name,
    }
}
