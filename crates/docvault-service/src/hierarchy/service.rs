//! Path computation and cascades over the store.

use std::collections::{HashMap, HashSet};

use docvault_core::config::HierarchyConfig;
use docvault_core::error::AppError;
use docvault_core::result::AppResult;
use docvault_core::types::{DepartmentId, FolderId, ParentRef};
use docvault_database::{HierarchyStore, SharedStore};
use docvault_database::store::{DocumentRelocation, FolderRelocation, RelocatedFolder};
use docvault_entity::document::Document;
use docvault_entity::document::model::file_name;
use docvault_entity::folder::Folder;

use super::path::{child_path, validate_name};

/// A parent as seen by path computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedParent {
    /// The reference that was resolved.
    pub parent: ParentRef,
    /// The department whose tree the parent belongs to.
    pub department_id: DepartmentId,
    /// The parent's stored path (`/{department}` for a department).
    pub path: String,
    /// Folder depth of the parent; 0 for a department.
    pub depth: usize,
    /// Whether the parent folder is in the trash.
    pub is_deleted: bool,
    /// Whether the owning department accepts new children.
    pub is_active: bool,
}

/// Keeps every folder and document path equal to its parent's path plus
/// its own display name.
///
/// Paths are always derived from the parent's stored path, never rebuilt
/// top-down at read time. The cascades hand a whole subtree to the store
/// as one relocation so it commits or fails as a unit.
#[derive(Debug, Clone)]
pub struct PathHierarchyStore {
    store: SharedStore,
    config: HierarchyConfig,
}

impl PathHierarchyStore {
    /// Creates a new path hierarchy over `store`.
    pub fn new(store: SharedStore, config: HierarchyConfig) -> Self {
        Self { store, config }
    }

    /// The configured limits.
    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    /// Trim and check a node name against the configured limits.
    pub fn validate_name(&self, raw: &str) -> AppResult<String> {
        validate_name(raw, self.config.max_name_length)
    }

    async fn lookup(&self, parent: ParentRef) -> AppResult<Option<ResolvedParent>> {
        let resolved = match parent {
            ParentRef::Department(id) => {
                self.store
                    .find_department(id)
                    .await?
                    .map(|dept| ResolvedParent {
                        parent,
                        department_id: dept.id,
                        path: dept.path(),
                        depth: 0,
                        is_deleted: false,
                        is_active: dept.is_active,
                    })
            }
            ParentRef::Folder(id) => match self.store.find_folder(id).await? {
                Some(folder) => {
                    let is_active = self
                        .store
                        .find_department(folder.department_id)
                        .await?
                        .is_some_and(|d| d.is_active);
                    let depth = self.folder_depth(&folder).await?;
                    Some(ResolvedParent {
                        parent,
                        department_id: folder.department_id,
                        depth,
                        path: folder.path,
                        is_deleted: folder.is_deleted,
                        is_active,
                    })
                }
                None => None,
            },
        };
        Ok(resolved)
    }

    /// Folder levels from the department down to `folder`, counted along
    /// parent links. A department's direct child is at 1.
    async fn folder_depth(&self, folder: &Folder) -> AppResult<usize> {
        let mut depth = 1;
        let mut visited = HashSet::from([folder.id]);
        let mut parent = folder.parent;
        while let ParentRef::Folder(id) = parent {
            if !visited.insert(id) {
                return Err(AppError::internal(format!(
                    "Folder {} has a cyclic ancestry",
                    folder.id
                )));
            }
            let ancestor = self.store.find_folder(id).await?.ok_or_else(|| {
                AppError::dependency_unavailable(format!("Parent {parent} could not be resolved"))
            })?;
            depth += 1;
            parent = ancestor.parent;
        }
        Ok(depth)
    }

    /// Resolve a parent the caller asked to put something under: it must
    /// exist, be live, and belong to an active department.
    pub async fn resolve_target(&self, parent: ParentRef) -> AppResult<ResolvedParent> {
        let resolved = self
            .lookup(parent)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Parent {parent} not found")))?;
        if resolved.is_deleted {
            return Err(AppError::invalid_operation(format!(
                "Parent {parent} is deleted"
            )));
        }
        if !resolved.is_active {
            return Err(AppError::invalid_operation(format!(
                "Department {} is inactive",
                resolved.department_id
            )));
        }
        Ok(resolved)
    }

    /// Resolve the stored parent of an existing node. A parent that does
    /// not exist means the hierarchy itself is broken.
    pub async fn resolve_current(&self, parent: ParentRef) -> AppResult<ResolvedParent> {
        self.lookup(parent).await?.ok_or_else(|| {
            AppError::dependency_unavailable(format!("Parent {parent} could not be resolved"))
        })
    }

    /// `parent.path + "/" + display_name`.
    pub fn compute_path(&self, parent: &ResolvedParent, display_name: &str) -> String {
        child_path(&parent.path, display_name)
    }

    /// Reject a folder whose deepest descendant would end up below
    /// `max_depth` once placed under `parent`.
    pub fn check_depth(&self, parent: &ResolvedParent, subtree_height: usize) -> AppResult<()> {
        let depth = parent.depth + 1 + subtree_height;
        if depth > self.config.max_depth {
            return Err(AppError::invalid_operation(format!(
                "Folder depth {depth} exceeds the limit of {}",
                self.config.max_depth
            )));
        }
        Ok(())
    }

    /// Number of folder levels below `folder` (0 for a leaf folder).
    pub async fn subtree_height(&self, folder: &Folder) -> AppResult<usize> {
        let folders = self.store.list_department_folders(folder.department_id).await?;
        let mut children: HashMap<FolderId, Vec<FolderId>> = HashMap::new();
        for f in &folders {
            if let Some(parent) = f.parent.as_folder() {
                children.entry(parent).or_default().push(f.id);
            }
        }

        let mut height = 0;
        let mut level = vec![folder.id];
        let mut seen = HashSet::from([folder.id]);
        loop {
            let next: Vec<FolderId> = level
                .iter()
                .filter_map(|id| children.get(id))
                .flatten()
                .copied()
                .filter(|id| seen.insert(*id))
                .collect();
            if next.is_empty() {
                return Ok(height);
            }
            height += 1;
            level = next;
        }
    }

    /// Reject moving `folder` under itself or one of its descendants.
    pub async fn ensure_not_within(&self, folder: &Folder, target: &ResolvedParent) -> AppResult<()> {
        let Some(mut current) = target.parent.as_folder() else {
            return Ok(());
        };
        let mut visited = HashSet::new();
        loop {
            if current == folder.id {
                return Err(AppError::invalid_operation(format!(
                    "Cannot move folder {} into itself or its own subtree",
                    folder.id
                )));
            }
            if !visited.insert(current) {
                return Ok(());
            }
            match self.store.find_folder(current).await? {
                Some(ancestor) => match ancestor.parent {
                    ParentRef::Folder(next) => current = next,
                    ParentRef::Department(_) => return Ok(()),
                },
                None => return Ok(()),
            }
        }
    }

    /// Give `folder` a new name and rewrite the path prefix of its subtree.
    pub async fn cascade_rename(&self, folder: &Folder, new_name: &str) -> AppResult<RelocatedFolder> {
        let parent = self.resolve_current(folder.parent).await?;
        let change = FolderRelocation {
            folder_id: folder.id,
            department_id: parent.department_id,
            parent: folder.parent,
            name: new_name.to_string(),
            path: self.compute_path(&parent, new_name),
            old_path: folder.path.clone(),
        };
        self.store.relocate_folder(&change).await
    }

    /// Reparent `folder` under `target` and rewrite its subtree, possibly
    /// into another department's tree.
    pub async fn cascade_move(
        &self,
        folder: &Folder,
        target: &ResolvedParent,
    ) -> AppResult<RelocatedFolder> {
        self.ensure_not_within(folder, target).await?;
        let height = self.subtree_height(folder).await?;
        self.check_depth(target, height)?;

        let change = FolderRelocation {
            folder_id: folder.id,
            department_id: target.department_id,
            parent: target.parent,
            name: folder.name.clone(),
            path: self.compute_path(target, &folder.name),
            old_path: folder.path.clone(),
        };
        self.store.relocate_folder(&change).await
    }

    /// Plan a document's placement under `parent` with the given names.
    /// The version projection, if any, is attached by the caller.
    pub fn plan_document(
        &self,
        document: &Document,
        parent: &ResolvedParent,
        name: &str,
        original_name: &str,
    ) -> DocumentRelocation {
        let display = file_name(name, &document.extension);
        DocumentRelocation {
            document_id: document.id,
            department_id: parent.department_id,
            parent: parent.parent,
            name: name.to_string(),
            original_name: original_name.to_string(),
            path: self.compute_path(parent, &display),
            old_path: document.path.clone(),
            latest_projection: None,
        }
    }

    /// Apply a planned document relocation.
    pub async fn relocate_document(&self, change: &DocumentRelocation) -> AppResult<Document> {
        self.store.relocate_document(change).await
    }
}
