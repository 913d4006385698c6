//! Folder tree building and breadcrumbs.

use std::collections::HashMap;

use docvault_core::error::AppError;
use docvault_core::result::AppResult;
use docvault_core::types::{DepartmentId, FolderId, ParentRef};
use docvault_database::{HierarchyStore, SharedStore};
use docvault_entity::folder::{Folder, FolderNode, FolderTree};

/// Builds nested views of a department's live folders.
#[derive(Debug, Clone)]
pub struct TreeService {
    store: SharedStore,
}

impl TreeService {
    /// Creates a new tree service.
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Builds the live folder tree of a department, with the number of
    /// live documents directly in each folder.
    pub async fn build_tree(&self, department_id: DepartmentId) -> AppResult<FolderTree> {
        if self.store.find_department(department_id).await?.is_none() {
            return Err(AppError::not_found(format!(
                "Department {department_id} not found"
            )));
        }

        let folders: Vec<Folder> = self
            .store
            .list_department_folders(department_id)
            .await?
            .into_iter()
            .filter(|f| !f.is_deleted)
            .collect();
        let documents = self.store.list_department_documents(department_id).await?;

        let mut document_counts: HashMap<ParentRef, u64> = HashMap::new();
        let mut total_documents = 0;
        for document in documents.iter().filter(|d| !d.is_deleted) {
            *document_counts.entry(document.parent).or_default() += 1;
            total_documents += 1;
        }

        let mut children: HashMap<ParentRef, Vec<&Folder>> = HashMap::new();
        for folder in &folders {
            children.entry(folder.parent).or_default().push(folder);
        }
        for siblings in children.values_mut() {
            siblings.sort_by(|a, b| a.name.cmp(&b.name));
        }

        let roots = build_level(
            ParentRef::Department(department_id),
            1,
            &children,
            &document_counts,
        );
        let mut tree = FolderTree::empty(department_id);
        tree.root_document_count = document_counts
            .get(&ParentRef::Department(department_id))
            .copied()
            .unwrap_or(0);
        tree.total_folders = count_nodes(&roots);
        tree.total_documents = total_documents;
        tree.roots = roots;
        Ok(tree)
    }

    /// The folders from the department down to `folder_id`, outermost first.
    pub async fn breadcrumbs(&self, folder_id: FolderId) -> AppResult<Vec<Folder>> {
        let mut trail = Vec::new();
        let mut next = Some(folder_id);
        while let Some(id) = next {
            let folder = self
                .store
                .find_folder(id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;
            next = folder.parent.as_folder();
            if next.is_some_and(|p| trail.iter().any(|f: &Folder| f.id == p)) {
                return Err(AppError::internal(format!(
                    "Folder {folder_id} has a cyclic ancestry"
                )));
            }
            trail.push(folder);
        }
        trail.reverse();
        Ok(trail)
    }
}

fn build_level(
    parent: ParentRef,
    depth: usize,
    children: &HashMap<ParentRef, Vec<&Folder>>,
    document_counts: &HashMap<ParentRef, u64>,
) -> Vec<FolderNode> {
    let Some(folders) = children.get(&parent) else {
        return Vec::new();
    };
    folders
        .iter()
        .map(|folder| {
            let key = ParentRef::Folder(folder.id);
            FolderNode {
                id: folder.id,
                name: folder.name.clone(),
                path: folder.path.clone(),
                depth,
                document_count: document_counts.get(&key).copied().unwrap_or(0),
                children: build_level(key, depth + 1, children, document_counts),
            }
        })
        .collect()
}

fn count_nodes(nodes: &[FolderNode]) -> u64 {
    nodes
        .iter()
        .map(|n| 1 + count_nodes(&n.children))
        .sum()
}
