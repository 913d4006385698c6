//! # docvault-service
//!
//! The hierarchy-and-version core of DocVault. [`PathHierarchyStore`]
//! computes and cascades materialized paths, [`VersionChain`] keeps each
//! document's append-only history, and [`LifecycleController`] combines
//! them into the caller-facing operations.
//!
//! Services follow constructor injection: every dependency is handed in
//! at construction time, and the store is shared behind an `Arc`.

pub mod context;
pub mod department;
pub mod hierarchy;
pub mod integrity;
pub mod lifecycle;
mod retry;
pub mod tree;
pub mod version;

pub use context::RequestContext;
pub use department::{CreateDepartmentRequest, DepartmentService};
pub use hierarchy::{PathHierarchyStore, ResolvedParent};
pub use integrity::{IntegrityReport, IntegrityService, Violation};
pub use lifecycle::{LifecycleController, LifecycleOutcome};
pub use tree::TreeService;
pub use version::{AppendedVersion, VersionChain, VersionedDocument};

use docvault_core::config::AppConfig;
use docvault_database::SharedStore;

/// Every service, wired over one store.
#[derive(Debug, Clone)]
pub struct Services {
    /// Department management.
    pub departments: DepartmentService,
    /// Rename, move, re-upload, revert, delete, restore.
    pub lifecycle: LifecycleController,
    /// Tree views.
    pub tree: TreeService,
    /// Consistency checks.
    pub integrity: IntegrityService,
}

impl Services {
    /// Build the services from the loaded configuration.
    pub fn new(store: SharedStore, config: &AppConfig) -> Self {
        let hierarchy = PathHierarchyStore::new(store.clone(), config.hierarchy.clone());
        let versions = VersionChain::new(store.clone(), config.versioning.clone());
        Self {
            departments: DepartmentService::new(store.clone(), config.hierarchy.max_name_length),
            lifecycle: LifecycleController::new(store.clone(), hierarchy, versions),
            tree: TreeService::new(store.clone()),
            integrity: IntegrityService::new(store),
        }
    }

    /// The path hierarchy.
    pub fn hierarchy(&self) -> &PathHierarchyStore {
        self.lifecycle.hierarchy()
    }

    /// The version chain.
    pub fn versions(&self) -> &VersionChain {
        self.lifecycle.versions()
    }
}
