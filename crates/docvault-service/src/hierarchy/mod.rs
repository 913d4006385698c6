//! Materialized path computation and subtree cascades.

pub mod path;
pub mod service;

pub use path::{child_path, validate_name};
pub use service::{PathHierarchyStore, ResolvedParent};
