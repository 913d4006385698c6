//! # docvault-entity
//!
//! Domain entity models for DocVault. Every struct in this crate
//! represents a database table row or a domain value object. Row
//! entities implement `sqlx::FromRow`; folders and documents decode their
//! polymorphic parent from the `(parent_kind, parent_id)` column pair.

pub mod department;
pub mod document;
pub mod folder;
pub mod node;

mod row;

pub use department::Department;
pub use document::{Document, DocumentVersion, FileMetadata};
pub use folder::{Folder, FolderNode, FolderTree};
pub use node::{Node, TrashItem};
