//! Core type definitions used across the DocVault workspace.

pub mod id;
pub mod node;
pub mod pagination;

pub use id::*;
pub use node::{NodeRef, ParentKind, ParentRef};
pub use pagination::{PageRequest, PageResponse};
