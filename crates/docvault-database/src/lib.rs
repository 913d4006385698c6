//! # docvault-database
//!
//! Persistence for the DocVault hierarchy. The [`store`] module defines the
//! traits the service layer talks to and their two implementations:
//! PostgreSQL (one transaction per atomic operation, built from the
//! repositories in [`repositories`]) and a process-local in-memory store.

pub mod connection;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{HierarchyStore, MemoryStore, PgStore, SharedStore, Store, VersionStore};
