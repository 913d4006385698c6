//! The per-document append-only version log.

pub mod chain;

pub use chain::{AppendedVersion, VersionChain, VersionedDocument};
