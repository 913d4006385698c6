//! Document domain entities.

pub mod metadata;
pub mod model;
pub mod version;

pub use metadata::FileMetadata;
pub use model::Document;
pub use version::DocumentVersion;
