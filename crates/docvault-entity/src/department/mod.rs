//! Department (tree root) entities.

pub mod model;

pub use model::Department;
