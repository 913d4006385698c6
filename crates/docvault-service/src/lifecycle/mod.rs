//! Caller-facing hierarchy operations.

pub mod controller;
pub mod outcome;

pub use controller::LifecycleController;
pub use outcome::LifecycleOutcome;
