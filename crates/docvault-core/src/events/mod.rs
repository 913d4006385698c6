//! Activity payloads produced by hierarchy mutations.
//!
//! The core does not record activity itself. Every mutating operation
//! hands one of these back to its caller, which forwards it to whatever
//! activity log or notification fan-out sits outside the core.

pub mod lifecycle;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::UserId;

pub use lifecycle::LifecycleEvent;

/// Wrapper for an event with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The user who caused the event (if known).
    pub actor_id: Option<UserId>,
    /// The event payload.
    pub payload: LifecycleEvent,
}

impl DomainEvent {
    /// Create a new domain event.
    pub fn new(actor_id: Option<UserId>, payload: LifecycleEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor_id,
            payload,
        }
    }
}
