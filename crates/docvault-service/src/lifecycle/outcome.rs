//! What a committed lifecycle operation hands back.

use serde::Serialize;

use docvault_core::events::{DomainEvent, LifecycleEvent};

use crate::context::RequestContext;

/// The new state plus the event describing the change.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleOutcome<T> {
    /// The state after the operation.
    pub value: T,
    /// Enough detail for the caller to build an activity-log entry.
    pub event: LifecycleEvent,
}

impl<T> LifecycleOutcome<T> {
    /// Pair a value with its event.
    pub fn new(value: T, event: LifecycleEvent) -> Self {
        Self { value, event }
    }

    /// Wrap the event with an id, timestamp, and the acting user.
    pub fn domain_event(&self, ctx: &RequestContext) -> DomainEvent {
        DomainEvent::new(Some(ctx.user_id), self.event.clone())
    }

    /// Drop the event.
    pub fn into_value(self) -> T {
        self.value
    }
}
