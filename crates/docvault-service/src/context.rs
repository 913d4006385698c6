//! Request context carrying the acting user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docvault_core::types::UserId;

/// Context for the current request.
///
/// Authorization has already happened by the time a service sees this;
/// the user id is recorded as `created_by` and on lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The acting user's ID.
    pub user_id: UserId,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            request_time: Utc::now(),
        }
    }

    /// Context for maintenance work started from the command line.
    pub fn system() -> Self {
        Self::new(UserId::from_uuid(uuid::Uuid::nil()))
    }
}
