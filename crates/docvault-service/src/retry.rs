//! Retrying operations that lost a concurrent write race.

use std::future::Future;

use tracing::warn;

use docvault_core::result::AppResult;

/// Run `attempt`, re-running it up to `retries` more times while it fails
/// with a retryable error. Each attempt must re-read the state it acts on.
pub(crate) async fn with_conflict_retry<T, F, Fut>(
    operation: &'static str,
    retries: u32,
    mut attempt: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut remaining = retries;
    loop {
        match attempt().await {
            Err(e) if e.is_retryable() && remaining > 0 => {
                remaining -= 1;
                warn!(operation, remaining, error = %e, "Concurrent write conflict, retrying");
            }
            Err(e) if e.is_retryable() => {
                warn!(operation, error = %e, "Concurrent write conflict, giving up");
                return Err(e);
            }
            other => return other,
        }
    }
}
