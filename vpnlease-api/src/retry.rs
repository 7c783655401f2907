//! Fixed-budget retry for authority calls.

use crate::authority::Operation;
use crate::error::ApiResult;
use std::future::Future;
use tracing::{debug, error, warn};

/// Default number of retries after the first attempt.
pub const MAX_RETRIES: u32 = 3;

/// Runs `call`, repeating it up to `max_retries` more times while it fails
/// with a retryable error.
///
/// Retries are immediate. A non-retryable error or an exhausted budget is
/// returned as is.
pub async fn call_with_retry<T, F, Fut>(
    operation: Operation,
    max_retries: u32,
    mut call: F,
) -> ApiResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        debug!("{operation} api call (attempt {})", attempt + 1);
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                attempt += 1;
                warn!("{operation} api call failed, retry {attempt}/{max_retries}: {e}");
            }
            Err(e) => {
                error!("{operation} api call failed after {} attempts: {e}", attempt + 1);
                return Err(e);
            }
        }
    }
}
