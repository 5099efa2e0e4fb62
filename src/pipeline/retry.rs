//! Retry with exponential backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Backoff before the first retry.
pub const BASE_DELAY: Duration = Duration::from_millis(500);

/// Run `op` up to `retries + 1` times.
///
/// After a failed attempt `n` (0-based) the call sleeps `base_delay * 2^n`
/// before trying again. The last error is returned unchanged.
pub async fn with_retries<T, E, F, Fut>(retries: u32, base_delay: Duration, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < retries => {
                let delay = base_delay * 2u32.saturating_pow(attempt);
                log::debug!("Attempt {} failed ({e}); retrying in {delay:?}", attempt + 1);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
