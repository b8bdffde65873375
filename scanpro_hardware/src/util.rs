use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Poll `is_ready` until it reports true, or fail once `timeout` expires.
/// Sleeps `poll_interval` between polls to avoid CPU spinning; errors from the
/// predicate are returned immediately.
pub fn wait_until_with_timeout(
    mut is_ready: impl FnMut() -> Result<bool>,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while !is_ready()? {
        if Instant::now() >= deadline {
            return Err(HwError::ConversionTimeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}
