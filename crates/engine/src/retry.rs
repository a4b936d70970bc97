use retail_sim_shared::config::RetryPolicy;
use tracing::warn;

use crate::clock::Clock;

/// Runs `op` until it succeeds, fails permanently, or the policy runs out.
///
/// Returns the last result together with the number of attempts made. The
/// backoff sleep goes through `clock` so tests never block.
pub fn with_retry<T, E, C, F, P>(
    policy: &RetryPolicy,
    clock: &C,
    is_transient: P,
    mut op: F,
) -> (Result<T, E>, u32)
where
    C: Clock + ?Sized,
    F: FnMut(u32) -> Result<T, E>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op(attempt) {
            Ok(value) => return (Ok(value), attempt),
            Err(e) if attempt < max_attempts && is_transient(&e) => {
                let delay = policy.backoff_delay(attempt - 1);
                warn!(attempt, ?delay, "Retrying after error: {e}");
                clock.sleep(delay);
            }
            Err(e) => return (Err(e), attempt),
        }
    }
}
