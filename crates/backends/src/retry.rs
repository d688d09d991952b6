//! Bounded-retry combinator shared by all backend adapters.
//!
//! One place owns the retry policy: a fixed attempt count, no inter-attempt
//! delay, retrying on any execution error. After the budget is exhausted the
//! last error is returned rather than thrown past a boundary. Both outcomes
//! carry the retry count, so a failed tool result reports its attempts as
//! accurately as a successful one.

use std::future::Future;
use tracing::warn;

/// A successful value plus the number of retries it took to obtain it.
///
/// `retries` is zero when the first attempt succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    pub retries: u32,
}

/// The last error after the retry budget ran out, plus the number of
/// retries performed before giving up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exhausted<E> {
    pub error: E,
    pub retries: u32,
}

impl<E: std::fmt::Display> std::fmt::Display for Exhausted<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (after {} retries)", self.error, self.retries)
    }
}

impl<E: std::error::Error + 'static> std::error::Error for Exhausted<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Run `op` up to `max_attempts` times, returning the first success.
///
/// The operation receives the 1-based attempt number. Exactly
/// `max_attempts` attempts are made on permanent failure, never more; the
/// error from the final attempt is returned together with the retry count
/// it took to reach it.
pub async fn with_retries<T, E, F, Fut>(
    label: &str,
    max_attempts: u32,
    mut op: F,
) -> Result<Retried<T>, Exhausted<E>>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => {
                return Ok(Retried {
                    value,
                    retries: attempt - 1,
                })
            }
            Err(e) if attempt < max_attempts => {
                warn!(
                    target = label,
                    attempt,
                    max_attempts,
                    error = %e,
                    "Backend call failed, retrying"
                );
            }
            Err(e) => {
                warn!(
                    target = label,
                    attempts = attempt,
                    error = %e,
                    "Backend call failed, retry budget exhausted"
                );
                return Err(Exhausted {
                    error: e,
                    retries: attempt - 1,
                });
            }
        }
    }
}
