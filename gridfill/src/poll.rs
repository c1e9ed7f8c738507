//! Bounded condition polling against the host page.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::config::PollPolicy;
use crate::errors::FillError;

/// Outcome of [`poll_until`] when the probe itself never failed.
#[derive(Debug, Clone, PartialEq)]
pub enum Polled<T> {
    Ready(T),
    Exhausted { attempts: u32, waited: Duration },
}

impl<T> Polled<T> {
    pub fn or_timeout(self, label: &str) -> Result<T, FillError> {
        match self {
            Polled::Ready(value) => Ok(value),
            Polled::Exhausted { attempts, waited } => Err(FillError::Timeout(format!(
                "{label}: condition not met after {attempts} attempts ({waited:?})"
            ))),
        }
    }
}

/// Runs `probe` until it yields `Some`, sleeping per `policy` between attempts.
///
/// A probe error stops polling and is returned as-is.
pub async fn poll_until<T, F, Fut>(
    policy: &PollPolicy,
    label: &str,
    mut probe: F,
) -> Result<Polled<T>, FillError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, FillError>>,
{
    let started = Instant::now();
    let attempts = policy.attempts.max(1);
    for attempt in 0..attempts {
        if let Some(value) = probe().await? {
            trace!(label, attempt = attempt + 1, "poll satisfied");
            return Ok(Polled::Ready(value));
        }
        if attempt + 1 < attempts {
            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }
    Ok(Polled::Exhausted {
        attempts,
        waited: started.elapsed(),
    })
}
