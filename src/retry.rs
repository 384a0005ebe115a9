// src/retry.rs
// =============================================================================
// One retry policy shared by every network-facing step (page render, detail
// page fetch, image download).
//
// The contract is deliberately blunt:
// - at most 3 attempts in total
// - a fixed 2 second pause between attempts (no exponential growth, no jitter)
// - every error is retried; the last one is handed back to the caller
//
// Anti-throttling jitter lives elsewhere (config::Jitter). It is NOT applied
// to the pause between retries.
// =============================================================================

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS, DEFAULT_DELAY)
    }
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    // Runs `op` until it succeeds or the attempts run out.
    //
    // `op` is a closure producing a fresh future per attempt, so whatever it
    // captures must be reusable (clone inside the closure if needed).
    // `label` only feeds the log lines.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        label,
                        attempt,
                        attempts,
                        e,
                        self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!("{} failed after {} attempt(s): {}", label, attempts, e);
                    return Err(e);
                }
            }
        }
    }
}

// Free-function form of the policy: run `op` under `policy`.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, label: &str, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    policy.run(label, op).await
}
