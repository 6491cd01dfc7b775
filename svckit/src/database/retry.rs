use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};

use crate::errors::DataError;

pub const STARTUP_MAX_ATTEMPTS: u32 = 5;
pub const STARTUP_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Bounded fixed-delay retry for startup connection establishment.
///
/// Only the connection manager uses this. Per-statement failures are never
/// retried; exponential reconnection backoff belongs to the driver.
#[derive(Debug, Clone)]
pub struct StartupRetry {
    max_attempts: u32,
    delay: Duration,
}

impl Default for StartupRetry {
    fn default() -> Self {
        Self {
            max_attempts: STARTUP_MAX_ATTEMPTS,
            delay: STARTUP_RETRY_DELAY,
        }
    }
}

impl StartupRetry {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `operation` until it succeeds or `max_attempts` is reached. The
    /// operation receives the 1-based attempt number. Exhaustion yields
    /// `ConnectionError` carrying the last failure.
    pub async fn run<F, Fut, T>(&self, what: &str, mut operation: F) -> Result<T, DataError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, DataError>>,
    {
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(result) => return Ok(result),
                Err(err) if attempt >= self.max_attempts => {
                    error!(
                        "Failed to {} after {} attempts: {}",
                        what, self.max_attempts, err
                    );
                    return Err(DataError::ConnectionError(format!(
                        "failed to {} after {} attempts: {}",
                        what, self.max_attempts, err
                    )));
                }
                Err(err) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        "Failed to {}, retrying in {:?} (attempt {}/{}): {}",
                        what,
                        self.delay,
                        attempt,
                        self.max_attempts,
                        err
                    );
                    sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
