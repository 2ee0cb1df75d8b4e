use crate::types::AssistError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

const DEFAULT_MAX_ATTEMPTS: u8 = 2;
const DEFAULT_DELAY_MS: u64 = 600;
const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Per-request retry: fixed delay, bounded attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u8,
    delay: Duration,
    retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            retryable_statuses: RETRYABLE_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u8, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            ..Self::default()
        }
    }

    /// Default attempt budget with no delay, for tests
    pub fn immediate() -> Self {
        Self::default().with_delay(Duration::ZERO)
    }

    pub fn with_max_attempts(mut self, max_attempts: u8) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_attempts(&self) -> u8 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_retryable(&self, error: &AssistError) -> bool {
        match error {
            AssistError::Timeout | AssistError::Network(_) => true,
            AssistError::HttpError { code, .. } => self.retryable_statuses.contains(code),
            _ => false,
        }
    }

    /// `attempt` is zero-based
    pub fn should_retry(&self, attempt: u8, error: &AssistError) -> bool {
        if attempt + 1 >= self.max_attempts {
            return false;
        }

        self.is_retryable(error)
    }

    /// Sleeps for the fixed delay, or returns `Cancelled` if the token fires first
    pub async fn wait_before_retry(
        &self,
        attempt: u8,
        cancel: &CancellationToken,
    ) -> Result<(), AssistError> {
        tracing::info!(
            "Retrying in {}ms (attempt {})",
            self.delay.as_millis(),
            attempt + 2
        );

        tokio::select! {
            _ = cancel.cancelled() => Err(AssistError::Cancelled),
            _ = sleep(self.delay) => Ok(()),
        }
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. The last error is returned in the latter case.
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, AssistError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AssistError>>,
    {
        let mut attempt = 0u8;

        loop {
            if cancel.is_cancelled() {
                return Err(AssistError::Cancelled);
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if self.should_retry(attempt, &e) {
                        tracing::warn!(
                            "Attempt {}/{} failed: {}",
                            attempt + 1,
                            self.max_attempts,
                            e
                        );
                        self.wait_before_retry(attempt, cancel).await?;
                        attempt += 1;
                        continue;
                    }

                    return Err(e);
                }
            }
        }
    }
}
