//! Runtime configuration.

use std::time::Duration;

/// Default upper bound on a fetched background, in bytes.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 32 * 1024 * 1024;

/// Settings for background image transports.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Per-fetch deadline. `None` leaves it to the transport.
    pub timeout: Option<Duration>,
    /// Largest response accepted.
    pub max_bytes: usize,
    /// User agent sent with HTTP requests.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
            user_agent: format!("emoji-art/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Configuration for retry with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 50,
            max_delay_ms: 2_000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay_ms: u64, max_delay_ms: u64, multiplier: f64) -> Self {
        Self {
            max_attempts,
            initial_delay_ms,
            max_delay_ms,
            multiplier,
        }
    }

    /// A single attempt, no retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-indexed), capped at `max_delay_ms`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

/// Settings for the autosave task.
#[derive(Debug, Clone, Default)]
pub struct AutosaveConfig {
    /// Retry policy for failed writes.
    pub retry: RetryConfig,
}

/// Settings for the document controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Capacity of the state publication channel.
    pub event_capacity: usize,
    /// Capacity of the actor's intent queue.
    pub command_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            event_capacity: 64,
            command_capacity: 64,
        }
    }
}
