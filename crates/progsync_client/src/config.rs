//! Configuration for the sync agent.

use progsync_model::OwnerId;
use rand::Rng;
use std::time::Duration;

/// Configuration for a [`crate::ClientSyncAgent`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Owner whose document this agent syncs.
    pub owner: OwnerId,
    /// Bounded wait for a single push, pull or force request.
    pub timeout: Duration,
    /// Interval between background pulls.
    pub pull_interval: Duration,
    /// Quiet period after a mutation before the background push.
    pub push_debounce: Duration,
    /// Backoff for retries while offline.
    pub retry: RetryConfig,
}

impl ClientConfig {
    /// Creates a new client configuration.
    pub fn new(owner: OwnerId) -> Self {
        Self {
            owner,
            timeout: Duration::from_secs(10),
            pull_interval: Duration::from_secs(20),
            push_debounce: Duration::from_millis(500),
            retry: RetryConfig::default(),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the background pull interval.
    pub fn with_pull_interval(mut self, interval: Duration) -> Self {
        self.pull_interval = interval;
        self
    }

    /// Sets the push debounce.
    pub fn with_push_debounce(mut self, debounce: Duration) -> Self {
        self.push_debounce = debounce;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Disables jitter.
    pub fn without_jitter(mut self) -> Self {
        self.add_jitter = false;
        self
    }

    /// Calculates the delay for a given attempt (0-indexed).
    ///
    /// The delay never exceeds `max_delay`, jitter included.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let max_secs = self.max_delay.as_secs_f64();
        let delay_secs = base_delay.min(max_secs);

        if self.add_jitter {
            // Add up to 25% jitter
            let jitter = delay_secs * 0.25 * rand::thread_rng().gen::<f64>();
            Duration::from_secs_f64((delay_secs + jitter).min(max_secs))
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_config_builder() {
        let config = ClientConfig::new(OwnerId::new("alice"))
            .with_timeout(Duration::from_secs(3))
            .with_pull_interval(Duration::from_secs(5))
            .with_push_debounce(Duration::from_millis(50));

        assert_eq!(config.owner.as_str(), "alice");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.pull_interval, Duration::from_secs(5));
        assert_eq!(config.push_debounce, Duration::from_millis(50));
    }

    #[test]
    fn client_config_defaults() {
        let config = ClientConfig::new(OwnerId::new("alice"));
        assert_eq!(config.pull_interval, Duration::from_secs(20));
        assert_eq!(config.push_debounce, Duration::from_millis(500));
    }

    #[test]
    fn retry_delay_calculation() {
        let config = RetryConfig::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0);

        // First attempt has no delay
        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);

        // Subsequent attempts have exponential backoff
        let delay1 = config.delay_for_attempt(1);
        assert!(delay1 >= Duration::from_millis(100));
        assert!(delay1 <= Duration::from_millis(125)); // with jitter

        let delay2 = config.delay_for_attempt(2);
        assert!(delay2 >= Duration::from_millis(200));
    }

    #[test]
    fn retry_delay_respects_max() {
        let config = RetryConfig::new()
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_backoff_multiplier(10.0);

        for attempt in 1..40 {
            assert!(config.delay_for_attempt(attempt) <= Duration::from_secs(5));
        }
    }

    #[test]
    fn retry_delay_without_jitter_is_exact() {
        let config = RetryConfig::new()
            .with_initial_delay(Duration::from_millis(10))
            .without_jitter();
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(40));
    }
}
