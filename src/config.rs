//! Manager configuration.

use crate::error::{Error, Result};
use crate::panel::PanelKind;
use std::time::Duration;

/// Extra time a caller waits beyond the writer's own deadlines before giving up.
const REPLY_GRACE: Duration = Duration::from_secs(1);

/// Settings for a [`Manager`](crate::Manager).
///
/// ```
/// use saitek_panels::{ManagerConfig, PanelKind};
/// use std::time::Duration;
///
/// let config = ManagerConfig::default()
///     .with_write_timeout(Duration::from_millis(250))
///     .with_expected(vec![PanelKind::Radio, PanelKind::Multi])
///     .with_strict(true);
/// assert!(config.strict);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Release the OS HID driver before claiming a panel.
    pub auto_detach_kernel_driver: bool,
    /// How often the reconnect thread looks for degraded or missing panels.
    pub reconnect_interval: Duration,
    /// How long a control transfer may wait to start. Must exceed
    /// `read_poll_interval`.
    pub write_timeout: Duration,
    /// Reject misplaced decimal points instead of dropping them.
    pub strict: bool,
    /// Open every panel in [`Manager::start`](crate::Manager::start); otherwise
    /// panels are opened by their first write.
    pub eager_open: bool,
    /// Panels to track even if they are absent at start. They show up as
    /// [`PanelStatus::Missing`](crate::PanelStatus::Missing) until plugged in.
    pub expected: Vec<PanelKind>,
    /// Extra open attempts when a panel reports busy.
    pub busy_retries: u32,
    /// Delay before the first busy retry; doubles on each attempt.
    pub busy_backoff: Duration,
    /// Read timeout of the input loops, and so how quickly they notice shutdown.
    pub read_poll_interval: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            auto_detach_kernel_driver: cfg!(any(target_os = "macos", target_os = "linux")),
            reconnect_interval: Duration::from_secs(2),
            write_timeout: Duration::from_millis(500),
            strict: false,
            eager_open: true,
            expected: Vec::new(),
            busy_retries: 3,
            busy_backoff: Duration::from_millis(100),
            read_poll_interval: Duration::from_millis(50),
        }
    }
}

impl ManagerConfig {
    pub fn with_auto_detach(mut self, auto_detach: bool) -> Self {
        self.auto_detach_kernel_driver = auto_detach;
        self
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_eager_open(mut self, eager: bool) -> Self {
        self.eager_open = eager;
        self
    }

    pub fn with_expected(mut self, expected: Vec<PanelKind>) -> Self {
        self.expected = expected;
        self
    }

    pub fn with_busy_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.busy_retries = retries;
        self.busy_backoff = backoff;
        self
    }

    pub fn with_read_poll_interval(mut self, interval: Duration) -> Self {
        self.read_poll_interval = interval;
        self
    }

    /// Checks that the timeouts fit together.
    ///
    /// A writer waits at most `write_timeout` for the handle while the
    /// reader holds it for one `read_poll_interval`, so the poll must be
    /// shorter.
    pub fn validate(&self) -> Result<()> {
        if self.write_timeout.is_zero() {
            return Err(Error::InvalidConfig("write_timeout must be non-zero".to_string()));
        }
        if self.read_poll_interval >= self.write_timeout {
            return Err(Error::InvalidConfig(format!(
                "read_poll_interval ({:?}) must be shorter than write_timeout ({:?})",
                self.read_poll_interval, self.write_timeout
            )));
        }
        Ok(())
    }

    /// Total time spent sleeping between busy retries.
    pub fn busy_backoff_total(&self) -> Duration {
        (0..self.busy_retries)
            .map(|attempt| self.busy_backoff.saturating_mul(1u32 << attempt.min(16)))
            .fold(Duration::ZERO, |acc, d| acc.saturating_add(d))
    }

    /// How long a caller waits for its queued write to complete.
    ///
    /// Covers a transfer, a reopen (including busy retries) and the retried
    /// transfer.
    pub fn reply_deadline(&self) -> Duration {
        self.write_timeout
            .saturating_mul(2)
            .saturating_add(self.busy_backoff_total())
            .saturating_add(REPLY_GRACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.reconnect_interval, Duration::from_secs(2));
        assert_eq!(config.write_timeout, Duration::from_millis(500));
        assert!(!config.strict);
        assert!(config.eager_open);
        assert!(config.expected.is_empty());
    }

    #[test]
    fn test_busy_backoff_doubles() {
        let config = ManagerConfig::default().with_busy_retries(3, Duration::from_millis(100));
        assert_eq!(config.busy_backoff_total(), Duration::from_millis(700));
        let none = ManagerConfig::default().with_busy_retries(0, Duration::from_millis(100));
        assert_eq!(none.busy_backoff_total(), Duration::ZERO);
    }

    #[test]
    fn test_validate_timeouts() {
        assert!(ManagerConfig::default().validate().is_ok());

        let slow_poll = ManagerConfig::default()
            .with_write_timeout(Duration::from_millis(20))
            .with_read_poll_interval(Duration::from_millis(100));
        assert!(matches!(slow_poll.validate(), Err(Error::InvalidConfig(_))));

        let equal = ManagerConfig::default()
            .with_write_timeout(Duration::from_millis(50))
            .with_read_poll_interval(Duration::from_millis(50));
        assert!(matches!(equal.validate(), Err(Error::InvalidConfig(_))));

        let zero = ManagerConfig::default().with_write_timeout(Duration::ZERO);
        assert!(matches!(zero.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_reply_deadline() {
        let config = ManagerConfig::default()
            .with_write_timeout(Duration::from_millis(500))
            .with_busy_retries(0, Duration::ZERO);
        assert_eq!(config.reply_deadline(), Duration::from_secs(2));
    }
}
