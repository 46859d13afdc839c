//! Static configuration of the driver.

use std::time::Duration;

/// Retry and polling bounds of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Attempts per duty before the driver gives up on it.
    pub max_attempts: u32,

    /// Pause between two attempts of the same duty.
    pub retry_delay: Duration,

    /// Longest pause while waiting for time to pass or for someone else to act.
    pub poll_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(180),
            poll_interval: Duration::from_secs(20),
        }
    }
}
