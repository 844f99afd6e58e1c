//! Configuration for the session store.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default inactivity threshold after which a session is evicted.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default delay between sweeper passes.
///
/// Eviction lands at most one interval (plus the pass itself) after the idle
/// timeout elapses, so this must stay well under the allowed slack.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(250);

/// Configuration for the session store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Sessions not updated within this duration are evicted.
    pub idle_timeout: Duration,

    /// Interval between sweeper passes.
    pub sweep_interval: Duration,

    /// Whether [`SessionManager`](crate::SessionManager) spawns the
    /// background sweeper. If false, eviction only happens through
    /// [`SessionStore::sweep`](crate::SessionStore::sweep).
    pub enable_sweeper: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            enable_sweeper: true,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inactivity threshold.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Enable or disable the background sweeper.
    pub fn with_sweeper(mut self, enabled: bool) -> Self {
        self.enable_sweeper = enabled;
        self
    }

    /// Check that the configuration can drive a store.
    pub fn validate(&self) -> Result<()> {
        if self.idle_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "idle_timeout must be greater than zero".to_string(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "sweep_interval must be greater than zero".to_string(),
            ));
        }
        let max_interval = self.max_sweep_interval();
        if self.sweep_interval > max_interval {
            return Err(Error::InvalidConfig(format!(
                "sweep_interval of {}ms exceeds {}ms, the most an idle_timeout of {}ms allows",
                self.sweep_interval.as_millis(),
                max_interval.as_millis(),
                self.idle_timeout.as_millis()
            )));
        }
        Ok(())
    }

    /// Longest sweep interval that still evicts within the allowed lateness.
    ///
    /// Sessions may outlive the idle timeout by at most two fifths of it
    /// (2s on the default 5s), and one interval is the worst-case wait.
    pub fn max_sweep_interval(&self) -> Duration {
        self.idle_timeout * 2 / 5
    }
}
