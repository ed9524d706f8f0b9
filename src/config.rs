//! Watchdog configuration.
//!
//! All parameters are supplied once at startup and passed explicitly into
//! each scheduler/cycle invocation; nothing here is global or mutated after
//! `build()`.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, WatchError};

/// The process name being watched and the lifetime it must not exceed.
#[derive(Debug, Clone)]
pub struct WatchTarget {
    /// Exact process name to match during enumeration.
    pub process_name: String,
    /// Maximum permitted elapsed runtime, in whole minutes. A process is
    /// killed only when its runtime strictly exceeds this value.
    pub max_lifetime_mins: u64,
}

impl WatchTarget {
    pub fn new(process_name: impl Into<String>, max_lifetime_mins: u64) -> Self {
        Self {
            process_name: process_name.into(),
            max_lifetime_mins,
        }
    }
}

/// Full watchdog configuration: the target plus scheduling and output knobs.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub target: WatchTarget,
    /// Period between the start of one check and the next.
    pub check_interval: Duration,
    /// How often the scheduler and the exit-key listener look at the cancel
    /// flag while waiting. Bounds shutdown latency, nothing else.
    pub cancel_poll_interval: Duration,
    /// Where kill records are appended.
    pub log_path: PathBuf,
    /// Key that requests shutdown when pressed on the controlling terminal.
    pub exit_key: char,
}

impl WatchConfig {
    pub fn builder() -> WatchConfigBuilder {
        WatchConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.target.process_name.is_empty() {
            return Err(WatchError::InvalidConfiguration(
                "process name cannot be empty".to_string(),
            ));
        }
        if self.check_interval.is_zero() {
            return Err(WatchError::InvalidConfiguration(
                "check interval must be positive".to_string(),
            ));
        }
        if self.cancel_poll_interval.is_zero() {
            return Err(WatchError::InvalidConfiguration(
                "cancel poll interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for `WatchConfig`.
#[derive(Debug, Clone)]
pub struct WatchConfigBuilder {
    process_name: String,
    max_lifetime_mins: u64,
    check_interval: Duration,
    cancel_poll_interval: Duration,
    log_path: PathBuf,
    exit_key: char,
}

impl Default for WatchConfigBuilder {
    fn default() -> Self {
        Self {
            process_name: String::new(),
            max_lifetime_mins: 0,
            check_interval: Duration::from_secs(60),
            cancel_poll_interval: Duration::from_millis(50),
            log_path: PathBuf::from("logs.txt"),
            exit_key: 'q',
        }
    }
}

impl WatchConfigBuilder {
    pub fn process_name(mut self, name: impl Into<String>) -> Self {
        self.process_name = name.into();
        self
    }

    pub fn max_lifetime_mins(mut self, mins: u64) -> Self {
        self.max_lifetime_mins = mins;
        self
    }

    pub fn check_interval_mins(mut self, mins: u64) -> Self {
        self.check_interval = Duration::from_secs(mins * 60);
        self
    }

    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn cancel_poll_interval(mut self, interval: Duration) -> Self {
        self.cancel_poll_interval = interval;
        self
    }

    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    pub fn exit_key(mut self, key: char) -> Self {
        self.exit_key = key;
        self
    }

    pub fn build(self) -> Result<WatchConfig> {
        let config = WatchConfig {
            target: WatchTarget::new(self.process_name, self.max_lifetime_mins),
            check_interval: self.check_interval,
            cancel_poll_interval: self.cancel_poll_interval,
            log_path: self.log_path,
            exit_key: self.exit_key,
        };
        config.validate()?;
        Ok(config)
    }
}
