//! preap — a process lifetime watchdog.
//!
//! Periodically scans the host for processes matching a configured name,
//! kills any match whose runtime exceeds the configured lifetime, and
//! appends one textual record per kill to a log file.

pub mod config;
pub mod cycle;
pub mod error;
pub mod inspector;
pub mod record;
pub mod scheduler;
pub mod sink;
pub mod terminator;

pub use config::{WatchConfig, WatchConfigBuilder, WatchTarget};
pub use cycle::{CycleResult, MonitorCycle};
pub use error::{Result, WatchError};
pub use inspector::{Inspect, ProcessSnapshot, SysInspector};
pub use record::KillRecord;
pub use scheduler::{spawn_exit_key_listener, ScheduleSummary, Scheduler};
pub use sink::{FileLogSink, LogSink};
pub use terminator::{SysTerminator, Terminate};
