//! Error types for the watchdog.
//!
//! Every failure in the monitoring path is recoverable at the scope of a
//! single process or a single cycle; only `InvalidConfiguration` is fatal.

use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, WatchError>;

#[derive(Debug)]
pub enum WatchError {
    /// The process disappeared between enumeration and inspection.
    ProcessVanished(u32),
    /// The OS did not carry out a kill request. `already_exited` separates
    /// "nothing left to kill" from a genuine refusal.
    TerminationFailed { pid: u32, already_exited: bool },
    /// Appending to the kill log failed; the cycle's batch is dropped.
    LogWriteFailed(io::Error),
    /// Malformed startup parameters. No cycle runs after this.
    InvalidConfiguration(String),
}

impl fmt::Display for WatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchError::ProcessVanished(pid) => {
                write!(f, "process {} vanished before it could be inspected", pid)
            }
            WatchError::TerminationFailed {
                pid,
                already_exited: true,
            } => write!(f, "process {} had already exited", pid),
            WatchError::TerminationFailed {
                pid,
                already_exited: false,
            } => write!(f, "the OS refused to terminate process {}", pid),
            WatchError::LogWriteFailed(err) => write!(f, "failed to write kill log: {}", err),
            WatchError::InvalidConfiguration(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for WatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WatchError::LogWriteFailed(err) => Some(err),
            _ => None,
        }
    }
}
