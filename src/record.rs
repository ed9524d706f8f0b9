//! Kill records and their durable textual rendering.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::Serialize;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One termination event. Created once per killed process, immutable
/// afterwards, and consumed exactly once by the log sink.
#[derive(Debug, Clone, Serialize)]
pub struct KillRecord {
    pub timestamp: DateTime<Local>,
    pub process_name: String,
    pub pid: u32,
    pub runtime_minutes: f64,
    pub message: String,
}

impl KillRecord {
    /// Record for a successful kill (or one where the process was already
    /// gone, which matches intent).
    pub fn killed(process_name: &str, pid: u32, runtime_minutes: f64) -> Self {
        Self {
            timestamp: Local::now(),
            process_name: process_name.to_string(),
            pid,
            runtime_minutes,
            message: format!("{} (PID: {}) was killed", process_name, pid),
        }
    }

    /// Record for a detected lifetime violation where the OS refused the
    /// kill request. The violation is logged rather than silently dropped.
    pub fn refused(process_name: &str, pid: u32, runtime_minutes: f64) -> Self {
        Self {
            timestamp: Local::now(),
            process_name: process_name.to_string(),
            pid,
            runtime_minutes,
            message: format!(
                "{} (PID: {}) exceeded its lifetime but the kill request was refused",
                process_name, pid
            ),
        }
    }

    /// Render the record in the durable log format: timestamp line, message
    /// line, runtime line, trailing blank line.
    pub fn render(&self) -> String {
        format!(
            "{}\n{}\nRan for {:.2} minutes\n\n",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.message,
            self.runtime_minutes
        )
    }

    /// Parse one rendered record back. Returns `None` on anything that does
    /// not look like the output of `render()`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut lines = text.lines();
        let timestamp_line = lines.next()?;
        let message = lines.next()?.to_string();
        let runtime_line = lines.next()?;

        let naive = NaiveDateTime::parse_from_str(timestamp_line, TIMESTAMP_FORMAT).ok()?;
        let timestamp = Local.from_local_datetime(&naive).single()?;

        // The rendered marker is the last one; the process name itself may
        // contain " (PID: ".
        let (process_name, rest) = message.rsplit_once(" (PID: ")?;
        let pid: u32 = rest.split_once(')')?.0.parse().ok()?;

        let runtime_minutes: f64 = runtime_line
            .strip_prefix("Ran for ")?
            .strip_suffix(" minutes")?
            .parse()
            .ok()?;

        Some(Self {
            timestamp,
            process_name: process_name.to_string(),
            pid,
            runtime_minutes,
            message,
        })
    }
}
