//! Process enumeration and snapshotting.

use std::ffi::OsStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use sysinfo::{ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};

use crate::error::WatchError;

/// Point-in-time view of one matching process. All fields come from a single
/// refresh, discarded after the cycle that read it.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub name: String,
    /// Seconds since the Unix epoch at which the process started.
    pub start_time_secs: u64,
    /// Elapsed runtime in seconds, floored at zero under clock skew.
    pub run_time_secs: u64,
    pub status: String,
    /// False for zombie/dead processes; there is no portable equivalent of a
    /// UI responsiveness probe.
    pub responding: bool,
    pub memory_bytes: u64,
    pub virtual_memory_bytes: u64,
    /// Accumulated user + kernel CPU time, in milliseconds.
    pub cpu_time_ms: u64,
}

impl ProcessSnapshot {
    pub fn runtime(&self) -> Duration {
        Duration::from_secs(self.run_time_secs)
    }

    pub fn runtime_minutes(&self) -> f64 {
        self.run_time_secs as f64 / 60.0
    }
}

/// Enumerates processes by exact name. Zero matches is a normal outcome and
/// yields an empty vec, never an error.
pub trait Inspect {
    fn list_by_name(&mut self, name: &str) -> Vec<ProcessSnapshot>;
}

/// `sysinfo`-backed inspector.
pub struct SysInspector {
    sys: System,
}

impl SysInspector {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl Default for SysInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl Inspect for SysInspector {
    fn list_by_name(&mut self, name: &str) -> Vec<ProcessSnapshot> {
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::everything(),
        );

        let now_epoch_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let pids: Vec<sysinfo::Pid> = self
            .sys
            .processes_by_exact_name(OsStr::new(name))
            .map(|p| p.pid())
            .collect();

        let mut snapshots = Vec::with_capacity(pids.len());
        for pid in pids {
            match self.sys.process(pid) {
                Some(process) => {
                    let status = process.status();
                    snapshots.push(ProcessSnapshot {
                        pid: pid.as_u32(),
                        name: process.name().to_string_lossy().to_string(),
                        start_time_secs: process.start_time(),
                        run_time_secs: runtime_secs(now_epoch_secs, process.start_time()),
                        status: status.to_string(),
                        responding: !matches!(
                            status,
                            ProcessStatus::Zombie | ProcessStatus::Dead
                        ),
                        memory_bytes: process.memory(),
                        virtual_memory_bytes: process.virtual_memory(),
                        cpu_time_ms: process.accumulated_cpu_time(),
                    });
                }
                // Lost the race against process exit; skip this one and keep
                // going with the rest of the cycle.
                None => {
                    log::debug!("{}", WatchError::ProcessVanished(pid.as_u32()));
                }
            }
        }
        snapshots
    }
}

/// Elapsed seconds between process start and now. An OS clock stepping
/// backwards would make this negative, so it is floored at zero instead.
pub(crate) fn runtime_secs(now_epoch_secs: u64, start_epoch_secs: u64) -> u64 {
    now_epoch_secs.saturating_sub(start_epoch_secs)
}
