//! Unconditional process termination.

use std::time::Duration;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::error::{Result, WatchError};
use crate::inspector::ProcessSnapshot;
use crate::record::KillRecord;

/// Requests OS-level termination of a process that exceeded its lifetime.
/// No grace period and no signal negotiation; the process is not asked.
pub trait Terminate {
    fn terminate(&mut self, snapshot: &ProcessSnapshot, runtime: Duration) -> Result<KillRecord>;
}

/// `sysinfo`-backed terminator (SIGKILL on Unix, `TerminateProcess` on
/// Windows).
pub struct SysTerminator {
    sys: System,
}

impl SysTerminator {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }

    fn refresh_pid(&mut self, pid: Pid) {
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing(),
        );
    }
}

impl Default for SysTerminator {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminate for SysTerminator {
    fn terminate(&mut self, snapshot: &ProcessSnapshot, runtime: Duration) -> Result<KillRecord> {
        let pid = Pid::from_u32(snapshot.pid);

        self.refresh_pid(pid);
        let process = match self.sys.process(pid) {
            Some(p) => p,
            None => {
                return Err(WatchError::TerminationFailed {
                    pid: snapshot.pid,
                    already_exited: true,
                })
            }
        };

        if process.kill() {
            return Ok(KillRecord::killed(
                &snapshot.name,
                snapshot.pid,
                runtime.as_secs_f64() / 60.0,
            ));
        }

        // kill() returning false can mean either a refusal or a process that
        // exited on its own between the refresh and the signal. Re-check so
        // the two outcomes stay distinguishable for the caller.
        self.refresh_pid(pid);
        Err(WatchError::TerminationFailed {
            pid: snapshot.pid,
            already_exited: self.sys.process(pid).is_none(),
        })
    }
}
