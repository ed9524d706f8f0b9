//! One complete enumerate-evaluate-terminate-log pass.

use chrono::Local;
use colored::*;
use tabled::{Table, Tabled};

use crate::config::WatchTarget;
use crate::error::WatchError;
use crate::inspector::{Inspect, ProcessSnapshot};
use crate::record::KillRecord;
use crate::sink::LogSink;
use crate::terminator::Terminate;

/// What one cycle produced. Lives only as long as the invocation.
#[derive(Debug, Default)]
pub struct CycleResult {
    /// How many processes matched the target name.
    pub matched: usize,
    /// One record per process observed past its lifetime, in enumeration
    /// order.
    pub records: Vec<KillRecord>,
}

/// Stateless orchestrator for a single check pass. Holds the collaborators,
/// but nothing carries over between invocations of `run`.
pub struct MonitorCycle<I, T, S> {
    inspector: I,
    terminator: T,
    sink: S,
    report: bool,
}

impl<I: Inspect, T: Terminate, S: LogSink> MonitorCycle<I, T, S> {
    pub fn new(inspector: I, terminator: T, sink: S) -> Self {
        Self {
            inspector,
            terminator,
            sink,
            report: true,
        }
    }

    /// Suppress the human-readable console report.
    pub fn silent(mut self) -> Self {
        self.report = false;
        self
    }

    /// Run one pass against the target. Per-process failures are contained
    /// to that process; a failed log append drops the batch but never
    /// propagates out of the cycle.
    pub fn run(&mut self, target: &WatchTarget) -> CycleResult {
        self.print_banner();

        let snapshots = self.inspector.list_by_name(&target.process_name);
        if snapshots.is_empty() {
            if self.report {
                println!(
                    "\nNo processes named '{}' are currently running.\n",
                    target.process_name
                );
            }
            return CycleResult::default();
        }

        if self.report {
            let rows: Vec<ProcessRow> = snapshots.iter().map(ProcessRow::from).collect();
            println!("\n{}", Table::new(rows));
        }

        let mut records = Vec::new();
        for snapshot in &snapshots {
            if let Some(record) = self.evaluate(snapshot, target) {
                records.push(record);
            }
        }

        if !records.is_empty() {
            let batch: String = records.iter().map(KillRecord::render).collect();
            if let Err(err) = self.sink.append(&batch) {
                // Known limitation: the batch for this cycle is dropped.
                log::error!("{}", err);
                if self.report {
                    eprintln!("{}", err.to_string().red());
                }
            }
        }

        CycleResult {
            matched: snapshots.len(),
            records,
        }
    }

    /// Decide the fate of one snapshot. Returns a record only when the
    /// process was observed past its lifetime, whatever the kill outcome.
    fn evaluate(&mut self, snapshot: &ProcessSnapshot, target: &WatchTarget) -> Option<KillRecord> {
        let runtime_minutes = snapshot.runtime_minutes();

        // Strict inequality: a process at exactly the limit survives.
        if runtime_minutes <= target.max_lifetime_mins as f64 {
            return None;
        }

        if self.report {
            println!(
                "\nProcess Killing - {} (PID: {})",
                snapshot.name.yellow(),
                snapshot.pid
            );
            println!("--------------------------------------------------");
            println!("   Status  : {}", "Killing".red());
            println!("   Runtime : {:.2} minutes", runtime_minutes);
        }

        match self.terminator.terminate(snapshot, snapshot.runtime()) {
            Ok(record) => Some(record),
            Err(WatchError::TerminationFailed {
                already_exited: true,
                ..
            }) => {
                // Already gone; the outcome matches intent, so record the
                // kill as such.
                Some(KillRecord::killed(
                    &snapshot.name,
                    snapshot.pid,
                    runtime_minutes,
                ))
            }
            Err(err @ WatchError::TerminationFailed { .. }) => {
                log::warn!("{}", err);
                Some(KillRecord::refused(
                    &snapshot.name,
                    snapshot.pid,
                    runtime_minutes,
                ))
            }
            Err(err) => {
                // Anything else is contained to this process.
                log::error!("skipping {} (PID: {}): {}", snapshot.name, snapshot.pid, err);
                None
            }
        }
    }

    fn print_banner(&self) {
        if !self.report {
            return;
        }
        println!("===================================================================");
        println!("{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"));
        println!("{}", "NEW PROCESS CHECK".cyan());
        println!("===================================================================");
    }
}

#[derive(Tabled)]
struct ProcessRow {
    #[tabled(rename = "PID")]
    pid: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Runtime (min)")]
    runtime: String,
    #[tabled(rename = "Memory (MB)")]
    memory: String,
    #[tabled(rename = "CPU time (s)")]
    cpu_time: String,
}

impl From<&ProcessSnapshot> for ProcessRow {
    fn from(snapshot: &ProcessSnapshot) -> Self {
        Self {
            pid: snapshot.pid,
            name: snapshot.name.clone(),
            status: if snapshot.responding {
                snapshot.status.clone()
            } else {
                format!("{} (not responding)", snapshot.status)
            },
            runtime: format!("{:.2}", snapshot.runtime_minutes()),
            memory: format!("{:.1}", snapshot.memory_bytes as f64 / (1024.0 * 1024.0)),
            cpu_time: format!("{:.1}", snapshot.cpu_time_ms as f64 / 1000.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn snapshot(name: &str, pid: u32, run_time_secs: u64) -> ProcessSnapshot {
        ProcessSnapshot {
            pid,
            name: name.to_string(),
            start_time_secs: 0,
            run_time_secs,
            status: "Run".to_string(),
            responding: true,
            memory_bytes: 1024 * 1024,
            virtual_memory_bytes: 2048 * 1024,
            cpu_time_ms: 500,
        }
    }

    struct FakeInspector {
        snapshots: Vec<ProcessSnapshot>,
    }

    impl Inspect for FakeInspector {
        fn list_by_name(&mut self, _name: &str) -> Vec<ProcessSnapshot> {
            self.snapshots.clone()
        }
    }

    enum KillOutcome {
        Killed,
        AlreadyExited,
        Refused,
    }

    struct FakeTerminator {
        outcome: KillOutcome,
        calls: Rc<RefCell<Vec<u32>>>,
    }

    impl Terminate for FakeTerminator {
        fn terminate(
            &mut self,
            snapshot: &ProcessSnapshot,
            runtime: Duration,
        ) -> Result<KillRecord> {
            self.calls.borrow_mut().push(snapshot.pid);
            match self.outcome {
                KillOutcome::Killed => Ok(KillRecord::killed(
                    &snapshot.name,
                    snapshot.pid,
                    runtime.as_secs_f64() / 60.0,
                )),
                KillOutcome::AlreadyExited => Err(WatchError::TerminationFailed {
                    pid: snapshot.pid,
                    already_exited: true,
                }),
                KillOutcome::Refused => Err(WatchError::TerminationFailed {
                    pid: snapshot.pid,
                    already_exited: false,
                }),
            }
        }
    }

    /// Reports one pid as vanished mid-inspection and kills the rest.
    struct VanishingTerminator {
        vanish_pid: u32,
        calls: Rc<RefCell<Vec<u32>>>,
    }

    impl Terminate for VanishingTerminator {
        fn terminate(
            &mut self,
            snapshot: &ProcessSnapshot,
            runtime: Duration,
        ) -> Result<KillRecord> {
            self.calls.borrow_mut().push(snapshot.pid);
            if snapshot.pid == self.vanish_pid {
                Err(WatchError::ProcessVanished(snapshot.pid))
            } else {
                Ok(KillRecord::killed(
                    &snapshot.name,
                    snapshot.pid,
                    runtime.as_secs_f64() / 60.0,
                ))
            }
        }
    }

    struct RecordingSink {
        appends: Rc<RefCell<Vec<String>>>,
    }

    impl LogSink for RecordingSink {
        fn append(&mut self, text: &str) -> Result<()> {
            self.appends.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    struct FailingSink;

    impl LogSink for FailingSink {
        fn append(&mut self, _text: &str) -> Result<()> {
            Err(WatchError::LogWriteFailed(std::io::Error::new(
                std::io::ErrorKind::Other,
                "store unavailable",
            )))
        }
    }

    fn cycle_with(
        snapshots: Vec<ProcessSnapshot>,
        outcome: KillOutcome,
    ) -> (
        MonitorCycle<FakeInspector, FakeTerminator, RecordingSink>,
        Rc<RefCell<Vec<u32>>>,
        Rc<RefCell<Vec<String>>>,
    ) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let appends = Rc::new(RefCell::new(Vec::new()));
        let cycle = MonitorCycle::new(
            FakeInspector { snapshots },
            FakeTerminator {
                outcome,
                calls: Rc::clone(&calls),
            },
            RecordingSink {
                appends: Rc::clone(&appends),
            },
        )
        .silent();
        (cycle, calls, appends)
    }

    #[test]
    fn test_over_lifetime_kills_and_logs_once() {
        // 90 seconds of runtime against a 1-minute lifetime.
        let (mut cycle, calls, appends) =
            cycle_with(vec![snapshot("sample", 10, 90)], KillOutcome::Killed);
        let result = cycle.run(&WatchTarget::new("sample", 1));

        assert_eq!(result.matched, 1);
        assert_eq!(result.records.len(), 1);
        assert!(result.records[0].message.contains("sample"));
        assert!(result.records[0].message.contains("was killed"));

        assert_eq!(calls.borrow().as_slice(), &[10]);
        let appends = appends.borrow();
        assert_eq!(appends.len(), 1);
        assert!(!appends[0].is_empty());
    }

    #[test]
    fn test_under_lifetime_is_left_alone() {
        // 30 seconds of runtime against a 1-minute lifetime.
        let (mut cycle, calls, appends) =
            cycle_with(vec![snapshot("sample", 10, 30)], KillOutcome::Killed);
        let result = cycle.run(&WatchTarget::new("sample", 1));

        assert_eq!(result.matched, 1);
        assert!(result.records.is_empty());
        assert!(calls.borrow().is_empty());
        assert!(appends.borrow().is_empty());
    }

    #[test]
    fn test_exactly_at_lifetime_is_not_killed() {
        let (mut cycle, calls, _) =
            cycle_with(vec![snapshot("sample", 10, 60)], KillOutcome::Killed);
        let result = cycle.run(&WatchTarget::new("sample", 1));

        assert!(result.records.is_empty());
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_no_matches_yields_empty_result_and_no_writes() {
        let (mut cycle, calls, appends) = cycle_with(vec![], KillOutcome::Killed);
        let result = cycle.run(&WatchTarget::new("sample", 1));

        assert_eq!(result.matched, 0);
        assert!(result.records.is_empty());
        assert!(calls.borrow().is_empty());
        assert!(appends.borrow().is_empty());
    }

    #[test]
    fn test_already_exited_still_produces_kill_record() {
        let (mut cycle, _, appends) =
            cycle_with(vec![snapshot("sample", 10, 90)], KillOutcome::AlreadyExited);
        let result = cycle.run(&WatchTarget::new("sample", 1));

        assert_eq!(result.records.len(), 1);
        assert!(result.records[0].message.contains("was killed"));
        assert_eq!(appends.borrow().len(), 1);
    }

    #[test]
    fn test_refused_kill_produces_annotated_record() {
        let (mut cycle, _, appends) =
            cycle_with(vec![snapshot("sample", 10, 90)], KillOutcome::Refused);
        let result = cycle.run(&WatchTarget::new("sample", 1));

        assert_eq!(result.records.len(), 1);
        assert!(result.records[0].message.contains("refused"));
        assert_eq!(appends.borrow().len(), 1);
    }

    #[test]
    fn test_multiple_kills_batched_into_single_append() {
        let (mut cycle, calls, appends) = cycle_with(
            vec![snapshot("sample", 10, 90), snapshot("sample", 11, 120)],
            KillOutcome::Killed,
        );
        let result = cycle.run(&WatchTarget::new("sample", 1));

        assert_eq!(result.records.len(), 2);
        assert_eq!(calls.borrow().len(), 2);
        // One store operation per cycle, however many kills happened.
        let appends = appends.borrow();
        assert_eq!(appends.len(), 1);
        assert!(appends[0].contains("PID: 10"));
        assert!(appends[0].contains("PID: 11"));
    }

    #[test]
    fn test_mixed_runtimes_only_overdue_killed() {
        let (mut cycle, calls, _) = cycle_with(
            vec![snapshot("sample", 10, 30), snapshot("sample", 11, 90)],
            KillOutcome::Killed,
        );
        let result = cycle.run(&WatchTarget::new("sample", 1));

        assert_eq!(result.matched, 2);
        assert_eq!(result.records.len(), 1);
        assert_eq!(calls.borrow().as_slice(), &[11]);
    }

    #[test]
    fn test_vanished_process_does_not_stop_the_rest_of_the_cycle() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let appends = Rc::new(RefCell::new(Vec::new()));
        let mut cycle = MonitorCycle::new(
            FakeInspector {
                snapshots: vec![snapshot("sample", 10, 90), snapshot("sample", 11, 120)],
            },
            VanishingTerminator {
                vanish_pid: 10,
                calls: Rc::clone(&calls),
            },
            RecordingSink {
                appends: Rc::clone(&appends),
            },
        )
        .silent();

        let result = cycle.run(&WatchTarget::new("sample", 1));

        // The vanished process produces no record, the survivor still does.
        assert_eq!(result.matched, 2);
        assert_eq!(calls.borrow().as_slice(), &[10, 11]);
        assert_eq!(result.records.len(), 1);
        assert!(result.records[0].message.contains("PID: 11"));

        let appends = appends.borrow();
        assert_eq!(appends.len(), 1);
        assert!(appends[0].contains("PID: 11"));
        assert!(!appends[0].contains("PID: 10"));
    }

    #[test]
    fn test_failed_append_does_not_panic_and_keeps_records() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut cycle = MonitorCycle::new(
            FakeInspector {
                snapshots: vec![snapshot("sample", 10, 90)],
            },
            FakeTerminator {
                outcome: KillOutcome::Killed,
                calls: Rc::clone(&calls),
            },
            FailingSink,
        )
        .silent();

        let result = cycle.run(&WatchTarget::new("sample", 1));
        assert_eq!(result.records.len(), 1);
    }
}
