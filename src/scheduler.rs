//! Fixed-period scheduling with cooperative cancellation.

use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use crate::config::WatchTarget;
use crate::cycle::{CycleResult, MonitorCycle};
use crate::inspector::Inspect;
use crate::sink::LogSink;
use crate::terminator::Terminate;

/// What a completed scheduling run looked like.
#[derive(Debug)]
pub struct ScheduleSummary {
    /// Cycles that ran to completion.
    pub cycles: usize,
    /// Kill records produced across all cycles.
    pub kills: usize,
    /// Wall time from the first cycle to shutdown.
    pub elapsed: Duration,
}

/// Drives `MonitorCycle` on a fixed period: one immediate check, then one per
/// period until the cancel flag is set.
///
/// Cycles run synchronously on the calling thread, so at most one cycle is
/// ever in flight. A cycle that outlives the period causes the missed tick
/// to be skipped; the next wait is anchored to the completion time.
pub struct Scheduler {
    period: Duration,
    poll_interval: Duration,
    cancel: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            poll_interval: Duration::from_millis(50),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// How often the waiting loop re-checks the cancel flag. Shutdown lags
    /// by at most this much once requested.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Shared cancel flag; hand clones to signal handlers and listeners.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Run until cancelled, invoking `processor` with each cycle's result.
    pub fn run_with_processor<I, T, S, F>(
        &self,
        cycle: &mut MonitorCycle<I, T, S>,
        target: &WatchTarget,
        mut processor: F,
    ) -> ScheduleSummary
    where
        I: Inspect,
        T: Terminate,
        S: LogSink,
        F: FnMut(&CycleResult),
    {
        let start = Instant::now();
        let mut cycles = 0;
        let mut kills = 0;

        while !self.cancelled() {
            let result = cycle.run(target);
            cycles += 1;
            kills += result.records.len();
            processor(&result);

            // Anchor the next deadline to completion, not to the previous
            // tick: an overrunning cycle skips its missed tick instead of
            // draining a backlog.
            let deadline = Instant::now() + self.period;
            loop {
                if self.cancelled() {
                    return ScheduleSummary {
                        cycles,
                        kills,
                        elapsed: start.elapsed(),
                    };
                }
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                thread::sleep(remaining.min(self.poll_interval));
            }
        }

        ScheduleSummary {
            cycles,
            kills,
            elapsed: start.elapsed(),
        }
    }

    /// Run until cancelled, discarding per-cycle results.
    pub fn run<I, T, S>(
        &self,
        cycle: &mut MonitorCycle<I, T, S>,
        target: &WatchTarget,
    ) -> ScheduleSummary
    where
        I: Inspect,
        T: Terminate,
        S: LogSink,
    {
        self.run_with_processor(cycle, target, |_| {})
    }
}

/// Watch the terminal for the exit key on a dedicated thread and set the
/// cancel flag when it arrives. Returns immediately when stdin is not a
/// terminal; in that mode the watchdog can only be stopped externally.
///
/// A missed poll only delays shutdown by one interval; it never affects what
/// gets killed.
pub fn spawn_exit_key_listener(
    exit_key: char,
    cancel: Arc<AtomicBool>,
    poll_interval: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        if !std::io::stdin().is_terminal() {
            log::debug!("stdin is not a terminal; exit key listener disabled");
            return;
        }
        while !cancel.load(Ordering::SeqCst) {
            match event::poll(poll_interval) {
                Ok(true) => {
                    if let Ok(Event::Key(key)) = event::read() {
                        if key.kind == KeyEventKind::Press && key.code == KeyCode::Char(exit_key) {
                            cancel.store(true, Ordering::SeqCst);
                            return;
                        }
                    }
                }
                Ok(false) => {}
                Err(err) => {
                    log::debug!("exit key listener stopping: {}", err);
                    return;
                }
            }
        }
    })
}
