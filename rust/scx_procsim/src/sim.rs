//! In-process backend.
//!
//! Models each simulated process as a small state machine instead of a
//! forked process, so scheduler runs are fast and deterministic. It mirrors
//! the child side of the OS backend (start notice on the first token,
//! completion record when the private counter hits zero) and asserts every
//! rule of the process-control protocol, turning a scheduling bug into a
//! test failure.

use anyhow::Result;

use crate::clock::CountingClock;
use crate::control::ExecBackend;
use crate::sink::{CompletionRecord, CompletionSink, MemorySink, Timestamp};
use crate::types::{ItemIdx, ProcState, TimeUnits};
use crate::workload::WorkloadItem;

/// First pid handed out, to keep simulated pids away from real ones.
const FIRST_PID: i32 = 10_000;

#[derive(Debug)]
pub struct SimHandle {
    slot: usize,
}

#[derive(Debug)]
struct SimChild {
    idx: ItemIdx,
    name: String,
    pid: i32,
    ready_time: TimeUnits,
    remaining: TimeUnits,
    state: ProcState,
    started: Option<TimeUnits>,
}

/// Cooperative stand-in for real child processes.
pub struct SimBackend {
    clock: CountingClock,
    sink: MemorySink,
    children: Vec<SimChild>,
    notices: Vec<String>,
    fail_class_changes: bool,
}

impl SimBackend {
    /// `clock` must share its counter with the scheduler's clock.
    pub fn new(clock: &CountingClock) -> Self {
        Self {
            clock: clock.clone(),
            sink: MemorySink::new(),
            children: Vec::new(),
            notices: Vec::new(),
            fail_class_changes: false,
        }
    }

    /// Make every suspend/resume report failure, as an unprivileged run
    /// might. Simulated state is still updated.
    pub fn fail_class_changes(mut self, fail: bool) -> Self {
        self.fail_class_changes = fail;
        self
    }

    /// Completion records written so far.
    pub fn records(&self) -> Vec<CompletionRecord> {
        self.sink.records()
    }

    /// Start notices (`<name> <pid>`) in emission order.
    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    /// Number of processes spawned.
    pub fn spawned(&self) -> usize {
        self.children.len()
    }

    /// Number of spawned processes not yet reaped.
    pub fn live(&self) -> usize {
        self.children
            .iter()
            .filter(|c| c.state != ProcState::Finished)
            .count()
    }

    /// Simulated pid assigned to an item, if spawned.
    pub fn pid_of(&self, idx: ItemIdx) -> Option<i32> {
        self.children.iter().find(|c| c.idx == idx).map(|c| c.pid)
    }

    fn class_change(&mut self, slot: usize, from: ProcState, to: ProcState) -> Result<()> {
        let child = &mut self.children[slot];
        assert!(
            child.state == from || child.state == to,
            "{}: cannot move from {:?} to {:?}",
            child.name,
            child.state,
            to
        );
        child.state = to;
        if to == ProcState::Runnable {
            let runnable = self
                .children
                .iter()
                .filter(|c| c.state == ProcState::Runnable)
                .count();
            assert!(runnable <= 1, "{} processes runnable at once", runnable);
        }
        if self.fail_class_changes {
            anyhow::bail!("simulated sched_setscheduler failure");
        }
        Ok(())
    }
}

impl ExecBackend for SimBackend {
    type Handle = SimHandle;

    fn spawn(&mut self, idx: ItemIdx, item: &WorkloadItem) -> Result<SimHandle> {
        assert!(
            self.children.iter().all(|c| c.idx != idx),
            "{} spawned twice",
            item.name
        );
        let slot = self.children.len();
        self.children.push(SimChild {
            idx,
            name: item.name.clone(),
            pid: FIRST_PID + slot as i32,
            ready_time: item.ready_time,
            remaining: item.exec_time,
            state: ProcState::Suspended,
            started: None,
        });
        Ok(SimHandle { slot })
    }

    fn suspend(&mut self, handle: &SimHandle) -> Result<()> {
        self.class_change(handle.slot, ProcState::Runnable, ProcState::Suspended)
    }

    fn resume(&mut self, handle: &SimHandle) -> Result<()> {
        self.class_change(handle.slot, ProcState::Suspended, ProcState::Runnable)
    }

    fn run_one_unit(&mut self, handle: &mut SimHandle) -> Result<()> {
        let now = self.clock.now();
        let child = &mut self.children[handle.slot];
        assert_eq!(
            child.state,
            ProcState::Runnable,
            "{}: token sent while {:?}",
            child.name,
            child.state
        );
        assert!(child.remaining > 0, "{}: token sent after completion", child.name);
        assert!(
            now >= child.ready_time,
            "{}: ran at {} before ready time {}",
            child.name,
            now,
            child.ready_time
        );

        if child.started.is_none() {
            child.started = Some(now);
            self.notices.push(format!("{} {}", child.name, child.pid));
        }
        child.remaining -= 1;
        if child.remaining == 0 {
            let start = child.started.unwrap_or(now);
            let record = CompletionRecord {
                pid: child.pid,
                start: Timestamp::new(start as i64, 0),
                end: Timestamp::new(now as i64 + 1, 0),
            };
            self.sink.write_record(&record)?;
        }
        Ok(())
    }

    fn reap(&mut self, handle: SimHandle) -> Result<()> {
        let child = &mut self.children[handle.slot];
        assert_eq!(child.remaining, 0, "{}: reaped with work left", child.name);
        assert_ne!(child.state, ProcState::Finished, "{}: reaped twice", child.name);
        assert_eq!(
            child.state,
            ProcState::Runnable,
            "{}: finished while not runnable",
            child.name
        );
        child.state = ProcState::Finished;
        Ok(())
    }

    fn pid(&self, handle: &SimHandle) -> i32 {
        self.children[handle.slot].pid
    }
}
