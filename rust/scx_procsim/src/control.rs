// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Process control: the contract between the scheduler and whatever
//! actually executes a simulated process.
//!
//! The scheduler never touches OS primitives itself. It spawns, resumes,
//! suspends, advances and reaps processes through an `ExecBackend`, which
//! is either the real one (`OsBackend`, one forked process per item) or the
//! in-process `SimBackend` used by tests.

use anyhow::Result;
use nix::errno::Errno;
use nix::sched::{sched_setaffinity, CpuSet};
use nix::unistd::Pid;

use crate::error::Fatal;
use crate::types::ItemIdx;
use crate::workload::WorkloadItem;

/// Operations the scheduler needs from an execution backend.
///
/// Only `spawn` may fail fatally. `suspend`/`resume` failures degrade OS
/// level enforcement but leave simulated state intact, so the scheduler
/// logs them and continues.
pub trait ExecBackend {
    /// Backend-specific handle of a spawned process.
    type Handle;

    /// Create a process for `item`, pinned and parked in the idle class.
    fn spawn(&mut self, idx: ItemIdx, item: &WorkloadItem) -> Result<Self::Handle>;

    /// Lower the process to the idle scheduling class.
    fn suspend(&mut self, handle: &Self::Handle) -> Result<()>;

    /// Raise the process back to the normal scheduling class.
    fn resume(&mut self, handle: &Self::Handle) -> Result<()>;

    /// Hand the process one token, authorizing exactly one unit of work.
    ///
    /// Must only be called on a resumed process with work remaining.
    fn run_one_unit(&mut self, handle: &mut Self::Handle) -> Result<()>;

    /// Wait for the process to exit. Called exactly once per handle, after
    /// its last unit.
    fn reap(&mut self, handle: Self::Handle) -> Result<()>;

    /// OS identifier of the process, for diagnostics.
    fn pid(&self, handle: &Self::Handle) -> i32;
}

/// Restrict `pid` (0 for the caller) to a single core.
pub fn pin_to_core(pid: Pid, core: usize) -> Result<()> {
    if core >= CpuSet::count() {
        return Err(Fatal::Affinity {
            core,
            errno: Errno::EINVAL,
        }
        .into());
    }
    let mut set = CpuSet::new();
    set.set(core)
        .map_err(|errno| Fatal::Affinity { core, errno })?;
    sched_setaffinity(pid, &set).map_err(|errno| Fatal::Affinity { core, errno })?;
    Ok(())
}

/// Switch `pid` to the given scheduling class at static priority zero.
fn set_sched_class(pid: Pid, class: libc::c_int) -> Result<(), Errno> {
    let param = libc::sched_param { sched_priority: 0 };
    let ret = unsafe { libc::sched_setscheduler(pid.as_raw(), class, &param) };
    if ret < 0 {
        return Err(Errno::last());
    }
    Ok(())
}

/// Park `pid` in `SCHED_IDLE` so it only runs when nothing else wants the
/// core.
pub fn set_idle_class(pid: Pid) -> Result<()> {
    set_sched_class(pid, libc::SCHED_IDLE)
        .map_err(|e| anyhow::anyhow!("sched_setscheduler(SCHED_IDLE, {}): {}", pid, e))
}

/// Return `pid` to `SCHED_OTHER`.
pub fn set_normal_class(pid: Pid) -> Result<()> {
    set_sched_class(pid, libc::SCHED_OTHER)
        .map_err(|e| anyhow::anyhow!("sched_setscheduler(SCHED_OTHER, {}): {}", pid, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_rejects_out_of_range_core() {
        let err = pin_to_core(Pid::from_raw(0), CpuSet::count()).unwrap_err();
        assert_eq!(Fatal::exit_code_of(&err), 4);
    }

    #[test]
    fn sched_class_errors_are_reported() {
        // No process can have a negative pid.
        assert!(set_idle_class(Pid::from_raw(-1)).is_err());
        assert!(set_normal_class(Pid::from_raw(-1)).is_err());
    }
}
