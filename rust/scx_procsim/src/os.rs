// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Real OS backend: one forked process per workload item.
//!
//! Each child is pinned to the shared child core and parked in
//! `SCHED_IDLE` right after creation. The parent keeps the write end of a
//! pipe and sends one token per unit; the child blocks on the read end,
//! burns one time unit per token and exits once its private copy of the
//! remaining time reaches zero, leaving a completion record behind.

use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::OwnedFd;

use anyhow::{Context, Result};
use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::wait::waitpid;
use nix::time::{clock_gettime, ClockId};
use nix::unistd::{fork, getpid, pipe, ForkResult, Pid};

use crate::clock::time_unit;
use crate::config::SchedConfig;
use crate::control::{pin_to_core, set_idle_class, set_normal_class, ExecBackend};
use crate::error::Fatal;
use crate::sink::{CompletionRecord, CompletionSink, Timestamp};
use crate::types::ItemIdx;
use crate::workload::WorkloadItem;

/// Token sent for every unit of work.
const TOKEN: &[u8] = b"run";

/// Child exit status when the parent went away before the work was done.
const EXIT_CHANNEL_CLOSED: i32 = 6;

/// Parent-side handle of a forked simulated process.
#[derive(Debug)]
pub struct OsHandle {
    pid: Pid,
    tokens: File,
}

impl OsHandle {
    pub fn pid(&self) -> Pid {
        self.pid
    }
}

pub struct OsBackend {
    child_core: usize,
    unit_iterations: u64,
    sink: Box<dyn CompletionSink>,
}

impl OsBackend {
    pub fn new(config: &SchedConfig, sink: Box<dyn CompletionSink>) -> Self {
        Self {
            child_core: config.child_core,
            unit_iterations: config.unit_iterations,
            sink,
        }
    }
}

fn now() -> Result<Timestamp, Fatal> {
    let ts = clock_gettime(ClockId::CLOCK_REALTIME).map_err(Fatal::Timestamp)?;
    Ok(Timestamp::new(ts.tv_sec() as i64, ts.tv_nsec() as i64))
}

/// Body of a simulated process. Returns the exit status.
fn child_main(
    item: &WorkloadItem,
    tokens: OwnedFd,
    unit_iterations: u64,
    sink: &mut dyn CompletionSink,
) -> i32 {
    let mut tokens = File::from(tokens);
    let mut remaining = item.exec_time;
    let mut start = None;
    let mut buf = [0u8; TOKEN.len()];

    while remaining > 0 {
        if tokens.read_exact(&mut buf).is_err() {
            return EXIT_CHANNEL_CLOSED;
        }
        if start.is_none() {
            match now() {
                Ok(ts) => start = Some(ts),
                Err(e) => {
                    eprintln!("{}: {}", item.name, e);
                    return e.exit_code();
                }
            }
            let mut stdout = std::io::stdout().lock();
            let _ = writeln!(stdout, "{} {}", item.name, getpid());
            let _ = stdout.flush();
        }
        time_unit(unit_iterations);
        remaining -= 1;
    }

    let end = match now() {
        Ok(ts) => ts,
        Err(e) => {
            eprintln!("{}: {}", item.name, e);
            return e.exit_code();
        }
    };
    let record = CompletionRecord {
        pid: getpid().as_raw(),
        start: start.unwrap_or(end),
        end,
    };
    if let Err(e) = sink.write_record(&record) {
        warn!("{}: failed to log completion: {:#}", item.name, e);
    }
    0
}

impl ExecBackend for OsBackend {
    type Handle = OsHandle;

    fn spawn(&mut self, idx: ItemIdx, item: &WorkloadItem) -> Result<OsHandle> {
        let (rx, tx) = pipe().map_err(Fatal::Pipe)?;

        match unsafe { fork() } {
            Err(errno) => Err(Fatal::Spawn(errno))
                .with_context(|| format!("spawning item {} ({})", idx.0, item.name)),
            Ok(ForkResult::Child) => {
                drop(tx);
                let code = child_main(item, rx, self.unit_iterations, self.sink.as_mut());
                std::process::exit(code);
            }
            Ok(ForkResult::Parent { child }) => {
                drop(rx);
                let handle = OsHandle {
                    pid: child,
                    tokens: File::from(tx),
                };
                if let Err(e) = set_idle_class(child) {
                    warn!("failed to park {} ({}): {:#}", item.name, child, e);
                }
                pin_to_core(child, self.child_core)
                    .with_context(|| format!("pinning {} ({})", item.name, child))?;
                debug!("spawned {} as {} on core {}", item.name, child, self.child_core);
                Ok(handle)
            }
        }
    }

    fn suspend(&mut self, handle: &OsHandle) -> Result<()> {
        set_idle_class(handle.pid)
    }

    fn resume(&mut self, handle: &OsHandle) -> Result<()> {
        set_normal_class(handle.pid)
    }

    fn run_one_unit(&mut self, handle: &mut OsHandle) -> Result<()> {
        handle
            .tokens
            .write_all(TOKEN)
            .with_context(|| format!("failed to send token to {}", handle.pid))
    }

    fn reap(&mut self, handle: OsHandle) -> Result<()> {
        let OsHandle { pid, tokens } = handle;
        drop(tokens);
        loop {
            match waitpid(pid, None) {
                Ok(_) => return Ok(()),
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e).with_context(|| format!("waitpid({}) failed", pid)),
            }
        }
    }

    fn pid(&self, handle: &OsHandle) -> i32 {
        handle.pid.as_raw()
    }
}
