// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! # Scheduling policies over real processes
//!
//! This crate maps every item of a workload onto its own OS process and
//! drives it one time unit at a time under one of four policies: FIFO,
//! non-preemptive shortest job first, preemptive shortest job first and
//! round robin.
//!
//! Serialization is enforced by the host scheduler rather than by an
//! in-memory clock: every simulated process is pinned to one shared core
//! and parked in `SCHED_IDLE`, and only the process currently chosen by the
//! policy is raised to `SCHED_OTHER`. The coordinator then hands it one
//! token per unit over a pipe.
//!
//! # Architecture
//!
//! - **Clock**: fixed-cost busy loop; all timing is counted in its units
//! - **Process control**: the `ExecBackend` contract, with `OsBackend`
//!   (fork/pipe/affinity/scheduling class) and the in-process `SimBackend`
//! - **Sinks**: where a finished process leaves its completion record
//! - **Scheduler**: the four policies, returning a `Trace` of every action
//!
//! # Usage
//!
//! ```rust,no_run
//! use scx_procsim::*;
//!
//! let items = vec![
//!     WorkloadItem::new("A", 0, 3),
//!     WorkloadItem::new("B", 1, 2),
//!     WorkloadItem::new("C", 2, 1),
//! ];
//! let config = SchedConfig::new(Policy::Psjf);
//! let backend = OsBackend::new(&config, Box::new(KmsgSink::default()));
//! let clock = BusyClock::new(config.unit_iterations);
//!
//! let trace = Scheduler::new(config, backend, clock).run(&items).unwrap();
//! trace.dump();
//! ```

pub mod clock;
pub mod config;
pub mod control;
pub mod error;
pub mod os;
pub mod process;
pub mod scheduler;
pub mod sim;
pub mod sink;
pub mod trace;
pub mod types;
pub mod workload;

pub use clock::{BusyClock, Clock, CountingClock};
pub use config::{Policy, SchedConfig};
pub use control::{pin_to_core, ExecBackend};
pub use error::Fatal;
pub use os::{OsBackend, OsHandle};
pub use process::SimProcess;
pub use scheduler::Scheduler;
pub use sim::{SimBackend, SimHandle};
pub use sink::{CompletionRecord, CompletionSink, KmsgSink, MemorySink, Timestamp};
pub use trace::{Segment, Trace, TraceEvent, TraceKind};
pub use types::{ItemIdx, ProcState, TimeUnits};
pub use workload::{load_workload, parse_workload, Workload, WorkloadItem};
