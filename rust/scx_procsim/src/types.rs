// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Newtype wrappers and type aliases shared by the scheduler and backends.

/// Simulated time, counted in clock units.
pub type TimeUnits = u64;

/// Position of an item in the workload list.
///
/// List position is the tie-breaker for every policy, so it is kept as a
/// distinct type rather than a bare `usize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemIdx(pub usize);

/// Lifecycle of a simulated process.
///
/// `NotCreated -> Suspended` happens once on spawn, `Suspended <-> Runnable`
/// any number of times, and `Runnable -> Finished` once, when the remaining
/// time reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    /// No OS process exists yet.
    NotCreated,
    /// Spawned, parked in the idle scheduling class.
    Suspended,
    /// In the normal scheduling class and allowed to consume tokens.
    Runnable,
    /// All work done and reaped.
    Finished,
}
