// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! The clock primitive.
//!
//! All simulated time is measured in units of a fixed-cost busy loop. No
//! sleeping and no syscalls: one unit is a constant amount of CPU work, so
//! its wall-clock cost only depends on which process owns the core.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::types::TimeUnits;

/// Loop iterations making up one time unit.
pub const DEFAULT_UNIT_ITERATIONS: u64 = 1_000_000;

/// Burn exactly `iterations` loop iterations of CPU time.
pub fn time_unit(iterations: u64) {
    let mut i = 0u64;
    while i < iterations {
        i = std::hint::black_box(i + 1);
    }
}

/// Source of simulated time ticks for the scheduler.
pub trait Clock {
    /// Advance the clock by one time unit.
    fn tick(&mut self);
}

/// Production clock: every tick burns one real time unit.
#[derive(Debug, Clone)]
pub struct BusyClock {
    iterations: u64,
}

impl BusyClock {
    pub fn new(iterations: u64) -> Self {
        Self { iterations }
    }
}

impl Default for BusyClock {
    fn default() -> Self {
        Self::new(DEFAULT_UNIT_ITERATIONS)
    }
}

impl Clock for BusyClock {
    fn tick(&mut self) {
        time_unit(self.iterations);
    }
}

/// Test clock: counts ticks instead of burning CPU.
///
/// Clones share the same counter, so an in-process backend can read the
/// current simulated time while the scheduler owns the clock.
#[derive(Debug, Clone, Default)]
pub struct CountingClock {
    ticks: Arc<AtomicU64>,
}

impl CountingClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ticks taken so far.
    pub fn now(&self) -> TimeUnits {
        self.ticks.load(Ordering::Relaxed)
    }
}

impl Clock for CountingClock {
    fn tick(&mut self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }
}
