// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Scheduler configuration.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;

use crate::clock::DEFAULT_UNIT_ITERATIONS;

/// Default core the simulated processes are pinned to.
pub const DEFAULT_CHILD_CORE: usize = 1;
/// Default core the coordinating process is pinned to.
pub const DEFAULT_PARENT_CORE: usize = 0;
/// Default round-robin quantum, in time units.
pub const DEFAULT_RR_QUANTUM: u64 = 500;

/// Admission/dispatch policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// First in, first out, in workload list order.
    Fifo,
    /// Non-preemptive shortest job first.
    Sjf,
    /// Preemptive shortest job first, re-evaluated every unit.
    Psjf,
    /// Round robin with a fixed quantum.
    Rr,
}

impl FromStr for Policy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FIFO" => Ok(Policy::Fifo),
            "SJF" => Ok(Policy::Sjf),
            "PSJF" => Ok(Policy::Psjf),
            "RR" => Ok(Policy::Rr),
            _ => bail!("unknown policy {:?} (expected FIFO, SJF, PSJF or RR)", s),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Policy::Fifo => "FIFO",
            Policy::Sjf => "SJF",
            Policy::Psjf => "PSJF",
            Policy::Rr => "RR",
        };
        f.write_str(name)
    }
}

/// Fixed parameters of one scheduler instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedConfig {
    pub policy: Policy,
    /// Core every simulated process is pinned to.
    pub child_core: usize,
    /// Core the coordinator pins itself to, if any.
    pub parent_core: Option<usize>,
    /// Round-robin quantum in time units. Ignored by the other policies.
    pub rr_quantum: u64,
    /// Busy-loop iterations per time unit.
    pub unit_iterations: u64,
}

impl SchedConfig {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            child_core: DEFAULT_CHILD_CORE,
            parent_core: Some(DEFAULT_PARENT_CORE),
            rr_quantum: DEFAULT_RR_QUANTUM,
            unit_iterations: DEFAULT_UNIT_ITERATIONS,
        }
    }

    pub fn child_core(mut self, core: usize) -> Self {
        self.child_core = core;
        self
    }

    pub fn parent_core(mut self, core: Option<usize>) -> Self {
        self.parent_core = core;
        self
    }

    pub fn rr_quantum(mut self, quantum: u64) -> Self {
        self.rr_quantum = quantum;
        self
    }

    pub fn unit_iterations(mut self, iterations: u64) -> Self {
        self.unit_iterations = iterations;
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rr_quantum == 0 {
            bail!("round-robin quantum must be at least one time unit");
        }
        if self.parent_core == Some(self.child_core) {
            bail!(
                "coordinator and simulated processes must not share core {}",
                self.child_core
            );
        }
        Ok(())
    }
}
