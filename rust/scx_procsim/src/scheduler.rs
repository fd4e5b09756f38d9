// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! The four dispatch policies.
//!
//! All of them share one fixed workload list, a time counter that
//! only moves through the clock, and one eligibility rule: an item is
//! eligible at time `t` iff its ready time is `<= t` and it still has work.
//! Tokens are only ever sent to eligible, resumed processes, and at most
//! one process is resumed at any time.

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{Policy, SchedConfig};
use crate::control::ExecBackend;
use crate::process::SimProcess;
use crate::trace::{Trace, TraceKind};
use crate::types::{ItemIdx, ProcState, TimeUnits};
use crate::workload::{validate_items, WorkloadItem};

pub struct Scheduler<B: ExecBackend, C: Clock> {
    config: SchedConfig,
    backend: B,
    clock: C,
}

impl<B: ExecBackend, C: Clock> Scheduler<B, C> {
    pub fn new(config: SchedConfig, backend: B, clock: C) -> Self {
        Self {
            config,
            backend,
            clock,
        }
    }

    pub fn config(&self) -> &SchedConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Drive every item in `items` to completion under the configured
    /// policy and return the resulting trace.
    pub fn run(&mut self, items: &[WorkloadItem]) -> Result<Trace> {
        self.config.validate()?;
        validate_items(items)?;

        info!(
            "running {} item(s) under {} on core {}",
            items.len(),
            self.config.policy,
            self.config.child_core
        );

        let mut dispatch = Dispatch {
            backend: &mut self.backend,
            clock: &mut self.clock,
            items,
            procs: items.iter().map(SimProcess::new).collect(),
            time: 0,
            finished: 0,
            trace: Trace::new(),
        };

        match self.config.policy {
            Policy::Fifo => dispatch.fifo()?,
            Policy::Sjf => dispatch.sjf()?,
            Policy::Psjf => dispatch.psjf()?,
            Policy::Rr => dispatch.rr(self.config.rr_quantum)?,
        }

        info!("all items finished at t={}", dispatch.time);
        Ok(dispatch.trace)
    }
}

/// State of a single run.
struct Dispatch<'a, B: ExecBackend, C: Clock> {
    backend: &'a mut B,
    clock: &'a mut C,
    items: &'a [WorkloadItem],
    procs: Vec<SimProcess<B::Handle>>,
    time: TimeUnits,
    finished: usize,
    trace: Trace,
}

impl<'a, B: ExecBackend, C: Clock> Dispatch<'a, B, C> {
    fn all_finished(&self) -> bool {
        self.finished == self.procs.len()
    }

    /// Advance the clock without running anything.
    fn idle_tick(&mut self) {
        self.trace.record(self.time, TraceKind::Idle);
        self.clock.tick();
        self.time += 1;
    }

    fn spawn(&mut self, i: usize) -> Result<()> {
        debug_assert_eq!(self.procs[i].state, ProcState::NotCreated);
        let items = self.items;
        let item = &items[i];
        let handle = self
            .backend
            .spawn(ItemIdx(i), item)
            .with_context(|| format!("failed to spawn {}", item.name))?;
        info!(
            "t={} spawned {} as pid {}",
            self.time,
            item.name,
            self.backend.pid(&handle)
        );
        let proc = &mut self.procs[i];
        proc.handle = Some(handle);
        proc.state = ProcState::Suspended;
        self.trace.record(self.time, TraceKind::Spawned { idx: ItemIdx(i) });
        Ok(())
    }

    fn resume(&mut self, i: usize) {
        let proc = &mut self.procs[i];
        debug_assert_eq!(proc.state, ProcState::Suspended);
        if let Some(handle) = &proc.handle {
            if let Err(e) = self.backend.resume(handle) {
                warn!("failed to resume {}: {:#}", self.items[i].name, e);
            }
        }
        proc.state = ProcState::Runnable;
        self.trace.record(self.time, TraceKind::Resumed { idx: ItemIdx(i) });
    }

    fn suspend(&mut self, i: usize) {
        let proc = &mut self.procs[i];
        debug_assert_eq!(proc.state, ProcState::Runnable);
        if let Some(handle) = &proc.handle {
            if let Err(e) = self.backend.suspend(handle) {
                warn!("failed to suspend {}: {:#}", self.items[i].name, e);
            }
        }
        proc.state = ProcState::Suspended;
        self.trace.record(self.time, TraceKind::Suspended { idx: ItemIdx(i) });
    }

    /// Send one token and advance the clock alongside the child.
    fn run_unit(&mut self, i: usize) -> Result<()> {
        let proc = &mut self.procs[i];
        debug_assert_eq!(proc.state, ProcState::Runnable);
        debug_assert!(proc.is_eligible(self.time));
        if let Some(handle) = proc.handle.as_mut() {
            self.backend.run_one_unit(handle)?;
        }
        self.trace.record(self.time, TraceKind::Ran { idx: ItemIdx(i) });
        self.clock.tick();
        self.time += 1;
        proc.remaining -= 1;
        Ok(())
    }

    /// Collect a process whose work reached zero.
    fn reap(&mut self, i: usize) -> Result<()> {
        let proc = &mut self.procs[i];
        debug_assert_eq!(proc.remaining, 0);
        debug_assert_eq!(proc.state, ProcState::Runnable);
        if let Some(handle) = proc.handle.take() {
            self.backend
                .reap(handle)
                .with_context(|| format!("failed to reap {}", self.items[i].name))?;
        }
        proc.state = ProcState::Finished;
        self.finished += 1;
        info!("t={} {} finished", self.time, self.items[i].name);
        self.trace.record(self.time, TraceKind::Reaped { idx: ItemIdx(i) });
        Ok(())
    }

    /// Spawn every item that became ready and return the eligible item with
    /// the least remaining work. Ties go to the lowest list index.
    fn find_shortest(&mut self) -> Result<Option<usize>> {
        let mut shortest: Option<usize> = None;
        for i in 0..self.procs.len() {
            if self.procs[i].ready_time <= self.time
                && self.procs[i].state == ProcState::NotCreated
            {
                self.spawn(i)?;
            }
            if !self.procs[i].is_eligible(self.time) {
                continue;
            }
            match shortest {
                Some(s) if self.procs[s].remaining <= self.procs[i].remaining => {}
                _ => shortest = Some(i),
            }
        }
        Ok(shortest)
    }

    /// Run items strictly in list order, each to completion.
    ///
    /// An item listed later but ready earlier still waits behind every item
    /// listed before it.
    fn fifo(&mut self) -> Result<()> {
        for i in 0..self.procs.len() {
            while self.time < self.procs[i].ready_time {
                self.idle_tick();
            }
            self.spawn(i)?;
            self.resume(i);
            while self.procs[i].remaining > 0 {
                self.run_unit(i)?;
            }
            self.reap(i)?;
        }
        Ok(())
    }

    /// Non-preemptive shortest job first.
    fn sjf(&mut self) -> Result<()> {
        while !self.all_finished() {
            let Some(i) = self.find_shortest()? else {
                self.idle_tick();
                continue;
            };
            debug!("t={} sjf picks {}", self.time, self.items[i].name);
            self.resume(i);
            while self.procs[i].remaining > 0 {
                self.run_unit(i)?;
            }
            self.reap(i)?;
        }
        Ok(())
    }

    /// Preemptive shortest job first: the choice is remade every unit.
    fn psjf(&mut self) -> Result<()> {
        while !self.all_finished() {
            let Some(i) = self.find_shortest()? else {
                self.idle_tick();
                continue;
            };
            debug!("t={} psjf picks {}", self.time, self.items[i].name);
            self.resume(i);
            self.run_unit(i)?;
            if self.procs[i].remaining == 0 {
                self.reap(i)?;
            } else {
                self.suspend(i);
            }
        }
        Ok(())
    }

    /// Round robin: sweep the list in order, giving each eligible item up
    /// to `quantum` units. If a sweep finds nothing to run, idle until the
    /// nearest ready time.
    fn rr(&mut self, quantum: u64) -> Result<()> {
        loop {
            let mut skipped = 0;
            let mut next_ready: Option<TimeUnits> = None;

            for i in 0..self.procs.len() {
                if self.time < self.procs[i].ready_time {
                    let ready = self.procs[i].ready_time;
                    next_ready = Some(next_ready.map_or(ready, |t| t.min(ready)));
                    skipped += 1;
                    continue;
                }
                if self.procs[i].is_finished() {
                    skipped += 1;
                    continue;
                }

                if self.procs[i].state == ProcState::NotCreated {
                    self.spawn(i)?;
                }
                self.resume(i);
                let mut slice = quantum;
                while self.procs[i].remaining > 0 && slice > 0 {
                    self.run_unit(i)?;
                    slice -= 1;
                }
                if self.procs[i].remaining == 0 {
                    self.reap(i)?;
                } else {
                    self.suspend(i);
                }
            }

            if self.all_finished() {
                return Ok(());
            }
            if skipped == self.procs.len() {
                if let Some(ready) = next_ready {
                    debug!("t={} rr idles until {}", self.time, ready);
                    while self.time < ready {
                        self.idle_tick();
                    }
                }
            }
        }
    }
}
