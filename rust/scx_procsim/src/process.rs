// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Scheduler-side bookkeeping for one workload item.

use crate::types::{ProcState, TimeUnits};
use crate::workload::WorkloadItem;

/// A workload item as seen by the scheduler driving it.
///
/// `remaining` only ever decreases, one unit per token sent, and the
/// handle exists exactly while the process is spawned and not yet reaped.
#[derive(Debug)]
pub struct SimProcess<H> {
    pub ready_time: TimeUnits,
    pub remaining: TimeUnits,
    pub state: ProcState,
    pub handle: Option<H>,
}

impl<H> SimProcess<H> {
    pub fn new(item: &WorkloadItem) -> Self {
        Self {
            ready_time: item.ready_time,
            remaining: item.exec_time,
            state: ProcState::NotCreated,
            handle: None,
        }
    }

    /// Ready by `now` and still has work.
    pub fn is_eligible(&self, now: TimeUnits) -> bool {
        self.ready_time <= now && self.remaining > 0
    }

    pub fn is_finished(&self) -> bool {
        self.state == ProcState::Finished
    }
}
