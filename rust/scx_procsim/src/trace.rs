//! Execution trace of a scheduler run.
//!
//! Every process-control action the scheduler takes (spawn, resume,
//! suspend, one unit of execution, reap) and every idle tick is recorded
//! as a `TraceEvent` stamped with the simulated time at which it happened.
//! A `Ran` event at time `t` covers the unit `[t, t + 1)`.

use crate::types::{ItemIdx, TimeUnits};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    /// Simulated time of the event.
    pub time: TimeUnits,
    pub kind: TraceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    /// The item's OS process was created (and parked).
    Spawned { idx: ItemIdx },
    /// The item was raised to the normal scheduling class.
    Resumed { idx: ItemIdx },
    /// The item was lowered to the idle scheduling class.
    Suspended { idx: ItemIdx },
    /// The item was advanced by one unit.
    Ran { idx: ItemIdx },
    /// The item's process exited and was collected.
    Reaped { idx: ItemIdx },
    /// The clock advanced with no item running.
    Idle,
}

/// A contiguous stretch of units run by one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub idx: ItemIdx,
    pub start: TimeUnits,
    pub len: TimeUnits,
}

impl Segment {
    pub fn end(&self) -> TimeUnits {
        self.start + self.len
    }
}

#[derive(Debug, Clone, Default)]
pub struct Trace {
    events: Vec<TraceEvent>,
}

impl Trace {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, time: TimeUnits, kind: TraceKind) {
        self.events.push(TraceEvent { time, kind });
    }

    /// All events in chronological order.
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Items in the order they were reaped.
    pub fn completion_order(&self) -> Vec<ItemIdx> {
        self.events
            .iter()
            .filter_map(|e| match e.kind {
                TraceKind::Reaped { idx } => Some(idx),
                _ => None,
            })
            .collect()
    }

    /// Time at which the item finished its last unit.
    pub fn completion_time(&self, idx: ItemIdx) -> Option<TimeUnits> {
        self.events.iter().find_map(|e| match e.kind {
            TraceKind::Reaped { idx: i } if i == idx => Some(e.time),
            _ => None,
        })
    }

    /// Time at which the item ran its first unit.
    pub fn first_run(&self, idx: ItemIdx) -> Option<TimeUnits> {
        self.events.iter().find_map(|e| match e.kind {
            TraceKind::Ran { idx: i } if i == idx => Some(e.time),
            _ => None,
        })
    }

    /// Time at which the item was spawned.
    pub fn spawn_time(&self, idx: ItemIdx) -> Option<TimeUnits> {
        self.events.iter().find_map(|e| match e.kind {
            TraceKind::Spawned { idx: i } if i == idx => Some(e.time),
            _ => None,
        })
    }

    /// Total units the item was advanced.
    pub fn units_run(&self, idx: ItemIdx) -> u64 {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, TraceKind::Ran { idx: i } if i == idx))
            .count() as u64
    }

    /// Number of idle ticks.
    pub fn idle_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, TraceKind::Idle))
            .count()
    }

    /// The item that ran each unit, in time order.
    pub fn run_order(&self) -> Vec<ItemIdx> {
        self.events
            .iter()
            .filter_map(|e| match e.kind {
                TraceKind::Ran { idx } => Some(idx),
                _ => None,
            })
            .collect()
    }

    /// Runs merged into contiguous per-item segments.
    pub fn segments(&self) -> Vec<Segment> {
        let mut segs: Vec<Segment> = Vec::new();
        for event in &self.events {
            let TraceKind::Ran { idx } = event.kind else {
                continue;
            };
            match segs.last_mut() {
                Some(last) if last.idx == idx && last.end() == event.time => last.len += 1,
                _ => segs.push(Segment {
                    idx,
                    start: event.time,
                    len: 1,
                }),
            }
        }
        segs
    }

    /// Pretty-print the trace for debugging.
    pub fn dump(&self) {
        for event in &self.events {
            let desc = match event.kind {
                TraceKind::Spawned { idx } => format!("SPAWN   item={}", idx.0),
                TraceKind::Resumed { idx } => format!("RESUME  item={}", idx.0),
                TraceKind::Suspended { idx } => format!("SUSPEND item={}", idx.0),
                TraceKind::Ran { idx } => format!("RUN     item={}", idx.0),
                TraceKind::Reaped { idx } => format!("REAP    item={}", idx.0),
                TraceKind::Idle => "IDLE".to_string(),
            };
            eprintln!("[{:>10}] {}", event.time, desc);
        }
    }
}
