#![allow(dead_code)]

use scx_procsim::*;

/// Run `items` under `policy` on the in-process backend.
pub fn run_sim(policy: Policy, quantum: u64, items: &[WorkloadItem]) -> (Trace, SimBackend) {
    let clock = CountingClock::new();
    let backend = SimBackend::new(&clock);
    let config = SchedConfig::new(policy).rr_quantum(quantum);
    let mut sched = Scheduler::new(config, backend, clock);
    let trace = sched.run(items).expect("scheduler run failed");
    (trace, sched.into_backend())
}

/// `A(ready=0, exec=3)`, `B(ready=1, exec=2)`, `C(ready=2, exec=1)`.
pub fn abc() -> Vec<WorkloadItem> {
    vec![
        WorkloadItem::new("A", 0, 3),
        WorkloadItem::new("B", 1, 2),
        WorkloadItem::new("C", 2, 1),
    ]
}

pub fn idx(v: &[usize]) -> Vec<ItemIdx> {
    v.iter().map(|&i| ItemIdx(i)).collect()
}

/// What happened in each unit: the item that ran, or `None` for idle.
pub fn timeline(trace: &Trace) -> Vec<Option<usize>> {
    let mut out = Vec::new();
    for event in trace.events() {
        match event.kind {
            TraceKind::Ran { idx } => {
                assert_eq!(event.time as usize, out.len(), "gap in timeline");
                out.push(Some(idx.0));
            }
            TraceKind::Idle => {
                assert_eq!(event.time as usize, out.len(), "gap in timeline");
                out.push(None);
            }
            _ => {}
        }
    }
    out
}

/// Work left for item `j` at the start of unit `t`.
pub fn remaining_at(items: &[WorkloadItem], trace: &Trace, j: usize, t: TimeUnits) -> u64 {
    let done = trace
        .events()
        .iter()
        .filter(|e| e.time < t && matches!(e.kind, TraceKind::Ran { idx } if idx.0 == j))
        .count() as u64;
    items[j].exec_time - done
}

pub fn eligible_at(items: &[WorkloadItem], trace: &Trace, j: usize, t: TimeUnits) -> bool {
    items[j].ready_time <= t && remaining_at(items, trace, j, t) > 0
}

/// Unit-by-unit model of preemptive SJF: every unit, the eligible item
/// with the least remaining work runs, ties to the lowest index.
pub fn reference_psjf(items: &[WorkloadItem]) -> Vec<Option<usize>> {
    let mut remaining: Vec<u64> = items.iter().map(|i| i.exec_time).collect();
    let mut out = Vec::new();
    let mut t = 0;
    while remaining.iter().any(|&r| r > 0) {
        let pick = (0..items.len())
            .filter(|&j| items[j].ready_time <= t && remaining[j] > 0)
            .min_by_key(|&j| (remaining[j], j));
        if let Some(j) = pick {
            remaining[j] -= 1;
        }
        out.push(pick);
        t += 1;
    }
    out
}

/// Small deterministic generator for workload grids.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Lcg(seed)
    }

    pub fn next(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

pub fn random_workload(seed: u64, n: usize) -> Vec<WorkloadItem> {
    let mut rng = Lcg::new(seed);
    (0..n)
        .map(|i| WorkloadItem::new(&format!("P{i}"), rng.next(12), 1 + rng.next(6)))
        .collect()
}

/// Properties every policy must satisfy.
pub fn check_common(items: &[WorkloadItem], trace: &Trace, backend: &SimBackend) {
    assert_eq!(trace.completion_order().len(), items.len());
    for (j, item) in items.iter().enumerate() {
        let i = ItemIdx(j);
        assert_eq!(trace.units_run(i), item.exec_time, "{}: wrong unit count", item.name);
        let first = trace.first_run(i).expect("item never ran");
        assert!(first >= item.ready_time, "{} ran before ready", item.name);
        let spawned = trace.spawn_time(i).expect("item never spawned");
        assert!(spawned >= item.ready_time, "{} spawned before ready", item.name);
        assert!(spawned <= first);
    }
    let _ = timeline(trace);
    assert_eq!(backend.spawned(), items.len());
    assert_eq!(backend.live(), 0);
    assert_eq!(backend.records().len(), items.len());
    assert_eq!(backend.notices().len(), items.len());
}
