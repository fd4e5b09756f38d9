use scx_procsim::*;

mod common;
use common::*;

#[test]
fn test_fifo_example() {
    let items = abc();
    let (trace, backend) = run_sim(Policy::Fifo, 1, &items);
    trace.dump();

    assert_eq!(trace.completion_order(), idx(&[0, 1, 2]));
    assert_eq!(trace.completion_time(ItemIdx(0)), Some(3));
    assert_eq!(trace.completion_time(ItemIdx(1)), Some(5));
    assert_eq!(trace.completion_time(ItemIdx(2)), Some(6));
    check_common(&items, &trace, &backend);
}

/// Runs are contiguous and never interleave.
#[test]
fn test_fifo_runs_are_contiguous() {
    let items = random_workload(7, 8);
    let (trace, backend) = run_sim(Policy::Fifo, 1, &items);

    let segs = trace.segments();
    assert_eq!(segs.len(), items.len());
    for (j, seg) in segs.iter().enumerate() {
        assert_eq!(seg.idx, ItemIdx(j));
        assert_eq!(seg.len, items[j].exec_time);
    }
    check_common(&items, &trace, &backend);
}

/// Order is list order, not ready-time order.
#[test]
fn test_fifo_follows_list_order() {
    let items = vec![
        WorkloadItem::new("late", 5, 2),
        WorkloadItem::new("early", 0, 1),
    ];
    let (trace, backend) = run_sim(Policy::Fifo, 1, &items);

    assert_eq!(trace.completion_order(), idx(&[0, 1]));
    // Idles until the first listed item is ready even though `early` is.
    assert_eq!(trace.idle_count(), 5);
    assert_eq!(trace.first_run(ItemIdx(0)), Some(5));
    assert_eq!(trace.first_run(ItemIdx(1)), Some(7));
    check_common(&items, &trace, &backend);
}

/// Spawning is lazy: an item is created only when its turn comes.
#[test]
fn test_fifo_spawns_on_turn() {
    let items = abc();
    let (trace, _) = run_sim(Policy::Fifo, 1, &items);
    assert_eq!(trace.spawn_time(ItemIdx(1)), Some(3));
    assert_eq!(trace.spawn_time(ItemIdx(2)), Some(5));
}
