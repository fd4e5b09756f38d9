// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

use std::io::Read;
use std::path::PathBuf;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use log::error;
use log::info;
use nix::unistd::Pid;

use scx_procsim::config::{DEFAULT_CHILD_CORE, DEFAULT_PARENT_CORE, DEFAULT_RR_QUANTUM};
use scx_procsim::sink::KMSG_PATH;
use scx_procsim::{
    load_workload, parse_workload, pin_to_core, BusyClock, Fatal, KmsgSink, OsBackend, Policy,
    SchedConfig, Scheduler, Workload,
};

const SCHEDULER_NAME: &str = "scx_procsched";

/// scx_procsched: run a scheduling policy over real processes
///
/// Every workload item becomes a forked child process pinned to one shared core. Children are
/// parked in SCHED_IDLE and only the child picked by the policy is raised to SCHED_OTHER and
/// handed one token per time unit over a pipe, so the host scheduler enforces that exactly one
/// simulated process executes at a time.
///
/// The workload is read from WORKLOAD (or stdin) in the form:
///
///   POLICY
///   N
///   name ready_time exec_time   (N lines)
///
/// Each child prints `<name> <pid>` to stdout when it first runs and appends a completion record
/// with its start and end timestamps to the log sink (/dev/kmsg by default).
///
/// Exit status: 2 process creation failed, 3 clock read failed, 4 core pinning failed,
/// 5 pipe creation failed, 1 any other error.
#[derive(Debug, Parser)]
struct Opts {
    /// Workload file. Read from stdin when omitted.
    workload: Option<PathBuf>,

    /// Scheduling policy (FIFO, SJF, PSJF, RR). Overrides the workload header.
    #[clap(short = 'p', long)]
    policy: Option<Policy>,

    /// Core every simulated process is pinned to.
    #[clap(short = 'c', long, default_value_t = DEFAULT_CHILD_CORE)]
    child_core: usize,

    /// Core the coordinating process pins itself to.
    #[clap(short = 'C', long, default_value_t = DEFAULT_PARENT_CORE)]
    parent_core: usize,

    /// Leave the coordinating process unpinned.
    #[clap(long, action = clap::ArgAction::SetTrue)]
    no_parent_pin: bool,

    /// Round-robin time quantum, in time units.
    #[clap(short = 'q', long, default_value_t = DEFAULT_RR_QUANTUM)]
    quantum: u64,

    /// Busy-loop iterations making up one time unit.
    #[clap(long, default_value = "1000000")]
    unit_iterations: u64,

    /// Where children append their completion records.
    #[clap(long, default_value = KMSG_PATH)]
    log_sink: PathBuf,

    /// Print the execution trace to stderr when done.
    #[clap(long, action = clap::ArgAction::SetTrue)]
    dump_trace: bool,

    /// Enable verbose output. Repeat for more.
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_log(verbose: u8) -> Result<()> {
    let loglevel = match verbose {
        0 => simplelog::LevelFilter::Info,
        1 => simplelog::LevelFilter::Debug,
        _ => simplelog::LevelFilter::Trace,
    };

    let mut lcfg = simplelog::ConfigBuilder::new();
    lcfg.set_time_level(simplelog::LevelFilter::Error)
        .set_location_level(simplelog::LevelFilter::Off)
        .set_target_level(simplelog::LevelFilter::Off)
        .set_thread_level(simplelog::LevelFilter::Off);
    simplelog::TermLogger::init(
        loglevel,
        lcfg.build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;
    Ok(())
}

fn read_workload(opts: &Opts) -> Result<Workload> {
    match &opts.workload {
        Some(path) => load_workload(path),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read workload from stdin")?;
            parse_workload(&text).context("failed to parse workload from stdin")
        }
    }
}

fn run(opts: &Opts) -> Result<()> {
    let workload = read_workload(opts)?;
    let Some(policy) = opts.policy.or(workload.policy) else {
        bail!("no policy given on the command line or in the workload header");
    };

    let config = SchedConfig::new(policy)
        .child_core(opts.child_core)
        .parent_core((!opts.no_parent_pin).then_some(opts.parent_core))
        .rr_quantum(opts.quantum)
        .unit_iterations(opts.unit_iterations);
    config.validate()?;

    if let Some(core) = config.parent_core {
        pin_to_core(Pid::from_raw(0), core).context("failed to pin coordinator")?;
        info!("coordinator pinned to core {}", core);
    }

    let sink = KmsgSink::new(&opts.log_sink);
    let backend = OsBackend::new(&config, Box::new(sink));
    let clock = BusyClock::new(config.unit_iterations);

    let trace = Scheduler::new(config, backend, clock).run(&workload.items)?;

    if opts.dump_trace {
        trace.dump();
    }
    for idx in trace.completion_order() {
        let item = &workload.items[idx.0];
        info!(
            "{} ready={} exec={} finished at t={}",
            item.name,
            item.ready_time,
            item.exec_time,
            trace.completion_time(idx).unwrap_or_default()
        );
    }
    Ok(())
}

fn main() {
    let opts = Opts::parse();

    if let Err(e) = init_log(opts.verbose) {
        eprintln!("{}: failed to initialize logging: {:#}", SCHEDULER_NAME, e);
    }

    if let Err(e) = run(&opts) {
        error!("{:#}", e);
        std::process::exit(Fatal::exit_code_of(&e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let opts = Opts::parse_from([SCHEDULER_NAME, "work.txt"]);
        assert_eq!(opts.workload, Some(PathBuf::from("work.txt")));
        assert_eq!(opts.policy, None);
        assert_eq!(opts.child_core, DEFAULT_CHILD_CORE);
        assert_eq!(opts.parent_core, DEFAULT_PARENT_CORE);
        assert_eq!(opts.quantum, DEFAULT_RR_QUANTUM);
        assert_eq!(opts.log_sink, PathBuf::from(KMSG_PATH));
    }

    #[test]
    fn cli_policy_and_verbosity() {
        let opts = Opts::parse_from([SCHEDULER_NAME, "-p", "psjf", "-vv", "-q", "3"]);
        assert_eq!(opts.policy, Some(Policy::Psjf));
        assert_eq!(opts.verbose, 2);
        assert_eq!(opts.quantum, 3);
        assert!(opts.workload.is_none());
    }

    #[test]
    fn bundled_workloads_parse() {
        let cases = [
            (include_str!("../workloads/psjf_example.txt"), Policy::Psjf, 3),
            (include_str!("../workloads/rr_equal.txt"), Policy::Rr, 5),
            (include_str!("../workloads/fifo_list_order.txt"), Policy::Fifo, 3),
            (include_str!("../workloads/sjf_mixed.txt"), Policy::Sjf, 4),
        ];
        for (text, policy, n) in cases {
            let w = parse_workload(text).unwrap();
            assert_eq!(w.policy, Some(policy));
            assert_eq!(w.items.len(), n);
        }
    }

    #[test]
    fn cli_rejects_unknown_policy() {
        assert!(Opts::try_parse_from([SCHEDULER_NAME, "-p", "lottery"]).is_err());
    }
}
