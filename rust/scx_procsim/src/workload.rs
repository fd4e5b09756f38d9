// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Workload description and its text format.
//!
//! ```text
//! # optional header: policy, then item count
//! PSJF
//! 3
//! A 0 3
//! B 1 2
//! C 2 1
//! ```
//!
//! Every item line is `<name> <ready time> <execution time>`. Both header
//! lines are optional; without a count every remaining line is an item.
//! Blank lines and `#` comments are skipped.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};

use crate::config::Policy;
use crate::types::TimeUnits;

/// One unit of work to simulate. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadItem {
    pub name: String,
    /// Time unit at which the item becomes eligible.
    pub ready_time: TimeUnits,
    /// Units of work required.
    pub exec_time: TimeUnits,
}

impl WorkloadItem {
    pub fn new(name: &str, ready_time: TimeUnits, exec_time: TimeUnits) -> Self {
        Self {
            name: name.to_string(),
            ready_time,
            exec_time,
        }
    }
}

/// A parsed workload file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    /// Policy named in the header, if present.
    pub policy: Option<Policy>,
    pub items: Vec<WorkloadItem>,
}

/// Reject items that could never complete.
pub fn validate_items(items: &[WorkloadItem]) -> Result<()> {
    for item in items {
        if item.exec_time == 0 {
            bail!("item {:?} has zero execution time", item.name);
        }
    }
    Ok(())
}

fn parse_item(line: &str, lineno: usize) -> Result<WorkloadItem> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let &[name, ready, exec] = fields.as_slice() else {
        bail!(
            "line {}: expected `<name> <ready> <exec>`, got {} field(s)",
            lineno,
            fields.len()
        );
    };
    let ready_time = ready
        .parse::<TimeUnits>()
        .with_context(|| format!("line {}: invalid ready time {:?}", lineno, ready))?;
    let exec_time = exec
        .parse::<TimeUnits>()
        .with_context(|| format!("line {}: invalid execution time {:?}", lineno, exec))?;
    if exec_time == 0 {
        bail!("line {}: item {:?} has zero execution time", lineno, name);
    }
    Ok(WorkloadItem::new(name, ready_time, exec_time))
}

/// Parse the text format described in the module docs.
pub fn parse_workload(input: &str) -> Result<Workload> {
    let mut lines = input
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
        .peekable();

    let mut policy = None;
    if let Some((_, line)) = lines.peek() {
        if !line.contains(char::is_whitespace) && line.parse::<u64>().is_err() {
            policy = Some(line.parse::<Policy>()?);
            lines.next();
        }
    }

    let mut count = None;
    if let Some((lineno, line)) = lines.peek() {
        if !line.contains(char::is_whitespace) {
            let n = line
                .parse::<usize>()
                .with_context(|| format!("line {}: invalid item count {:?}", lineno, line))?;
            count = Some(n);
            lines.next();
        }
    }

    let mut items = Vec::new();
    for (lineno, line) in lines {
        items.push(parse_item(line, lineno)?);
    }

    if let Some(n) = count {
        if n != items.len() {
            bail!("header announces {} item(s), found {}", n, items.len());
        }
    }
    if items.is_empty() {
        return Err(anyhow!("workload has no items"));
    }

    Ok(Workload { policy, items })
}

/// Read and parse a workload file.
pub fn load_workload(path: &Path) -> Result<Workload> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_workload(&text).with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_header() {
        let w = parse_workload("RR\n3\nP1 0 500\nP2 200 500\nP3 400 500\n").unwrap();
        assert_eq!(w.policy, Some(Policy::Rr));
        assert_eq!(w.items.len(), 3);
        assert_eq!(w.items[1], WorkloadItem::new("P2", 200, 500));
    }

    #[test]
    fn header_is_optional() {
        let w = parse_workload("# no header\n\nA 0 3\nB 1 2\n").unwrap();
        assert_eq!(w.policy, None);
        assert_eq!(w.items.len(), 2);

        let w = parse_workload("2\nA 0 3\nB 1 2\n").unwrap();
        assert_eq!(w.policy, None);
        assert_eq!(w.items[0].name, "A");
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let err = parse_workload("FIFO\n3\nA 0 3\n").unwrap_err();
        assert!(err.to_string().contains("announces 3"), "{err}");
    }

    #[test]
    fn bad_lines_report_line_number() {
        let err = parse_workload("SJF\nA 0 3\nB x 2\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 3"), "{err:#}");

        let err = parse_workload("A 0\n").unwrap_err();
        assert!(err.to_string().contains("line 1"), "{err}");
    }

    #[test]
    fn zero_exec_time_is_rejected() {
        assert!(parse_workload("A 0 0\n").is_err());
        assert!(validate_items(&[WorkloadItem::new("A", 0, 0)]).is_err());
        assert!(validate_items(&[WorkloadItem::new("A", 0, 1)]).is_ok());
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(parse_workload("LOTTERY\nA 0 3\n").is_err());
        assert!(parse_workload("").is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workload.txt");
        std::fs::write(&path, "PSJF\n1\nA 0 3\n").unwrap();
        let w = load_workload(&path).unwrap();
        assert_eq!(w.policy, Some(Policy::Psjf));
        assert!(load_workload(&dir.path().join("missing")).is_err());
    }
}
