// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Completion records and the sinks they are written to.
//!
//! A simulated process writes exactly one record when its work reaches
//! zero:
//!
//! ```text
//! [scx_procsim] <pid> <sec>.<nsec> <sec>.<nsec>
//! ```
//!
//! Nanoseconds are zero padded to nine digits and the record is NUL padded
//! to `RECORD_LEN` bytes. Consumers find records by the tag prefix.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};

/// Prefix identifying completion records in a shared log.
pub const RECORD_TAG: &str = "[scx_procsim]";
/// Fixed byte width of an encoded record.
pub const RECORD_LEN: usize = 256;
/// Default system diagnostic sink.
pub const KMSG_PATH: &str = "/dev/kmsg";

/// Wall-clock instant with nanosecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    pub sec: i64,
    pub nsec: i64,
}

impl Timestamp {
    pub fn new(sec: i64, nsec: i64) -> Self {
        Self { sec, nsec }
    }

    fn parse(s: &str) -> Option<Self> {
        let (sec, nsec) = s.split_once('.')?;
        Some(Self::new(sec.parse().ok()?, nsec.parse().ok()?))
    }
}

/// Start/end timestamps of one finished simulated process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRecord {
    pub pid: i32,
    pub start: Timestamp,
    pub end: Timestamp,
}

impl CompletionRecord {
    /// The record line, newline terminated, without padding.
    pub fn line(&self) -> String {
        format!(
            "{} {} {}.{:09} {}.{:09}\n",
            RECORD_TAG, self.pid, self.start.sec, self.start.nsec, self.end.sec, self.end.nsec
        )
    }

    /// The fixed-width encoding written to a sink.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = self.line().into_bytes();
        buf.truncate(RECORD_LEN);
        buf.resize(RECORD_LEN, 0);
        buf
    }

    /// Parse one record line. Trailing NUL padding is ignored.
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line
            .trim_end_matches(['\0', '\n'])
            .strip_prefix(RECORD_TAG)?;
        let mut fields = rest.split_whitespace();
        let pid = fields.next()?.parse().ok()?;
        let start = Timestamp::parse(fields.next()?)?;
        let end = Timestamp::parse(fields.next()?)?;
        if fields.next().is_some() {
            return None;
        }
        Some(Self { pid, start, end })
    }

    /// Extract every record from the raw contents of a log.
    pub fn scan(contents: &[u8]) -> Vec<Self> {
        String::from_utf8_lossy(contents)
            .split(|c| c == '\n' || c == '\0')
            .filter_map(|l| l.find(RECORD_TAG).and_then(|at| Self::parse(&l[at..])))
            .collect()
    }
}

/// Destination for completion records.
///
/// Failures are reported to the caller, which logs them and carries on:
/// losing a record never aborts a run.
pub trait CompletionSink: Send {
    fn write_record(&mut self, record: &CompletionRecord) -> Result<()>;
}

/// Appends records to a file-like log, `/dev/kmsg` by default.
#[derive(Debug, Clone)]
pub struct KmsgSink {
    path: PathBuf,
}

impl KmsgSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for KmsgSink {
    fn default() -> Self {
        Self::new(Path::new(KMSG_PATH))
    }
}

impl CompletionSink for KmsgSink {
    fn write_record(&mut self, record: &CompletionRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(&record.encode())
            .with_context(|| format!("failed to write to {}", self.path.display()))
    }
}

/// Keeps records in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<CompletionRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<CompletionRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl CompletionSink for MemorySink {
    fn write_record(&mut self, record: &CompletionRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| anyhow!("memory sink poisoned"))?
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CompletionRecord {
        CompletionRecord {
            pid: 4242,
            start: Timestamp::new(1_700_000_000, 1_234),
            end: Timestamp::new(1_700_000_001, 987_654_321),
        }
    }

    #[test]
    fn line_format() {
        assert_eq!(
            record().line(),
            "[scx_procsim] 4242 1700000000.000001234 1700000001.987654321\n"
        );
    }

    #[test]
    fn encoding_has_fixed_width() {
        let buf = record().encode();
        assert_eq!(buf.len(), RECORD_LEN);
        assert!(buf.ends_with(&[0]));
        assert_eq!(CompletionRecord::scan(&buf), vec![record()]);
    }

    #[test]
    fn parse_rejects_foreign_lines() {
        assert!(CompletionRecord::parse("[other] 1 0.000000000 1.000000000").is_none());
        assert!(CompletionRecord::parse("[scx_procsim] x 0.0 1.0").is_none());
        assert!(CompletionRecord::parse("[scx_procsim] 1 0.0 1.0 extra").is_none());
    }

    #[test]
    fn kmsg_sink_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kmsg");
        std::fs::write(&path, b"unrelated line\n").unwrap();

        let mut sink = KmsgSink::new(&path);
        sink.write_record(&record()).unwrap();
        sink.write_record(&record()).unwrap();

        let contents = std::fs::read(&path).unwrap();
        assert_eq!(contents.len(), "unrelated line\n".len() + 2 * RECORD_LEN);
        assert_eq!(CompletionRecord::scan(&contents).len(), 2);
    }

    #[test]
    fn kmsg_sink_reports_missing_target() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = KmsgSink::new(&dir.path().join("no/such/dir/kmsg"));
        assert!(sink.write_record(&record()).is_err());
    }

    #[test]
    fn memory_sink_clones_share_records() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.write_record(&record()).unwrap();
        assert_eq!(sink.records(), vec![record()]);
    }
}
