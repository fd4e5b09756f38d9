// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Unrecoverable failures.
//!
//! A `Fatal` travels inside an `anyhow::Error` so the usual `?`/`context`
//! chain keeps working; the binary downcasts to it to pick the exit status.
//! Spawned children have no caller and exit with the same codes directly.

use std::fmt;

use nix::errno::Errno;

/// Exit status used for errors that are not a `Fatal`.
pub const EXIT_OTHER: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fatal {
    /// The OS refused to create a process.
    Spawn(Errno),
    /// Reading the realtime clock failed inside a child.
    Timestamp(Errno),
    /// The core index is out of range or the affinity syscall failed.
    Affinity { core: usize, errno: Errno },
    /// The token channel could not be created.
    Pipe(Errno),
}

impl Fatal {
    pub fn exit_code(&self) -> i32 {
        match self {
            Fatal::Spawn(_) => 2,
            Fatal::Timestamp(_) => 3,
            Fatal::Affinity { .. } => 4,
            Fatal::Pipe(_) => 5,
        }
    }

    /// Map an arbitrary error chain to the process exit status.
    pub fn exit_code_of(err: &anyhow::Error) -> i32 {
        err.chain()
            .find_map(|e| e.downcast_ref::<Fatal>())
            .map(Fatal::exit_code)
            .unwrap_or(EXIT_OTHER)
    }
}

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fatal::Spawn(e) => write!(f, "failed to create process: {}", e),
            Fatal::Timestamp(e) => write!(f, "failed to read realtime clock: {}", e),
            Fatal::Affinity { core, errno } => {
                write!(f, "failed to pin to core {}: {}", core, errno)
            }
            Fatal::Pipe(e) => write!(f, "failed to create token channel: {}", e),
        }
    }
}

impl std::error::Error for Fatal {}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            Fatal::Spawn(Errno::EAGAIN).exit_code(),
            Fatal::Timestamp(Errno::EINVAL).exit_code(),
            Fatal::Affinity {
                core: 9999,
                errno: Errno::EINVAL,
            }
            .exit_code(),
            Fatal::Pipe(Errno::EMFILE).exit_code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            assert_ne!(*a, EXIT_OTHER);
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn exit_code_survives_context() {
        let err: anyhow::Result<()> = Err(Fatal::Spawn(Errno::EAGAIN).into());
        let err = err.context("spawning P1").unwrap_err();
        assert_eq!(Fatal::exit_code_of(&err), 2);

        let other = anyhow::anyhow!("bad workload");
        assert_eq!(Fatal::exit_code_of(&other), EXIT_OTHER);
    }
}
