//! A lightweight handle to a spawned child process.
//!
//! Unlike the builder-style crate this module is descended from, the
//! evaluator never shares a `Process` across threads or clones it, so
//! this is a bare pid wrapper rather than an `Arc<Mutex<..>>`-backed
//! shared handle.

use std::io::Result;

use crate::posix::{self, ExitStatus};

/// A child process that has not yet been waited for.
#[derive(Debug)]
pub struct Process {
    pid: u32,
    reaped: bool,
}

impl Process {
    pub(crate) fn from_pid(pid: u32) -> Process {
        Process { pid, reaped: false }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Blocks until the child exits, returning its decoded status.
    pub fn wait(mut self) -> Result<ExitStatus> {
        self.reaped = true;
        posix::waitpid(self.pid)
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        // Every evaluation path explicitly waits for children it spawns;
        // if one is dropped without having been waited for (only possible
        // on an early-return error path), reap it here so it doesn't
        // become a zombie.
        if !self.reaped {
            let _ = posix::waitpid(self.pid);
        }
    }
}
