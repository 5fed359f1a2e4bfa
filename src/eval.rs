//! The recursive evaluator: given a component name and a sink descriptor,
//! spawns whatever processes and pipes are needed to deliver that
//! component's output to the sink.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, FromRawFd};

use log::{debug, warn};

use crate::catalog::{Catalog, Component};
use crate::copier;
use crate::error::{FlowError, Result};
use crate::posix;
use crate::spawn::spawn_shell;

/// Drives evaluation of a catalog, owning the traversal-local cycle
/// guard. A fresh `Evaluator` should be created for each independent
/// top-level evaluation, so the guard never leaks state between
/// unrelated runs — this is what makes the evaluator reentrant and safe
/// to unit-test in isolation, rather than relying on module-global
/// state.
///
/// Forked children inherit a copy of the guard's stack via `fork`'s
/// copy-on-write semantics, so recursive evaluation inside a child
/// process continues to see every ancestor already pushed by the
/// parent, with no cross-process synchronization needed.
pub struct Evaluator<'c> {
    catalog: &'c Catalog,
    stack: Vec<String>,
}

/// Pops the cycle-guard stack on every exit path, mirroring the
/// original's `call_sp--` which runs regardless of the inner call's
/// outcome.
struct StackGuard<'a> {
    stack: &'a mut Vec<String>,
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        self.stack.pop();
    }
}

impl<'c> Evaluator<'c> {
    pub fn new(catalog: &'c Catalog) -> Evaluator<'c> {
        Evaluator {
            catalog,
            stack: Vec::new(),
        }
    }

    /// Evaluates `name`, writing its output to `out_fd`. `out_fd` stays
    /// open on return; the caller owns it.
    pub fn evaluate(&mut self, name: &str, out_fd: &impl AsRawFd) -> Result<()> {
        if self.stack.iter().any(|n| n == name) {
            return Err(FlowError::Cycle(name.to_owned()));
        }
        self.stack.push(name.to_owned());
        let _guard = StackGuard {
            stack: &mut self.stack,
        };
        self.dispatch(name, out_fd)
    }

    /// Looks `name` up in precedence order Node > Pipe > Concatenate >
    /// Stderr > File and runs its kind-specific realization.
    fn dispatch(&mut self, name: &str, out_fd: &impl AsRawFd) -> Result<()> {
        match self.catalog.lookup(name) {
            Some(Component::Node(n)) => {
                debug!("evaluating node '{}'", name);
                self.run_node(name, &n.command, out_fd, false)
            }
            Some(Component::Pipe(p)) => {
                debug!("evaluating pipe '{}'", name);
                self.run_pipe(name, &p.from, &p.to, out_fd)
            }
            Some(Component::Concatenate(c)) => {
                debug!("evaluating concatenate '{}'", name);
                self.run_concatenate(name, &c.parts, out_fd)
            }
            Some(Component::Stderr(s)) => {
                debug!("evaluating stderr '{}'", name);
                let node = self
                    .catalog
                    .node(&s.from)
                    .ok_or_else(|| FlowError::UnknownComponent(s.from.clone()))?
                    .clone();
                self.run_node(name, &node.command, out_fd, true)
            }
            Some(Component::File(f)) => {
                debug!("evaluating file '{}'", name);
                run_file(&f.path, out_fd)
            }
            None => Err(FlowError::UnknownComponent(name.to_owned())),
        }
    }

    /// Forks and waits for a single shell command, with stdin duplicated
    /// from the evaluator's own stdin and stdout sent to `out_fd`; stderr
    /// is additionally merged into stdout when `merge_stderr` is set
    /// (used by the Stderr wrapper kind).
    fn run_node(
        &mut self,
        name: &str,
        command: &str,
        out_fd: &impl AsRawFd,
        merge_stderr: bool,
    ) -> Result<()> {
        let stdin_raw = posix::dup(libc::STDIN_FILENO).map_err(FlowError::Io)?;
        let stdin = unsafe { File::from_raw_fd(stdin_raw) };
        let process = spawn_shell(command, &stdin, out_fd, merge_stderr).map_err(|source| {
            FlowError::Spawn {
                command: command.to_owned(),
                source,
            }
        })?;
        let status = process.wait().map_err(FlowError::Io)?;
        if !status.success() {
            warn!("component '{}' failed: {:?}", name, status);
            return Err(FlowError::ChildFailed {
                component: name.to_owned(),
            });
        }
        Ok(())
    }

    /// Sequentially evaluates each part into its own pipe, copying the
    /// result onto `out_fd` in declared order. Fails immediately, without
    /// starting later parts, if any part fails.
    fn run_concatenate(&mut self, _name: &str, parts: &[String], out_fd: &impl AsRawFd) -> Result<()> {
        for part in parts {
            let (read_end, write_end) = posix::pipe()?;
            let result = self.evaluate(part, &write_end);
            drop(write_end);
            result?;
            let mut dst = dup_as_file(out_fd)?;
            copier::copy(read_end, &mut dst)?;
        }
        Ok(())
    }

    /// Resolves the pipe's destination, forks a source child that
    /// recursively evaluates `from` into the link pipe's write end, and
    /// either forks a destination child (Node) or copies the link's read
    /// end directly into an opened sink file (File).
    fn run_pipe(&mut self, name: &str, from: &str, to: &str, out_fd: &impl AsRawFd) -> Result<()> {
        let destination = self
            .catalog
            .lookup(to)
            .ok_or_else(|| FlowError::UnknownComponent(to.to_owned()))?;

        let (link_read, link_write) = posix::pipe()?;

        let source_pid = match posix::fork().map_err(FlowError::Io)? {
            Some(pid) => pid,
            None => {
                drop(link_read);
                let rc = match self.evaluate(from, &link_write) {
                    Ok(()) => 0,
                    Err(_) => 1,
                };
                drop(link_write);
                posix::_exit(rc);
            }
        };

        match destination {
            Component::File(f) => {
                drop(link_write);
                let mut sink = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .mode(0o666)
                    .open(&f.path)?;
                copier::copy(&link_read, &mut sink)?;
                drop(link_read);
                let status = posix::waitpid(source_pid).map_err(FlowError::Io)?;
                if !status.success() {
                    warn!("pipe '{}' source failed", name);
                    return Err(FlowError::ChildFailed {
                        component: name.to_owned(),
                    });
                }
                Ok(())
            }
            Component::Node(n) => {
                let dest_pid = match posix::fork().map_err(FlowError::Io)? {
                    Some(pid) => pid,
                    None => {
                        drop(link_write);
                        match spawn_in_child(&n.command, &link_read, out_fd, false) {
                            Ok(()) => unreachable!("exec only returns on failure"),
                            Err(_) => posix::_exit(127),
                        }
                    }
                };
                drop(link_read);
                drop(link_write);
                let source_status = posix::waitpid(source_pid).map_err(FlowError::Io)?;
                let dest_status = posix::waitpid(dest_pid).map_err(FlowError::Io)?;
                if !source_status.success() || !dest_status.success() {
                    warn!("pipe '{}' failed", name);
                    return Err(FlowError::ChildFailed {
                        component: name.to_owned(),
                    });
                }
                Ok(())
            }
            _ => Err(FlowError::UnknownComponent(to.to_owned())),
        }
    }
}

fn run_file(path: &str, out_fd: &impl AsRawFd) -> Result<()> {
    let src = File::open(path)?;
    let mut dst = dup_as_file(out_fd)?;
    copier::copy(src, &mut dst)?;
    Ok(())
}

/// Execs `command` in the calling process (expected to already be a
/// freshly forked child) with `in_fd`/`out_fd` wired to stdin/stdout.
fn spawn_in_child(
    command: &str,
    in_fd: &impl AsRawFd,
    out_fd: &impl AsRawFd,
    merge_stderr: bool,
) -> std::io::Result<()> {
    posix::dup2_if_needed(in_fd.as_raw_fd(), libc::STDIN_FILENO)?;
    posix::dup2_if_needed(out_fd.as_raw_fd(), libc::STDOUT_FILENO)?;
    if merge_stderr {
        posix::dup2(libc::STDOUT_FILENO, libc::STDERR_FILENO)?;
    }
    posix::reset_sigpipe()?;
    posix::exec_shell(command)
}

/// Duplicates `fd` into an owned `File`, mirroring the original's
/// `dup(STDIN_FILENO)` before forking, so each child gets its own
/// descriptor rather than sharing the caller's.
fn dup_as_file(fd: &impl AsRawFd) -> std::io::Result<File> {
    let raw = posix::dup(fd.as_raw_fd())?;
    Ok(unsafe { File::from_raw_fd(raw) })
}
