//! Spawns a single shell command with specified stdin/stdout and,
//! optionally, stderr merged into stdout.

use std::io;
use std::os::unix::io::AsRawFd;

use log::debug;

use crate::posix;
use crate::process::Process;

/// Forks a child that runs `command` under `/bin/sh -c`, with standard
/// input taken from `in_fd`, standard output sent to `out_fd`, and (if
/// `merge_stderr` is set) standard error redirected to the same
/// destination as standard output.
///
/// `in_fd` and `out_fd` are borrowed for the duration of the call; the
/// caller retains ownership and is responsible for closing them once no
/// longer needed.
pub fn spawn_shell(
    command: &str,
    in_fd: &impl AsRawFd,
    out_fd: &impl AsRawFd,
    merge_stderr: bool,
) -> io::Result<Process> {
    debug!("spawning shell for `{}`", command);

    let in_fd = in_fd.as_raw_fd();
    let out_fd = out_fd.as_raw_fd();

    match posix::fork()? {
        Some(pid) => Ok(Process::from_pid(pid)),
        None => {
            // Child. Any failure here ends the child via _exit(127);
            // returning an Err would unwind into the parent's call stack,
            // running destructors twice.
            match do_exec(command, in_fd, out_fd, merge_stderr) {
                Ok(()) => unreachable!("exec only returns on failure"),
                Err(_) => posix::_exit(127),
            }
        }
    }
}

fn do_exec(command: &str, in_fd: i32, out_fd: i32, merge_stderr: bool) -> io::Result<()> {
    posix::dup2_if_needed(in_fd, libc::STDIN_FILENO)?;
    posix::dup2_if_needed(out_fd, libc::STDOUT_FILENO)?;
    if merge_stderr {
        posix::dup2(libc::STDOUT_FILENO, libc::STDERR_FILENO)?;
    }
    posix::reset_sigpipe()?;
    posix::exec_shell(command)
}
