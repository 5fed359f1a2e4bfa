//! Thin wrappers around the raw unix syscalls the evaluator needs:
//! `pipe`, `fork`, `execvp`, `waitpid`, `dup2` and close-on-exec control
//! via `fcntl`.

use std::ffi::CString;
use std::fs::File;
use std::io::{Error, Result};
use std::os::unix::io::FromRawFd;
use std::ptr;

fn check_err<T: Ord + Default>(num: T) -> Result<T> {
    if num < T::default() {
        return Err(Error::last_os_error());
    }
    Ok(num)
}

/// Creates an anonymous pipe, returning `(read_end, write_end)`.
///
/// Both ends are marked close-on-exec immediately. `dup2` onto a
/// standard stream always produces a non-cloexec descriptor at the
/// target fd, so the one end a child actually needs survives `exec`
/// while every other pipe fd — including ones held by enclosing,
/// unrelated frames of a nested evaluation — closes automatically at
/// `exec` time instead of leaking into children that never touch it.
/// A leaked extra copy of a write end is exactly what causes a reader
/// elsewhere to block past real EOF, so this matters for correctness,
/// not just hygiene.
pub fn pipe() -> Result<(File, File)> {
    let mut fds = [0 as libc::c_int; 2];
    check_err(unsafe { libc::pipe(fds.as_mut_ptr()) })?;
    set_cloexec(fds[0], true)?;
    set_cloexec(fds[1], true)?;
    Ok(unsafe { (File::from_raw_fd(fds[0]), File::from_raw_fd(fds[1])) })
}

/// Forks the process. Returns `None` in the child, `Some(pid)` in the
/// parent.
pub fn fork() -> Result<Option<u32>> {
    let pid = check_err(unsafe { libc::fork() })?;
    if pid == 0 {
        Ok(None)
    } else {
        Ok(Some(pid as u32))
    }
}

/// Replaces the current process image with `/bin/sh -c <command>`.
/// Only returns if `execvp` itself failed.
pub fn exec_shell(command: &str) -> Result<()> {
    let sh = CString::new("/bin/sh").expect("no interior NUL in \"/bin/sh\"");
    let flag = CString::new("-c").expect("no interior NUL in \"-c\"");
    let cmd = CString::new(command).map_err(|_| Error::from_raw_os_error(libc::EINVAL))?;

    let argv: [*const libc::c_char; 4] = [sh.as_ptr(), flag.as_ptr(), cmd.as_ptr(), ptr::null()];

    check_err(unsafe { libc::execv(sh.as_ptr(), argv.as_ptr()) })?;
    Ok(())
}

/// Terminates the calling process immediately, bypassing destructors.
pub fn _exit(status: u8) -> ! {
    unsafe { libc::_exit(status as libc::c_int) }
}

/// The decoded outcome of a terminated child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Exited(i32),
    Signaled(i32),
    Other(i32),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Exited(0))
    }
}

/// Blocks until the given child exits and returns its decoded status.
pub fn waitpid(pid: u32) -> Result<ExitStatus> {
    let mut status: libc::c_int = 0;
    check_err(unsafe { libc::waitpid(pid as libc::pid_t, &mut status, 0) })?;
    Ok(decode_exit_status(status))
}

fn decode_exit_status(status: libc::c_int) -> ExitStatus {
    unsafe {
        if libc::WIFEXITED(status) {
            ExitStatus::Exited(libc::WEXITSTATUS(status))
        } else if libc::WIFSIGNALED(status) {
            ExitStatus::Signaled(libc::WTERMSIG(status))
        } else {
            ExitStatus::Other(status)
        }
    }
}

pub const F_GETFD: i32 = libc::F_GETFD;
pub const F_SETFD: i32 = libc::F_SETFD;
pub const FD_CLOEXEC: i32 = libc::FD_CLOEXEC;

pub fn fcntl_get(fd: i32, cmd: i32) -> Result<i32> {
    check_err(unsafe { libc::fcntl(fd, cmd) })
}

pub fn fcntl_set(fd: i32, cmd: i32, arg: i32) -> Result<i32> {
    check_err(unsafe { libc::fcntl(fd, cmd, arg) })
}

/// Marks `fd` close-on-exec so it is never inherited by a spawned child
/// unless explicitly dup2'd onto a standard stream first.
pub fn set_cloexec(fd: i32, cloexec: bool) -> Result<()> {
    let old = fcntl_get(fd, F_GETFD)?;
    let new = if cloexec {
        old | FD_CLOEXEC
    } else {
        old & !FD_CLOEXEC
    };
    if new != old {
        fcntl_set(fd, F_SETFD, new)?;
    }
    Ok(())
}

/// Duplicates `fd`, returning a new descriptor pointing at the same open
/// file description.
pub fn dup(fd: i32) -> Result<i32> {
    check_err(unsafe { libc::dup(fd) })
}

pub fn dup2(oldfd: i32, newfd: i32) -> Result<()> {
    check_err(unsafe { libc::dup2(oldfd, newfd) })?;
    Ok(())
}

/// Like `dup2`, but a no-op when `oldfd` is already `newfd` — avoids an
/// unnecessary syscall (and, for the standard streams, avoids closing a
/// descriptor the child still needs) when a component's sink is already
/// wired to the right fd number.
pub fn dup2_if_needed(oldfd: i32, newfd: i32) -> Result<()> {
    if oldfd != newfd {
        dup2(oldfd, newfd)?;
    }
    Ok(())
}

/// Resets SIGPIPE handling to the default after forking. Quoting
/// `std::process::Command::do_exec`: libstd ignores SIGPIPE and
/// signal-handling libraries often set a mask; child processes inherit
/// that, so it must be undone before running an arbitrary program.
pub fn reset_sigpipe() -> Result<()> {
    unsafe {
        let mut set: libc::sigset_t = std::mem::zeroed();
        check_err(libc::sigemptyset(&mut set))?;
        check_err(libc::pthread_sigmask(libc::SIG_SETMASK, &set, ptr::null_mut()))?;
        let ret = libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        if ret == libc::SIG_ERR {
            return Err(Error::last_os_error());
        }
    }
    Ok(())
}
