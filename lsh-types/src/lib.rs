use anyhow::Result;
use libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::sys::termios::Termios;
use nix::unistd::Pid;
use std::fmt::Debug;
use std::fs::File;
use std::io::Write;
use std::mem;
use std::os::unix::io::FromRawFd;
use std::os::unix::io::RawFd;
use thiserror::Error;

/// User-facing failures of the job control surface (`jobs`, `bg`, `fg`).
///
/// These are reported to the invocation's stderr and never unwind the
/// shell's main loop.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum JobControlError {
    #[error("not enough jobs")]
    NotEnoughJobs,

    #[error("invalid pid: {0}")]
    InvalidPid(String),

    #[error("no such job: {0}")]
    NoSuchJob(i32),

    #[error("job has already completed")]
    AlreadyCompleted,
}

/// Per-invocation execution context.
///
/// Carries the shell's identity, the saved terminal mode, and the stream
/// descriptors the current pipeline stage should use. The launcher rewires
/// `infile`/`outfile` while walking the pipeline and calls [`Context::reset`]
/// when the job is done.
#[derive(Clone)]
pub struct Context {
    pub shell_pid: Pid,
    pub shell_pgid: Pid,
    pub shell_tmode: Option<Termios>,
    pub foreground: bool,
    pub interactive: bool,
    pub infile: RawFd,
    pub outfile: RawFd,
    pub errfile: RawFd,
    pub process_count: u32,
}

impl Context {
    pub fn new(
        shell_pid: Pid,
        shell_pgid: Pid,
        shell_tmode: Option<Termios>,
        interactive: bool,
    ) -> Self {
        Context {
            shell_pid,
            shell_pgid,
            shell_tmode,
            foreground: true,
            interactive,
            infile: STDIN_FILENO,
            outfile: STDOUT_FILENO,
            errfile: STDERR_FILENO,
            process_count: 0,
        }
    }

    pub fn write_stdout(&self, msg: &str) -> Result<()> {
        let mut file = unsafe { File::from_raw_fd(self.outfile) };
        writeln!(&mut file, "{msg}")?;
        mem::forget(file);
        Ok(())
    }

    pub fn write_stderr(&self, msg: &str) -> Result<()> {
        let mut file = unsafe { File::from_raw_fd(self.errfile) };
        writeln!(&mut file, "{msg}")?;
        mem::forget(file);
        Ok(())
    }

    /// Restore the default stream descriptors after a job has been launched.
    pub fn reset(&mut self) {
        self.infile = STDIN_FILENO;
        self.outfile = STDOUT_FILENO;
        self.errfile = STDERR_FILENO;
        self.foreground = true;
        self.process_count = 0;
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        f.debug_struct("Context")
            .field("shell_pid", &self.shell_pid)
            .field("shell_pgid", &self.shell_pgid)
            .field("foreground", &self.foreground)
            .field("interactive", &self.interactive)
            .field("infile", &self.infile)
            .field("outfile", &self.outfile)
            .field("errfile", &self.errfile)
            .field("process_count", &self.process_count)
            .finish()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ExitStatus {
    ExitedWith(i32),
}

impl ExitStatus {
    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::ExitedWith(code) => *code,
        }
    }
}
