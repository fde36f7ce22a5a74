use anyhow::{Context as _, Result};
use libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use nix::unistd::{Pid, close, dup2, execv, setpgid, tcsetpgrp};
use std::ffi::CString;
use std::os::unix::io::RawFd;
use tracing::{debug, error};

use super::state::ProcessState;
use crate::shell::{APP_NAME, SHELL_TERMINAL};

/// One forked pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    /// Resolved program path handed to execv.
    pub(crate) cmd: String,
    pub(crate) argv: Vec<String>,
    pub(crate) pid: Option<Pid>,
    pub(crate) state: ProcessState,
    pub stdin: RawFd,
    pub stdout: RawFd,
    pub stderr: RawFd,
}

/// dup2 src onto dst and close the original, unless they already coincide.
pub(crate) fn copy_fd(src: RawFd, dst: RawFd) -> Result<()> {
    if src != dst {
        dup2(src, dst).map_err(|e| anyhow::anyhow!("dup2 failed: {e}"))?;
        close(src).map_err(|e| anyhow::anyhow!("close failed: {e}"))?;
    }
    Ok(())
}

impl Process {
    pub fn new(cmd: String, argv: Vec<String>) -> Self {
        Process {
            cmd,
            argv,
            pid: None,
            state: ProcessState::Running,
            stdin: STDIN_FILENO,
            stdout: STDOUT_FILENO,
            stderr: STDERR_FILENO,
        }
    }

    fn set_signals(&self) -> Result<()> {
        debug!("restoring default signal dispositions, pid:{:?}", self.pid);
        // Accept job-control-related signals again; the shell ignores them
        // but its children must not.
        let action = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
        unsafe {
            sigaction(Signal::SIGINT, &action)
                .map_err(|e| anyhow::anyhow!("failed to set SIGINT handler: {e}"))?;
            sigaction(Signal::SIGQUIT, &action)
                .map_err(|e| anyhow::anyhow!("failed to set SIGQUIT handler: {e}"))?;
            sigaction(Signal::SIGTSTP, &action)
                .map_err(|e| anyhow::anyhow!("failed to set SIGTSTP handler: {e}"))?;
            sigaction(Signal::SIGTTIN, &action)
                .map_err(|e| anyhow::anyhow!("failed to set SIGTTIN handler: {e}"))?;
            sigaction(Signal::SIGTTOU, &action)
                .map_err(|e| anyhow::anyhow!("failed to set SIGTTOU handler: {e}"))?;
            sigaction(Signal::SIGCHLD, &action)
                .map_err(|e| anyhow::anyhow!("failed to set SIGCHLD handler: {e}"))?;
        }
        Ok(())
    }

    /// Child-side launch: join the job's process group, optionally take the
    /// terminal, reset signal dispositions, wire the standard streams and
    /// replace the image. Only returns on failure.
    pub(crate) fn launch(
        &self,
        pid: Pid,
        pgid: Pid,
        interactive: bool,
        foreground: bool,
    ) -> Result<()> {
        if interactive {
            debug!(
                "child {} pid:{} joining pgid:{} foreground:{}",
                &self.cmd, pid, pgid, foreground
            );
            setpgid(pid, pgid).context("failed setpgid")?;

            if foreground {
                tcsetpgrp(SHELL_TERMINAL, pgid).context("failed tcsetpgrp")?;
            }

            self.set_signals()?;
        }

        let cmd = CString::new(self.cmd.clone()).context("failed new CString")?;
        let argv: Result<Vec<CString>> = self
            .argv
            .clone()
            .into_iter()
            .map(|a| CString::new(a).map_err(|e| anyhow::anyhow!("failed to create CString: {e}")))
            .collect();
        let argv = argv?;

        debug!(
            "execv cmd:{:?} argv:{:?} stdin:{} stdout:{} stderr:{}",
            cmd, argv, self.stdin, self.stdout, self.stderr
        );

        copy_fd(self.stdin, STDIN_FILENO)?;
        if self.stdout == self.stderr {
            dup2(self.stdout, STDOUT_FILENO)
                .map_err(|e| anyhow::anyhow!("dup2 stdout failed: {e}"))?;
            dup2(self.stderr, STDERR_FILENO)
                .map_err(|e| anyhow::anyhow!("dup2 stderr failed: {e}"))?;
            close(self.stdout).map_err(|e| anyhow::anyhow!("close stdout failed: {e}"))?;
        } else {
            copy_fd(self.stdout, STDOUT_FILENO)?;
            copy_fd(self.stderr, STDERR_FILENO)?;
        }

        match execv(&cmd, &argv) {
            Ok(_) => Ok(()),
            Err(nix::errno::Errno::ENOENT) => {
                eprintln!("{}: {}: command not found", APP_NAME, self.argv[0]);
                std::process::exit(127);
            }
            Err(nix::errno::Errno::EACCES) => {
                error!("failed to exec {:?} (EACCES)", cmd);
                eprintln!("{}: {}: permission denied", APP_NAME, self.argv[0]);
                std::process::exit(126);
            }
            Err(err) => {
                error!("failed to exec {:?} ({})", cmd, err);
                eprintln!("{}: {}: {}", APP_NAME, self.argv[0], err);
                std::process::exit(1);
            }
        }
    }
}
