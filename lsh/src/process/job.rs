use libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::sys::termios::Termios;
use nix::unistd::{Pid, close};
use std::os::unix::io::RawFd;
use tracing::debug;

use super::job_process::JobProcess;
use super::redirect::Redirect;
use super::registry::JobId;
use super::state::ProcessState;
use anyhow::Result;

/// One pipeline: a user-submitted command line tracked as a group of
/// cooperating processes.
#[derive(Debug)]
pub struct Job {
    /// Stable handle assigned when the job enters the registry.
    pub id: JobId,
    /// Original command line, trailing newlines stripped, for display.
    pub cmd: String,
    /// Process group id; None until the first process is forked, at which
    /// point that pid becomes the group id for every subsequent stage.
    pub pgid: Option<Pid>,
    /// Pipeline stages in order.
    pub processes: Vec<JobProcess>,
    /// Whether the user has already been told this job is stopped.
    pub notified: bool,
    /// Terminal mode snapshot taken when the job last held the foreground.
    pub tmodes: Option<Termios>,
    /// Stream overrides from redirections; default to the shell's own
    /// standard streams.
    pub stdin: RawFd,
    pub stdout: RawFd,
    pub stderr: RawFd,
    pub foreground: bool,
    /// True once any stage actually forked; builtin-only jobs never own a
    /// process group and skip terminal arbitration.
    pub forked: bool,
    /// Redirect descriptors owned by the job until launch finishes.
    owned_fds: Vec<RawFd>,
}

impl Job {
    pub fn new(cmd: &str) -> Self {
        Job {
            id: JobId::unassigned(),
            cmd: cmd.trim_end_matches('\n').to_string(),
            pgid: None,
            processes: Vec::new(),
            notified: false,
            tmodes: None,
            stdin: STDIN_FILENO,
            stdout: STDOUT_FILENO,
            stderr: STDERR_FILENO,
            foreground: true,
            forked: false,
            owned_fds: Vec::new(),
        }
    }

    pub fn has_pipe(&self) -> bool {
        self.processes.len() > 1
    }

    /// Open a redirect target and install it as the matching stream
    /// override. The descriptor stays owned by the job until
    /// [`Job::close_redirects`].
    pub fn apply_redirect(&mut self, redirect: &Redirect) -> Result<()> {
        let fd = redirect.open()?;
        match redirect {
            Redirect::Input(_) => self.stdin = fd,
            Redirect::Output(_) | Redirect::Append(_) => self.stdout = fd,
        }
        self.owned_fds.push(fd);
        Ok(())
    }

    /// Close every redirect descriptor still owned by the job. Called once
    /// all stages are launched (children hold their own copies by then), and
    /// on populate failure.
    pub fn close_redirects(&mut self) {
        for fd in self.owned_fds.drain(..) {
            if let Err(e) = close(fd) {
                debug!("failed to close redirect fd {}: {}", fd, e);
            }
        }
        self.stdin = STDIN_FILENO;
        self.stdout = STDOUT_FILENO;
        self.stderr = STDERR_FILENO;
    }

    pub fn position_of_pid(&self, pid: Pid) -> Option<usize> {
        self.processes.iter().position(|p| p.pid() == Some(pid))
    }

    /// Clear stop state ahead of a resume; the next stop gets a fresh
    /// notification.
    pub fn mark_running(&mut self) {
        for p in self.processes.iter_mut() {
            if p.state().is_stopped() {
                p.set_state(ProcessState::Running);
            }
        }
        self.notified = false;
    }

    /// A pipeline stops as a unit: one stage got the stop notification, the
    /// rest are marked along with it.
    pub fn mark_all_stopped(&mut self, signal: nix::sys::signal::Signal) {
        for p in self.processes.iter_mut() {
            if !p.state().is_completed() {
                p.set_state(ProcessState::Stopped(signal));
            }
        }
    }

    /// Completion broadcast for pipelines: stages that have not reported yet
    /// are marked completed so no partial-pipeline survivor keeps running.
    pub fn mark_all_completed(&mut self) {
        for p in self.processes.iter_mut() {
            if !p.state().is_completed() {
                p.set_state(ProcessState::Completed(0, None));
            }
        }
    }

    /// State of the last stage, which decides the pipeline's exit status.
    pub fn last_state(&self) -> ProcessState {
        self.processes
            .last()
            .map(|p| p.state())
            .unwrap_or(ProcessState::Completed(0, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::process::Process;
    use crate::process::wait::{is_job_completed, is_job_stopped};
    use nix::sys::signal::Signal;

    fn init() {
        let _ = tracing_subscriber::fmt::try_init();
    }

    fn pipeline(names: &[&str]) -> Job {
        let mut job = Job::new(&names.join(" | "));
        for name in names {
            job.processes.push(JobProcess::Command(Process::new(
                format!("/usr/bin/{name}"),
                vec![name.to_string()],
            )));
        }
        job
    }

    #[test]
    fn test_command_text_strips_trailing_newlines() {
        init();
        let job = Job::new("sleep 10 &\n\n");
        assert_eq!(job.cmd, "sleep 10 &");
    }

    #[test]
    fn test_stop_broadcast_skips_completed_stages() {
        init();
        let mut job = pipeline(&["cat", "less"]);
        job.processes[0].set_state(ProcessState::Completed(0, None));

        job.mark_all_stopped(Signal::SIGTSTP);

        assert!(job.processes[0].state().is_completed());
        assert!(job.processes[1].state().is_stopped());
        assert!(is_job_stopped(&job));
        assert!(!is_job_completed(&job));
    }

    #[test]
    fn test_completion_broadcast_marks_remaining_stages() {
        init();
        let mut job = pipeline(&["false", "true"]);
        job.processes[0].set_state(ProcessState::Completed(1, None));

        job.mark_all_completed();

        assert!(is_job_completed(&job));
        assert!(matches!(
            job.processes[0].state(),
            ProcessState::Completed(1, None)
        ));
        assert!(matches!(
            job.processes[1].state(),
            ProcessState::Completed(0, None)
        ));
    }

    #[test]
    fn test_mark_running_clears_notified() {
        init();
        let mut job = pipeline(&["cat"]);
        job.processes[0].set_state(ProcessState::Stopped(Signal::SIGTSTP));
        job.notified = true;

        job.mark_running();

        assert!(matches!(job.processes[0].state(), ProcessState::Running));
        assert!(!job.notified);
    }

    #[test]
    fn test_last_state_of_empty_job_is_completed() {
        init();
        let job = Job::new("");
        assert!(job.last_state().is_completed());
    }
}
