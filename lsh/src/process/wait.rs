use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use tracing::{debug, error};

use super::job::Job;
use super::state::ProcessState;

/// Return true if every process in the job has stopped or completed, i.e.
/// the job no longer holds the foreground.
pub fn is_job_stopped(job: &Job) -> bool {
    job.processes
        .iter()
        .all(|p| !matches!(p.state(), ProcessState::Running))
}

/// Return true if every process in the job has completed.
pub fn is_job_completed(job: &Job) -> bool {
    job.processes.iter().all(|p| p.state().is_completed())
}

/// Wait for at most one child state change.
///
/// With `blocking` false this is a pure poll (WNOHANG). Returns `None` when
/// no status is available, when there are no children left (ECHILD), or on
/// an unexpected wait status.
pub(crate) fn wait_any(blocking: bool) -> Option<(Pid, ProcessState)> {
    let options = if blocking {
        WaitPidFlag::WUNTRACED
    } else {
        WaitPidFlag::WUNTRACED | WaitPidFlag::WNOHANG
    };

    loop {
        return match waitpid(None, Some(options)) {
            Ok(WaitStatus::Exited(pid, status)) => {
                debug!("waitpid: pid {} exited with {}", pid, status);
                Some((pid, ProcessState::Completed(status as u8, None)))
            }
            Ok(WaitStatus::Signaled(pid, signal, _core_dumped)) => {
                debug!("waitpid: pid {} terminated by {:?}", pid, signal);
                Some((pid, ProcessState::Completed(1, Some(signal))))
            }
            Ok(WaitStatus::Stopped(pid, signal)) => {
                debug!("waitpid: pid {} stopped by {:?}", pid, signal);
                Some((pid, ProcessState::Stopped(signal)))
            }
            Ok(WaitStatus::StillAlive) => None,
            Err(nix::errno::Errno::ECHILD) => None,
            Err(nix::errno::Errno::EINTR) => continue,
            status => {
                error!("unexpected waitpid event: {:?}", status);
                None
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::job_process::JobProcess;
    use crate::process::process::Process;
    use nix::sys::signal::Signal;

    fn init() {
        let _ = tracing_subscriber::fmt::try_init();
    }

    fn job_with_states(states: &[ProcessState]) -> Job {
        let mut job = Job::new("/usr/bin/touch");
        for (i, state) in states.iter().enumerate() {
            let mut process = Process::new(format!("{i}"), vec![format!("{i}")]);
            process.state = *state;
            job.processes.push(JobProcess::Command(process));
        }
        job
    }

    #[test]
    fn is_stopped() {
        init();

        let job = job_with_states(&[
            ProcessState::Completed(0, None),
            ProcessState::Completed(0, None),
            ProcessState::Running,
        ]);
        assert!(!is_job_stopped(&job));

        let job = job_with_states(&[
            ProcessState::Completed(0, None),
            ProcessState::Completed(0, None),
            ProcessState::Stopped(Signal::SIGSTOP),
        ]);
        assert!(is_job_stopped(&job));
    }

    #[test]
    fn is_completed() {
        init();

        let job = job_with_states(&[
            ProcessState::Completed(0, None),
            ProcessState::Stopped(Signal::SIGSTOP),
            ProcessState::Completed(0, None),
        ]);
        assert!(!is_job_completed(&job));
        // stopped-or-completed everywhere still counts as stopped
        assert!(is_job_stopped(&job));

        let job = job_with_states(&[
            ProcessState::Completed(0, None),
            ProcessState::Completed(1, None),
        ]);
        assert!(is_job_completed(&job));
    }

    #[test]
    fn test_wait_any_without_children() {
        init();
        // The test harness has no unreaped children of its own here, so a
        // non-blocking wait reports nothing rather than blocking or erroring.
        assert!(wait_any(false).is_none());
    }
}
