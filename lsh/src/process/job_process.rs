use nix::unistd::Pid;
use std::os::unix::io::RawFd;

use super::builtin::BuiltinProcess;
use super::process::Process;
use super::state::ProcessState;

/// One pipeline stage: either an in-process builtin or a forked command.
#[derive(Clone, PartialEq, Eq)]
pub enum JobProcess {
    Builtin(BuiltinProcess),
    Command(Process),
}

impl std::fmt::Debug for JobProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        match self {
            JobProcess::Builtin(process) => f
                .debug_struct("JobProcess::Builtin")
                .field("name", &process.name)
                .field("argv", &process.argv)
                .field("state", &process.state)
                .finish(),
            JobProcess::Command(process) => f
                .debug_struct("JobProcess::Command")
                .field("cmd", &process.cmd)
                .field("argv", &process.argv)
                .field("pid", &process.pid)
                .field("stdin", &process.stdin)
                .field("stdout", &process.stdout)
                .field("stderr", &process.stderr)
                .field("state", &process.state)
                .finish(),
        }
    }
}

impl JobProcess {
    pub fn state(&self) -> ProcessState {
        match self {
            JobProcess::Builtin(p) => p.state,
            JobProcess::Command(p) => p.state,
        }
    }

    pub fn set_state(&mut self, state: ProcessState) {
        match self {
            JobProcess::Builtin(p) => p.state = state,
            JobProcess::Command(p) => p.state = state,
        }
    }

    pub fn pid(&self) -> Option<Pid> {
        match self {
            JobProcess::Builtin(_) => None,
            JobProcess::Command(p) => p.pid,
        }
    }

    pub fn set_pid(&mut self, pid: Pid) {
        if let JobProcess::Command(p) = self {
            p.pid = Some(pid);
        }
    }

    /// The name the user typed for this stage (argv[0]).
    pub fn cmd_name(&self) -> &str {
        match self {
            JobProcess::Builtin(p) => p.argv.first().map(|s| s.as_str()).unwrap_or(&p.name),
            JobProcess::Command(p) => p.argv.first().map(|s| s.as_str()).unwrap_or(&p.cmd),
        }
    }

    pub fn set_io(&mut self, stdin: RawFd, stdout: RawFd, stderr: RawFd) {
        match self {
            JobProcess::Builtin(p) => {
                p.stdin = stdin;
                p.stdout = stdout;
                p.stderr = stderr;
            }
            JobProcess::Command(p) => {
                p.stdin = stdin;
                p.stdout = stdout;
                p.stderr = stderr;
            }
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, JobProcess::Builtin(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::Signal;

    #[test]
    fn test_command_stage_accessors() {
        let process = Process::new(
            "/usr/bin/cat".to_string(),
            vec!["cat".to_string(), "file".to_string()],
        );
        let mut stage = JobProcess::Command(process);

        assert_eq!(stage.cmd_name(), "cat");
        assert!(stage.pid().is_none());
        assert!(!stage.is_builtin());

        stage.set_pid(Pid::from_raw(42));
        assert_eq!(stage.pid(), Some(Pid::from_raw(42)));

        stage.set_state(ProcessState::Stopped(Signal::SIGTSTP));
        assert!(stage.state().is_stopped());
    }
}
