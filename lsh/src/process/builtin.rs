use libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use lsh_builtin::BuiltinCommand;
use lsh_types::ExitStatus;
use std::os::unix::io::RawFd;

use super::state::ProcessState;

/// One in-process pipeline stage. Builtins never fork; the launcher runs
/// them directly with the stage's designated streams swapped into the
/// execution context, and they are marked completed immediately.
#[derive(Clone)]
pub struct BuiltinProcess {
    pub(crate) name: String,
    pub(crate) cmd_fn: BuiltinCommand,
    pub(crate) argv: Vec<String>,
    pub(crate) state: ProcessState,
    pub stdin: RawFd,
    pub stdout: RawFd,
    pub stderr: RawFd,
}

impl PartialEq for BuiltinProcess {
    fn eq(&self, other: &Self) -> bool {
        self.argv == other.argv
    }
}

impl Eq for BuiltinProcess {}

impl std::fmt::Debug for BuiltinProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        f.debug_struct("BuiltinProcess")
            .field("name", &self.name)
            .field("argv", &self.argv)
            .field("state", &self.state)
            .field("stdin", &self.stdin)
            .field("stdout", &self.stdout)
            .field("stderr", &self.stderr)
            .finish()
    }
}

impl BuiltinProcess {
    pub fn new(name: String, cmd_fn: BuiltinCommand, argv: Vec<String>) -> Self {
        BuiltinProcess {
            name,
            cmd_fn,
            argv,
            state: ProcessState::Running,
            stdin: STDIN_FILENO,
            stdout: STDOUT_FILENO,
            stderr: STDERR_FILENO,
        }
    }

    /// Record the builtin's result; an in-process stage completes the
    /// instant its handler returns.
    pub(crate) fn apply_exit(&mut self, status: ExitStatus) {
        let code = status.code().clamp(0, 255) as u8;
        self.state = ProcessState::Completed(code, None);
    }
}
