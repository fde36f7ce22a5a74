use nix::sys::signal::Signal;

/// Lifecycle state of a single pipeline stage.
///
/// `Completed` carries the exit code and, for signal terminations, the
/// offending signal. `Stopped` carries the job-control signal that stopped
/// the process.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProcessState {
    Running,
    Completed(u8, Option<Signal>),
    Stopped(Signal),
}

impl ProcessState {
    pub fn is_completed(&self) -> bool {
        matches!(self, ProcessState::Completed(_, _))
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, ProcessState::Stopped(_))
    }
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ProcessState::Running => formatter.write_str("running"),
            ProcessState::Completed(_, signal) => {
                if let Some(signal) = signal {
                    if signal == &Signal::SIGKILL {
                        formatter.write_str("killed")
                    } else if signal == &Signal::SIGTERM {
                        formatter.write_str("terminated")
                    } else {
                        formatter.write_str("done")
                    }
                } else {
                    formatter.write_str("done")
                }
            }
            ProcessState::Stopped(_) => formatter.write_str("stopped"),
        }
    }
}
