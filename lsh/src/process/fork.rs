use anyhow::{Context as _, Result};
use nix::unistd::{ForkResult, Pid, fork, getpid, setpgid};
use tracing::{debug, error};

use super::process::Process;
use crate::shell::APP_NAME;
use lsh_types::Context;

/// Fork one pipeline stage.
///
/// The child joins the job's process group (creating it from its own pid if
/// this is the first stage), resets signal dispositions and execs. The
/// parent joins the child to the same group as well — both sides race the
/// scheduler, so both perform the setpgid to guarantee the group exists
/// before anyone signals it.
pub(crate) fn fork_process(
    ctx: &Context,
    job_pgid: Option<Pid>,
    process: &Process,
) -> Result<Pid> {
    debug!(
        "fork_process cmd:{} pgid:{:?} foreground:{}",
        process.cmd, job_pgid, ctx.foreground
    );

    let pid = unsafe { fork().context("failed fork")? };

    match pid {
        ForkResult::Parent { child } => {
            debug!("forked {} pid:{}", process.cmd, child);
            if ctx.interactive {
                let pgid = job_pgid.unwrap_or(child);
                // The child may already have execed or exited; either way the
                // group assignment has been taken care of.
                if let Err(e) = setpgid(child, pgid) {
                    debug!("parent setpgid {} -> {} failed: {}", child, pgid, e);
                }
            }
            Ok(child)
        }
        ForkResult::Child => {
            let pid = getpid();
            let pgid = job_pgid.unwrap_or(pid);
            if let Err(e) = process.launch(pid, pgid, ctx.interactive, ctx.foreground) {
                error!("child launch failed: {}", e);
                eprintln!("{}: {}: {}", APP_NAME, process.cmd, e);
                std::process::exit(1);
            }
            // launch only returns on error; exit as a safety measure
            std::process::exit(1);
        }
    }
}
