use crate::environment::Environment;
use crate::parser::{self, ParsedPipeline};
use crate::process::fork::fork_process;
use crate::process::signal::{self, send_signal_group};
use crate::process::wait::{is_job_completed, is_job_stopped, wait_any};
use crate::process::{
    BuiltinProcess, Job, JobId, JobProcess, JobRegistry, Process, ProcessState, Redirect,
};
use anyhow::{Context as _, Result};
use libc::{STDIN_FILENO, c_int};
use lsh_builtin::BuiltinCommand;
use lsh_types::{Context, ExitStatus};
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use nix::sys::termios::{SetArg, Termios, tcgetattr, tcsetattr};
use nix::unistd::{Pid, close, getpgrp, getpid, isatty, pipe, setpgid, tcgetpgrp, tcsetpgrp};
use std::io::Write as _;
use std::os::unix::io::RawFd;
use tracing::{debug, warn};

pub const APP_NAME: &str = "lsh";
pub const SHELL_TERMINAL: c_int = STDIN_FILENO;

/// Shell-wide mutable state: the job registry, the shell's own process
/// group and saved terminal mode, the current job, and the exit latch.
///
/// Single-threaded by design. The SIGCHLD handler never touches this
/// struct; it raises a flag that the synchronous paths drain, so the
/// reconciler only ever runs interleaved with the main loop, never
/// concurrently with it.
pub struct Shell {
    pub environment: Environment,
    pub exited: Option<ExitStatus>,
    pub pid: Pid,
    pub pgid: Pid,
    pub tmodes: Option<Termios>,
    pub interactive: bool,
    /// True while the shell is idle at its prompt; decides whether a status
    /// notice needs a fresh line before it.
    pub invite_mode: bool,
    pub(crate) jobs: JobRegistry,
    /// The job currently holding the shell's attention, if any.
    pub(crate) current: Option<JobId>,
}

impl std::fmt::Debug for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        f.debug_struct("Shell")
            .field("pid", &self.pid)
            .field("pgid", &self.pgid)
            .field("interactive", &self.interactive)
            .field("jobs", &self.jobs.len())
            .finish()
    }
}

enum Stage {
    Builtin(BuiltinCommand, Vec<String>),
    Command(Process),
}

impl Shell {
    pub fn new(environment: Environment) -> Self {
        let pid = getpid();
        let pgid = getpgrp();

        Shell {
            environment,
            exited: None,
            pid,
            pgid,
            tmodes: None,
            interactive: false,
            invite_mode: false,
            jobs: JobRegistry::new(),
            current: None,
        }
    }

    /// Interactive startup: wait until this process group owns the
    /// controlling terminal, take a process group of our own, ignore the
    /// interactive signals, install the SIGCHLD flag handler and snapshot
    /// the terminal mode. The only fatal failure path in the shell.
    pub fn init_interactive(&mut self) -> Result<()> {
        if !isatty(SHELL_TERMINAL).unwrap_or(false) {
            debug!("stdin is not a terminal, staying non-interactive");
            return Ok(());
        }

        // Loop until the shell is in the foreground.
        loop {
            let fg = tcgetpgrp(SHELL_TERMINAL).context("failed tcgetpgrp")?;
            if fg == getpgrp() {
                break;
            }
            send_signal_group(getpgrp(), Signal::SIGTTIN)
                .context("failed to stop while waiting for the foreground")?;
        }

        self.set_signals();
        signal::install_sigchld_handler()?;

        let pid = getpid();
        if let Err(err) = setpgid(pid, pid) {
            // Session leaders cannot change their group; that is fine.
            debug!("setpgid failed: {err}");
        }
        self.pgid = getpgrp();

        tcsetpgrp(SHELL_TERMINAL, self.pgid)
            .context("shell is not allowed to control the terminal")?;
        self.tmodes = Some(tcgetattr(SHELL_TERMINAL).context("failed tcgetattr")?);
        self.interactive = true;
        debug!("interactive shell ready, pgid {}", self.pgid);
        Ok(())
    }

    /// The shell ignores the interactive stop/interrupt signals; its
    /// children restore the defaults after forking.
    pub fn set_signals(&mut self) {
        let action = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        unsafe {
            sigaction(Signal::SIGINT, &action).expect("failed sigaction");
            sigaction(Signal::SIGQUIT, &action).expect("failed sigaction");
            sigaction(Signal::SIGTSTP, &action).expect("failed sigaction");
            sigaction(Signal::SIGTTIN, &action).expect("failed sigaction");
            sigaction(Signal::SIGTTOU, &action).expect("failed sigaction");
        }
    }

    pub fn exit(&mut self) {
        self.exited = Some(ExitStatus::ExitedWith(0));
    }

    /// Number of jobs currently tracked by the registry.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Evaluate one input line: every `;`/`&` segment becomes a job that is
    /// registered, launched and, once fully reaped, silently removed.
    pub fn eval_str(&mut self, ctx: &mut Context, input: String) -> Result<ExitStatus> {
        let pipelines = parser::parse_line(&input)?;
        let mut last_status = ExitStatus::ExitedWith(0);

        for parsed in pipelines {
            let mut job = Job::new(&parsed.text);
            job.foreground = !parsed.background;
            if let Err(err) = self.populate_job(&mut job, &parsed) {
                job.close_redirects();
                crate::errors::display_user_error(&err);
                last_status = ExitStatus::ExitedWith(1);
                continue;
            }
            if job.processes.is_empty() {
                continue;
            }

            let id = self.jobs.push(job);
            self.current = Some(id);
            debug!(
                "starting job {} '{}' foreground:{}",
                id, parsed.text, !parsed.background
            );

            let result = self.launch_job(ctx, id);

            // A fully reaped current job leaves the registry without a
            // notice; everything else stays for the notification pass.
            // Drain what is already available first so broadcast-marked
            // stages are reaped while their job is still registered.
            self.reconcile_available();
            if let Some(cur) = self.current.take() {
                if let Some(job) = self.jobs.get(cur) {
                    if is_job_completed(job) {
                        if let ProcessState::Completed(code, _) = job.last_state() {
                            last_status = ExitStatus::ExitedWith(code as i32);
                        }
                        self.jobs.remove(cur);
                    }
                }
            }
            ctx.reset();
            result?;

            if self.exited.is_some() {
                break;
            }
        }
        Ok(last_status)
    }

    /// Build the job's stages from the parsed commands and open its
    /// redirect targets. Builtins stay in-process; everything else resolves
    /// along PATH (an unresolved name is launched as-is and fails in the
    /// child).
    fn populate_job(&mut self, job: &mut Job, parsed: &ParsedPipeline) -> Result<()> {
        for command in &parsed.commands {
            let name = match command.argv.first() {
                Some(name) => name.clone(),
                None => continue,
            };
            if let Some(cmd_fn) = lsh_builtin::get_command(&name) {
                job.processes.push(JobProcess::Builtin(BuiltinProcess::new(
                    name,
                    cmd_fn,
                    command.argv.clone(),
                )));
            } else {
                let path = self
                    .environment
                    .lookup(&name)
                    .unwrap_or_else(|| name.clone());
                job.processes
                    .push(JobProcess::Command(Process::new(path, command.argv.clone())));
            }
        }

        if let Some(ref path) = parsed.infile {
            job.apply_redirect(&Redirect::Input(path.clone()))?;
        }
        if let Some(ref path) = parsed.outfile {
            job.apply_redirect(&Redirect::Output(path.clone()))?;
        }
        if let Some(ref path) = parsed.appfile {
            job.apply_redirect(&Redirect::Append(path.clone()))?;
        }
        Ok(())
    }

    /// Pipeline launcher: one pass over the stages, wiring a fresh pipe
    /// between each pair of neighbors. Builtins run in-process with the
    /// stage's streams swapped into the context; commands fork. Pipe ends
    /// are closed in the launcher as soon as the stage holding them is up,
    /// so descriptor usage stays O(1) regardless of pipeline length.
    fn launch_job(&mut self, ctx: &mut Context, id: JobId) -> Result<()> {
        let (nstages, foreground, job_stdin, job_stdout, job_stderr) = match self.jobs.get(id) {
            Some(job) => (
                job.processes.len(),
                job.foreground,
                job.stdin,
                job.stdout,
                job.stderr,
            ),
            None => return Ok(()),
        };
        ctx.foreground = foreground;

        let mut infile: RawFd = job_stdin;

        for i in 0..nstages {
            let is_last = i + 1 == nstages;
            let (outfile, next_infile) = if is_last {
                (job_stdout, None)
            } else {
                match pipe() {
                    Ok((pout, pin)) => (pin, Some(pout)),
                    Err(err) => {
                        eprintln!("{APP_NAME}: failed to create pipe: {err}");
                        if infile != job_stdin {
                            let _ = close(infile);
                        }
                        infile = job_stdin;
                        if let Some(job) = self.jobs.get_mut(id) {
                            if let Some(stage) = job.processes.get_mut(i) {
                                stage.set_state(ProcessState::Completed(1, None));
                            }
                        }
                        continue;
                    }
                }
            };

            ctx.infile = infile;
            ctx.outfile = outfile;
            ctx.errfile = job_stderr;

            let stage = match self.jobs.get(id).and_then(|job| job.processes.get(i)) {
                Some(JobProcess::Builtin(b)) => Stage::Builtin(b.cmd_fn, b.argv.clone()),
                Some(JobProcess::Command(p)) => Stage::Command(p.clone()),
                // the stage's own builtin removed the job (bg/fg control job)
                None => {
                    if infile != job_stdin {
                        let _ = close(infile);
                    }
                    if outfile != job_stdout {
                        let _ = close(outfile);
                    }
                    break;
                }
            };

            match stage {
                Stage::Builtin(cmd_fn, argv) => {
                    debug!("running builtin stage {} in-process", i);
                    let status = cmd_fn(ctx, argv, self);
                    if let Some(job) = self.jobs.get_mut(id) {
                        if let Some(stage) = job.processes.get_mut(i) {
                            stage.set_io(ctx.infile, ctx.outfile, ctx.errfile);
                            if let JobProcess::Builtin(b) = stage {
                                b.apply_exit(status);
                            }
                        }
                    }
                }
                Stage::Command(mut process) => {
                    process.stdin = ctx.infile;
                    process.stdout = ctx.outfile;
                    process.stderr = ctx.errfile;

                    let job_pgid = self.jobs.get(id).and_then(|j| j.pgid);
                    match fork_process(ctx, job_pgid, &process) {
                        Ok(pid) => {
                            ctx.process_count += 1;
                            if let Some(job) = self.jobs.get_mut(id) {
                                job.forked = true;
                                if ctx.interactive && job.pgid.is_none() {
                                    job.pgid = Some(pid);
                                    debug!("job {} pgid set to {}", job.id, pid);
                                }
                                if let Some(stage) = job.processes.get_mut(i) {
                                    stage.set_pid(pid);
                                    stage.set_io(process.stdin, process.stdout, process.stderr);
                                }
                            }
                        }
                        Err(err) => {
                            eprintln!("{APP_NAME}: failed to create process: {err}");
                            if let Some(job) = self.jobs.get_mut(id) {
                                if let Some(stage) = job.processes.get_mut(i) {
                                    stage.set_state(ProcessState::Completed(1, None));
                                }
                            }
                        }
                    }
                }
            }

            // the children hold their own copies by now
            if infile != job_stdin {
                let _ = close(infile);
            }
            if outfile != job_stdout {
                let _ = close(outfile);
            }
            infile = next_infile.unwrap_or(job_stdin);
        }

        if let Some(job) = self.jobs.get_mut(id) {
            job.close_redirects();
        }

        // Terminal placement. Builtin-only jobs have no process group to
        // wait on and skip this entirely.
        let placement = self.jobs.get(id).map(|j| (j.forked, j.foreground, j.pgid));
        if let Some((true, fg, pgid)) = placement {
            if ctx.interactive {
                if fg {
                    self.put_in_foreground(id, false)?;
                } else {
                    if let Some(pgid) = pgid {
                        println!("Background pid: {pgid}");
                    }
                    self.put_in_background(id, false)?;
                }
            } else if fg {
                self.reconcile_until(id);
            }
        }
        ctx.reset();
        Ok(())
    }

    // ---- status reconciliation -------------------------------------------

    /// Wait for at most one child state change and fold it into the
    /// registry. Returns false when nothing was reaped. Never blocks when
    /// nothing in the registry ever forked, even if `blocking` is set.
    pub(crate) fn reconcile_one(&mut self, blocking: bool) -> bool {
        if self.jobs.all_builtin() {
            return false;
        }
        match wait_any(blocking) {
            Some((pid, state)) => {
                self.apply_status(pid, state);
                true
            }
            None => false,
        }
    }

    /// Drain every immediately available status event.
    pub(crate) fn reconcile_available(&mut self) {
        while self.reconcile_one(false) {}
    }

    /// Block until the given job is fully stopped or fully completed. The
    /// shell takes no new input while a foreground job owns the terminal.
    pub(crate) fn reconcile_until(&mut self, id: JobId) {
        loop {
            match self.jobs.get(id) {
                Some(job) if !is_job_stopped(job) && !is_job_completed(job) => {}
                _ => break,
            }
            if !self.reconcile_one(true) {
                break;
            }
        }
    }

    /// Fold one wait report into the matching process. Only per-process
    /// state flags are mutated here; jobs are never inserted or removed, so
    /// this is safe to run from any drain point.
    fn apply_status(&mut self, pid: Pid, state: ProcessState) {
        let mut located: Option<(usize, usize)> = None;
        for (jidx, job) in self.jobs.as_slice().iter().enumerate() {
            if let Some(pidx) = job.position_of_pid(pid) {
                located = Some((jidx, pidx));
                break;
            }
        }
        let Some((jidx, pidx)) = located else {
            // Recoverable inconsistency: a pipeline member that was
            // broadcast-marked and reaped after its job left the registry
            // also lands here.
            warn!("no child process {} in the registry", pid);
            return;
        };

        // Broadcast-marked stages are reaped silently when their real
        // report arrives later.
        if self.jobs.as_slice()[jidx].processes[pidx].state().is_completed() {
            debug!("pid {} already recorded as completed", pid);
            return;
        }

        debug!("pid {} -> {:?}", pid, state);
        match state {
            ProcessState::Stopped(stop_signal) => {
                let job = &mut self.jobs.as_mut_slice()[jidx];
                job.processes[pidx].set_state(state);
                if job.has_pipe() {
                    // A pipeline stops as a unit even though only one stage
                    // received the stop notification.
                    if let Some(pgid) = job.pgid {
                        let _ = send_signal_group(pgid, Signal::SIGSTOP);
                    }
                    job.mark_all_stopped(stop_signal);
                }
            }
            ProcessState::Completed(_, signal) => {
                let argv0 = self.jobs.as_slice()[jidx].processes[pidx]
                    .cmd_name()
                    .to_string();
                self.jobs.as_mut_slice()[jidx].processes[pidx].set_state(state);

                if let Some(signal) = signal {
                    if self.invite_mode {
                        println!();
                        self.invite_mode = false;
                    }
                    println!(
                        "[{jidx}] - {argv0}: Terminated by signal {}.",
                        signal as i32
                    );
                    let _ = std::io::stdout().flush();
                }

                let job = &mut self.jobs.as_mut_slice()[jidx];
                if job.has_pipe() && !is_job_completed(job) {
                    // Symmetric broadcast on completion so no
                    // partial-pipeline survivor keeps running.
                    if let Some(pgid) = job.pgid {
                        let _ = send_signal_group(pgid, Signal::SIGTERM);
                    }
                    job.mark_all_completed();
                }
            }
            ProcessState::Running => {}
        }
    }

    // ---- notifications ---------------------------------------------------

    /// Notify the user about stopped and terminated jobs, removing
    /// completed ones as they are reported. With `show_all` (the `jobs`
    /// builtin) stopped jobs are always listed and running jobs appear
    /// unlabeled; otherwise a stopped job is announced exactly once.
    /// Returns true if anything was printed.
    pub fn notify_jobs(&mut self, ctx: Option<&Context>, show_all: bool) -> bool {
        self.reconcile_available();

        let mut printed = false;
        let mut idx = 0;
        while idx < self.jobs.len() {
            let (id, completed, stopped, notified, cmd) = {
                let job = &self.jobs.as_slice()[idx];
                (
                    job.id,
                    is_job_completed(job),
                    is_job_stopped(job),
                    job.notified,
                    job.cmd.clone(),
                )
            };
            if Some(id) == self.current {
                idx += 1;
                continue;
            }
            if completed {
                self.emit_job_notice(ctx, &mut printed, &format!("[{idx}] (completed): {cmd}"));
                self.jobs.remove(id);
                continue;
            }
            if stopped {
                if !notified || show_all {
                    self.emit_job_notice(ctx, &mut printed, &format!("[{idx}] (stopped): {cmd}"));
                    if !show_all {
                        self.jobs.as_mut_slice()[idx].notified = true;
                    }
                }
            } else if show_all {
                self.emit_job_notice(ctx, &mut printed, &format!("[{idx}] : {cmd}"));
            }
            idx += 1;
        }
        printed
    }

    fn emit_job_notice(&mut self, ctx: Option<&Context>, printed: &mut bool, line: &str) {
        if self.invite_mode && !*printed {
            // break out of the pending prompt line first
            match ctx {
                Some(ctx) => {
                    ctx.write_stdout("").ok();
                }
                None => println!(),
            }
        }
        self.invite_mode = false;
        *printed = true;
        match ctx {
            Some(ctx) => {
                ctx.write_stdout(line).ok();
            }
            None => {
                println!("{line}");
                let _ = std::io::stdout().flush();
            }
        }
    }

    // ---- terminal arbitration --------------------------------------------

    /// Hand the controlling terminal to the job, optionally restoring its
    /// saved terminal mode and waking its group, then wait until the job
    /// yields, take the terminal back and swap terminal modes.
    pub fn put_in_foreground(&mut self, id: JobId, cont: bool) -> Result<()> {
        debug!("put_in_foreground: job {} cont: {}", id, cont);

        let pgid = match self.jobs.get(id).and_then(|j| j.pgid) {
            Some(pgid) => pgid,
            None => {
                self.reconcile_until(id);
                return Ok(());
            }
        };
        if !self.interactive || !isatty(SHELL_TERMINAL).unwrap_or(false) {
            self.reconcile_until(id);
            return Ok(());
        }

        if let Err(err) = tcsetpgrp(SHELL_TERMINAL, pgid) {
            debug!("tcsetpgrp {} failed: {}, continuing", pgid, err);
        }

        if cont {
            if let Some(tmodes) = self.jobs.get(id).and_then(|j| j.tmodes.clone()) {
                if let Err(err) = tcsetattr(SHELL_TERMINAL, SetArg::TCSADRAIN, &tmodes) {
                    debug!("failed to restore job terminal modes: {}", err);
                }
            }
            send_signal_group(pgid, Signal::SIGCONT).context("failed to send SIGCONT")?;
        }

        self.reconcile_until(id);

        if let Err(err) = tcsetpgrp(SHELL_TERMINAL, self.pgid) {
            debug!("tcsetpgrp back to shell failed: {}", err);
        }
        // The job may have changed the line discipline; keep its view for
        // the next resume and restore our own.
        if let Some(job) = self.jobs.get_mut(id) {
            job.tmodes = tcgetattr(SHELL_TERMINAL).ok();
        }
        if let Some(ref tmodes) = self.tmodes {
            if let Err(err) = tcsetattr(SHELL_TERMINAL, SetArg::TCSADRAIN, tmodes) {
                debug!("failed to restore shell terminal modes: {}", err);
            }
        }
        Ok(())
    }

    /// Background placement never touches terminal ownership; with `cont`
    /// it wakes the job's group.
    pub fn put_in_background(&mut self, id: JobId, cont: bool) -> Result<()> {
        debug!("put_in_background: job {} cont: {}", id, cont);
        if cont {
            if let Some(pgid) = self.jobs.get(id).and_then(|j| j.pgid) {
                send_signal_group(pgid, Signal::SIGCONT).context("failed to send SIGCONT")?;
            }
        }
        Ok(())
    }

    // ---- teardown --------------------------------------------------------

    /// Signal every tracked process group and release the registry;
    /// restores the shell's terminal mode on the way out.
    pub fn shutdown(&mut self) {
        debug!("shutting down, releasing {} job(s)", self.jobs.len());
        for job in self.jobs.drain() {
            if let Some(pgid) = job.pgid {
                let _ = send_signal_group(pgid, Signal::SIGTERM);
                // a stopped group only acts on the termination once woken
                let _ = send_signal_group(pgid, Signal::SIGCONT);
            }
        }
        if self.interactive {
            if let Some(ref tmodes) = self.tmodes {
                let _ = tcsetattr(SHELL_TERMINAL, SetArg::TCSADRAIN, tmodes);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = tracing_subscriber::fmt::try_init();
    }

    fn test_shell() -> Shell {
        Shell::new(Environment::new())
    }

    fn completed_job(cmd: &str) -> Job {
        let mut job = Job::new(cmd);
        let mut process = Process::new(format!("/usr/bin/{cmd}"), vec![cmd.to_string()]);
        process.state = ProcessState::Completed(0, None);
        job.processes.push(JobProcess::Command(process));
        job
    }

    fn stopped_job(cmd: &str) -> Job {
        let mut job = Job::new(cmd);
        let mut process = Process::new(format!("/usr/bin/{cmd}"), vec![cmd.to_string()]);
        process.state = ProcessState::Stopped(Signal::SIGTSTP);
        job.processes.push(JobProcess::Command(process));
        job
    }

    #[test]
    fn test_notify_removes_completed_jobs() {
        init();
        let mut shell = test_shell();
        shell.jobs.push(completed_job("true"));
        shell.jobs.push(stopped_job("cat"));

        let printed = shell.notify_jobs(None, false);
        assert!(printed);
        // completed job is gone, stopped one stays and is now notified
        assert_eq!(shell.jobs.len(), 1);
        assert!(shell.jobs.as_slice()[0].notified);
    }

    #[test]
    fn test_stopped_notice_is_not_repeated() {
        init();
        let mut shell = test_shell();
        shell.jobs.push(stopped_job("cat"));

        assert!(shell.notify_jobs(None, false));
        assert!(!shell.notify_jobs(None, false));

        // the jobs listing still shows it
        assert!(shell.notify_jobs(None, true));
        assert_eq!(shell.jobs.len(), 1);
    }

    #[test]
    fn test_notify_skips_current_job() {
        init();
        let mut shell = test_shell();
        let id = shell.jobs.push(completed_job("jobs"));
        shell.current = Some(id);

        let printed = shell.notify_jobs(None, true);
        assert!(!printed);
        assert_eq!(shell.jobs.len(), 1);
    }

    #[test]
    fn test_reconcile_one_returns_without_children() {
        init();
        let mut shell = test_shell();
        shell.jobs.push(completed_job("cd"));
        // nothing in the registry ever forked, so even a blocking
        // reconcile must return immediately
        assert!(!shell.reconcile_one(true));
    }

    #[test]
    fn test_apply_status_for_untracked_pid_is_harmless() {
        init();
        let mut shell = test_shell();
        shell.jobs.push(stopped_job("cat"));

        shell.apply_status(Pid::from_raw(999_999), ProcessState::Completed(0, None));
        assert_eq!(shell.jobs.len(), 1);
        assert!(shell.jobs.as_slice()[0].processes[0].state().is_stopped());
    }

    #[test]
    fn test_stop_broadcast_marks_whole_pipeline() {
        init();
        let mut shell = test_shell();
        let mut job = Job::new("cat | less");
        for (i, name) in ["cat", "less"].iter().enumerate() {
            let mut process = Process::new(format!("/usr/bin/{name}"), vec![name.to_string()]);
            process.pid = Some(Pid::from_raw(800_000 + i as i32));
            job.processes.push(JobProcess::Command(process));
        }
        // no pgid on purpose: the broadcast must not signal anything here
        shell.jobs.push(job);

        shell.apply_status(
            Pid::from_raw(800_001),
            ProcessState::Stopped(Signal::SIGTSTP),
        );

        let job = &shell.jobs.as_slice()[0];
        assert!(is_job_stopped(job));
        assert!(job.processes.iter().all(|p| p.state().is_stopped()));
    }

    #[test]
    fn test_completion_broadcast_marks_whole_pipeline() {
        init();
        let mut shell = test_shell();
        let mut job = Job::new("false | true");
        for (i, name) in ["false", "true"].iter().enumerate() {
            let mut process = Process::new(format!("/usr/bin/{name}"), vec![name.to_string()]);
            process.pid = Some(Pid::from_raw(810_000 + i as i32));
            job.processes.push(JobProcess::Command(process));
        }
        shell.jobs.push(job);

        shell.apply_status(Pid::from_raw(810_000), ProcessState::Completed(1, None));

        let job = &shell.jobs.as_slice()[0];
        assert!(is_job_completed(job));
        // the reporting stage keeps its real status
        assert!(matches!(
            job.processes[0].state(),
            ProcessState::Completed(1, None)
        ));
        assert!(matches!(
            job.processes[1].state(),
            ProcessState::Completed(0, None)
        ));

        // a late report for a broadcast-marked stage is reaped silently
        shell.apply_status(Pid::from_raw(810_001), ProcessState::Completed(0, None));
        let job = &shell.jobs.as_slice()[0];
        assert!(matches!(
            job.processes[1].state(),
            ProcessState::Completed(0, None)
        ));
    }
}
