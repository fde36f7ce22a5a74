use crate::process::JobId;
use crate::process::wait::is_job_completed;
use crate::shell::Shell;
use anyhow::Result;
use lsh_builtin::ShellProxy;
use lsh_types::{Context, JobControlError};
use nix::unistd::Pid;
use tracing::debug;

impl ShellProxy for Shell {
    fn exit_shell(&mut self) {
        self.exit();
    }

    fn changepwd(&mut self, path: &str) -> Result<()> {
        std::env::set_current_dir(path)?;
        unsafe { std::env::set_var("PWD", path) };
        Ok(())
    }

    fn dispatch(&mut self, ctx: &Context, cmd: &str, argv: Vec<String>) -> Result<()> {
        match cmd {
            "exit" => {
                self.exit();
            }
            "jobs" => {
                self.notify_jobs(Some(ctx), true);
            }
            "bg" => {
                self.job_to_background(ctx, &argv)?;
            }
            "fg" => {
                self.job_to_foreground(ctx, &argv)?;
            }
            _ => {}
        }
        Ok(())
    }
}

impl Shell {
    /// Resolve the job a `bg`/`fg` invocation targets.
    ///
    /// The invoking control job occupies the registry's last slot, so the
    /// no-argument default is the second-to-last entry; if that entry is
    /// already completed, the registry is scanned backward for the most
    /// recent non-completed job. An explicit pid argument (accepted with or
    /// without the group-signal minus sign) must match a job's pgid exactly
    /// and hard-fails if that job is completed.
    pub(crate) fn resolve_job_target(
        &self,
        argv: &[String],
    ) -> Result<JobId, JobControlError> {
        if self.jobs.len() < 2 {
            return Err(JobControlError::NotEnoughJobs);
        }

        if let Some(arg) = argv.get(1) {
            let raw: i32 = arg
                .parse()
                .map_err(|_| JobControlError::InvalidPid(arg.clone()))?;
            let pgid = Pid::from_raw(raw.abs());
            let job = self
                .jobs
                .find_by_pgid(pgid)
                .ok_or(JobControlError::NoSuchJob(raw))?;
            if is_job_completed(job) {
                return Err(JobControlError::AlreadyCompleted);
            }
            Ok(job.id)
        } else {
            let jobs = self.jobs.as_slice();
            let idx = jobs.len() - 2;
            if !is_job_completed(&jobs[idx]) {
                return Ok(jobs[idx].id);
            }
            for job in jobs[..idx].iter().rev() {
                if !is_job_completed(job) {
                    return Ok(job.id);
                }
            }
            Err(JobControlError::AlreadyCompleted)
        }
    }

    /// The bg/fg invocation's own job has served its purpose once the
    /// target is resolved.
    fn drop_control_job(&mut self) {
        if let Some(cur) = self.current.take() {
            debug!("removing control job {}", cur);
            self.jobs.remove(cur);
        }
    }

    pub(crate) fn job_to_background(&mut self, _ctx: &Context, argv: &[String]) -> Result<()> {
        let target = self.resolve_job_target(argv)?;
        debug!("resuming job {} in background", target);
        self.drop_control_job();
        if let Some(job) = self.jobs.get_mut(target) {
            job.mark_running();
        }
        self.put_in_background(target, true)
    }

    pub(crate) fn job_to_foreground(&mut self, ctx: &Context, argv: &[String]) -> Result<()> {
        let target = self.resolve_job_target(argv)?;
        debug!("resuming job {} in foreground", target);
        self.drop_control_job();
        if let Some(job) = self.jobs.get_mut(target) {
            job.mark_running();
            let cmd = job.cmd.clone();
            ctx.write_stdout(&cmd)?;
        }
        self.current = Some(target);
        self.put_in_foreground(target, true)
    }
}
