use crate::errors::display_user_error;
use crate::process::signal;
use crate::prompt;
use crate::shell::{SHELL_TERMINAL, Shell};
use anyhow::Result;
use lsh_types::Context;
use nix::errno::Errno;
use nix::unistd::read;
use std::io::Write as _;
use std::process::ExitCode;
use tracing::debug;

enum ReadOutcome {
    Line(String),
    Eof,
}

/// Interactive prompt loop.
///
/// The terminal stays in canonical mode; a blocking read on the shell's
/// stdin is the single suspension point at the prompt. SIGCHLD interrupts
/// that read (the handler is installed without SA_RESTART), which is when
/// deferred job notifications get printed.
pub struct Repl<'a> {
    pub shell: &'a mut Shell,
}

impl<'a> Repl<'a> {
    pub fn new(shell: &'a mut Shell) -> Self {
        Repl { shell }
    }

    pub fn run_interactive(&mut self, ctx: &mut Context) -> Result<ExitCode> {
        loop {
            self.shell.notify_jobs(None, false);
            self.print_prompt();

            let outcome = self.read_line()?;
            self.shell.invite_mode = false;

            match outcome {
                ReadOutcome::Eof => {
                    println!();
                    self.shell.exit();
                }
                ReadOutcome::Line(line) => {
                    if !line.trim().is_empty() {
                        debug!("eval line: {:?}", line);
                        if let Err(err) = self.shell.eval_str(ctx, line) {
                            display_user_error(&err);
                        }
                    }
                }
            }

            if let Some(status) = self.shell.exited {
                self.shell.shutdown();
                return Ok(ExitCode::from(status.code().clamp(0, 255) as u8));
            }
        }
    }

    fn print_prompt(&mut self) {
        print!("{}", prompt::render());
        std::io::stdout().flush().ok();
        self.shell.invite_mode = true;
    }

    fn read_line(&mut self) -> Result<ReadOutcome> {
        let mut buf: Vec<u8> = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            match read(SHELL_TERMINAL, &mut chunk) {
                Ok(0) => {
                    if buf.is_empty() {
                        return Ok(ReadOutcome::Eof);
                    }
                    return Ok(line_from(buf));
                }
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    if buf.ends_with(b"\\\n") {
                        // command line continues on the next line
                        buf.truncate(buf.len() - 2);
                        buf.push(b' ');
                        print!("> ");
                        std::io::stdout().flush().ok();
                        continue;
                    }
                    if buf.ends_with(b"\n") {
                        return Ok(line_from(buf));
                    }
                }
                Err(Errno::EINTR) => {
                    debug!("prompt read interrupted");
                    if signal::take_sigchld() && self.shell.notify_jobs(None, false) {
                        self.print_prompt();
                    } else {
                        self.shell.invite_mode = true;
                    }
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn line_from(buf: Vec<u8>) -> ReadOutcome {
    ReadOutcome::Line(
        String::from_utf8_lossy(&buf)
            .trim_end_matches(['\n', '\r'])
            .to_string(),
    )
}
