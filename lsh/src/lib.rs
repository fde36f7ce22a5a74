use crate::environment::Environment;
use crate::errors::display_user_error;
use crate::repl::Repl;
use crate::shell::Shell;
use anyhow::Result;
use clap::Parser;
use lsh_types::Context;
use std::io::{self, BufRead, BufReader};
use std::process::ExitCode;
use tracing::debug;

pub mod dirs;
pub mod environment;
pub mod errors;
pub mod parser;
pub mod process;
pub mod prompt;
pub mod proxy;
pub mod repl;
pub mod shell;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run a single command line and exit
    #[arg(short, long)]
    pub command: Option<String>,
}

pub fn lib_main() -> ExitCode {
    if let Err(err) = init_tracing() {
        eprintln!("failed to initialize tracing: {err}");
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse();
    let environment = Environment::new();
    let mut shell = Shell::new(environment);

    if let Some(command) = cli.command.as_deref() {
        execute_command(&mut shell, command)
    } else {
        run_interactive(&mut shell)
    }
}

pub fn execute_command(shell: &mut Shell, command: &str) -> ExitCode {
    debug!("command mode: {:?}", command);
    shell.set_signals();
    let mut ctx = Context::new(shell.pid, shell.pgid, None, false);
    match shell.eval_str(&mut ctx, command.to_string()) {
        Ok(status) => ExitCode::from(status.code().clamp(0, 255) as u8),
        Err(err) => {
            display_user_error(&err);
            ExitCode::FAILURE
        }
    }
}

pub fn run_interactive(shell: &mut Shell) -> ExitCode {
    if let Err(err) = shell.init_interactive() {
        display_user_error(&err);
        return ExitCode::FAILURE;
    }

    if shell.interactive {
        debug!("running in interactive mode");
        let mut ctx = Context::new(shell.pid, shell.pgid, shell.tmodes.clone(), true);
        let mut repl = Repl::new(shell);
        match repl.run_interactive(&mut ctx) {
            Ok(code) => code,
            Err(err) => {
                display_user_error(&err);
                ExitCode::FAILURE
            }
        }
    } else {
        run_pipe_mode(shell)
    }
}

/// Non-terminal stdin: evaluate line by line, no prompts and no terminal
/// arbitration.
fn run_pipe_mode(shell: &mut Shell) -> ExitCode {
    debug!("running in pipe mode");
    shell.set_signals();
    let mut ctx = Context::new(shell.pid, shell.pgid, None, false);

    let stdin = io::stdin();
    let reader = BufReader::new(stdin);
    let mut code = ExitCode::SUCCESS;

    for line in reader.lines() {
        match line {
            Ok(input) => {
                let input = input.trim().to_string();
                if input.is_empty() {
                    continue;
                }
                match shell.eval_str(&mut ctx, input) {
                    Ok(status) => {
                        code = ExitCode::from(status.code().clamp(0, 255) as u8);
                    }
                    Err(err) => display_user_error(&err),
                }
                if shell.exited.is_some() {
                    break;
                }
            }
            Err(err) => {
                eprintln!("error reading input: {err}");
                break;
            }
        }
    }
    shell.shutdown();
    code
}

pub fn init_tracing() -> Result<()> {
    // The terminal belongs to the prompt and to jobs; diagnostics go to a
    // file, and only when asked for.
    let Some(filter) = std::env::var_os("LSH_LOG") else {
        return Ok(());
    };
    let log_file = std::sync::Arc::new(std::fs::File::create("./lsh.log")?);
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter.to_string_lossy()))
        .with_writer(log_file)
        .init();
    Ok(())
}
