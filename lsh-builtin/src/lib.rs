use anyhow::Result;
use lsh_types::{Context, ExitStatus};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::debug;

mod bg;
pub mod cd;
mod fg;
mod jobs;

/// Interface builtin commands use to reach back into the shell without a
/// direct dependency on it. The shell implements this trait; the builtin
/// crate only sees the trait object.
pub trait ShellProxy {
    /// Initiates shell exit.
    fn exit_shell(&mut self);

    /// Dispatches a command that must be handled by the shell itself
    /// (job control, directory changes).
    fn dispatch(&mut self, ctx: &Context, cmd: &str, argv: Vec<String>) -> Result<()>;

    /// Changes the current working directory.
    fn changepwd(&mut self, path: &str) -> Result<()>;
}

/// Signature every builtin command conforms to.
pub type BuiltinCommand =
    fn(ctx: &Context, argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus;

static BUILTIN_COMMAND: Lazy<HashMap<&'static str, BuiltinCommand>> = Lazy::new(|| {
    let mut builtin: HashMap<&'static str, BuiltinCommand> = HashMap::new();

    builtin.insert("exit", exit as BuiltinCommand);
    builtin.insert("cd", cd::command as BuiltinCommand);

    // Job control commands
    builtin.insert("jobs", jobs::command as BuiltinCommand);
    builtin.insert("fg", fg::command as BuiltinCommand);
    builtin.insert("bg", bg::command as BuiltinCommand);

    builtin
});

/// Look up a builtin command function by name.
pub fn get_command(name: &str) -> Option<BuiltinCommand> {
    BUILTIN_COMMAND.get(name).copied()
}

pub fn exit(_ctx: &Context, _argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus {
    debug!("exit command called, initiating shell exit");
    proxy.exit_shell();
    ExitStatus::ExitedWith(0)
}
