use crate::shell::APP_NAME;

/// Report an error in a user-facing format, without a backtrace. The full
/// context chain is flattened into one line.
pub fn display_user_error(err: &anyhow::Error) {
    eprintln!("{APP_NAME}: {err:#}");
}
