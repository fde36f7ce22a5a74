use std::path;

/// Current working directory for the prompt, with the home directory
/// contracted to `~`.
pub fn display_dir() -> String {
    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(_) => return String::from("?"),
    };

    if let Some(home) = dirs::home_dir() {
        if cwd == home {
            return String::from("~");
        }
        if let Ok(rest) = cwd.strip_prefix(&home) {
            return format!("~/{}", rest.display());
        }
    }
    cwd.display().to_string()
}

pub fn is_dir(input: &str) -> bool {
    path::Path::new(&shellexpand::tilde(input).to_string()).is_dir()
}
