use console::style;
use std::env;
use std::fs;

use crate::dirs;

fn username() -> String {
    env::var("USER")
        .or_else(|_| env::var("LOGNAME"))
        .unwrap_or_else(|_| String::from("user"))
}

fn hostname() -> String {
    if let Ok(name) = env::var("HOSTNAME") {
        if !name.is_empty() {
            return name;
        }
    }
    if let Ok(name) = fs::read_to_string("/etc/hostname") {
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }
    String::from("localhost")
}

/// `user@host:dir$ ` with the directory home-contracted. Styling is dropped
/// automatically when stdout is not a terminal.
pub fn render() -> String {
    format!(
        "{}@{}:{}$ ",
        style(username()).green(),
        style(hostname()).green(),
        style(dirs::display_dir()).cyan(),
    )
}
