use std::env;
use std::path::Path;
use tracing::debug;

/// Command resolution environment: the PATH entries used to resolve a bare
/// command name to the path handed to execv.
#[derive(Debug, Clone)]
pub struct Environment {
    pub paths: Vec<String>,
}

impl Environment {
    pub fn new() -> Self {
        let mut paths: Vec<String> = ["/bin", "/usr/bin", "/sbin", "/usr/sbin"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        if let Ok(val) = env::var("PATH") {
            paths = val.split(':').map(|s| s.to_string()).collect();
        }

        debug!("search paths {:?}", &paths);

        Environment { paths }
    }

    /// Resolve a command name to a full path. Absolute and `./`-relative
    /// names are checked directly; anything else is searched along PATH.
    pub fn lookup(&self, cmd: &str) -> Option<String> {
        if cmd.starts_with('/') || cmd.starts_with("./") || cmd.starts_with("../") {
            let cmd_path = Path::new(cmd);
            if cmd_path.is_file() {
                return Some(cmd.to_string());
            }
            return None;
        }
        for path in &self.paths {
            let cmd_path = Path::new(path).join(cmd);
            if cmd_path.is_file() {
                return cmd_path.to_str().map(|s| s.to_string());
            }
        }
        None
    }

    pub fn reload_path(&mut self) {
        let mut paths: Vec<String> = ["/bin", "/usr/bin", "/sbin", "/usr/sbin"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        if let Ok(val) = env::var("PATH") {
            paths = val.split(':').map(|s| s.to_string()).collect();
        }
        self.paths = paths;
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
