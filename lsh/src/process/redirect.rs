use anyhow::{Context as _, Result};
use std::fs::{File, OpenOptions};
use std::os::unix::io::{IntoRawFd, RawFd};

/// A stream redirection requested for a whole pipeline: input for the first
/// stage, output or append for the last stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    Input(String),
    Output(String),
    Append(String),
}

impl Redirect {
    /// Open the target file and hand over the raw descriptor. The caller
    /// owns the descriptor and must close it once every stage is launched.
    pub(crate) fn open(&self) -> Result<RawFd> {
        match self {
            Redirect::Input(path) => {
                let file = File::open(path)
                    .with_context(|| format!("couldn't open input file '{path}'"))?;
                Ok(file.into_raw_fd())
            }
            Redirect::Output(path) => {
                let file = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(path)
                    .with_context(|| format!("couldn't open output file '{path}'"))?;
                Ok(file.into_raw_fd())
            }
            Redirect::Append(path) => {
                let file = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("couldn't open output file '{path}'"))?;
                Ok(file.into_raw_fd())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::close;
    use std::io::Read;

    #[test]
    fn test_open_input_missing_file() {
        let redirect = Redirect::Input("/nonexistent/definitely/missing".to_string());
        assert!(redirect.open().is_err());
    }

    #[test]
    fn test_open_output_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let redirect = Redirect::Output(path.to_string_lossy().into_owned());

        let fd = redirect.open().unwrap();
        close(fd).unwrap();

        assert!(path.exists());
        let mut content = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert!(content.is_empty());
    }
}
