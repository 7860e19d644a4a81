//! Utilities for [`std::process::Command`].

use std::{io, process};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error")]
    Io(#[from] io::Error),
    #[error("non-zero exit status")]
    NonZero(Output),
}

#[derive(Debug, Clone)]
pub struct Output {
    pub status: process::ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl From<process::Output> for Output {
    fn from(value: process::Output) -> Self {
        Self {
            status: value.status,
            stdout: String::from_utf8_lossy(&value.stdout).to_string(),
            stderr: String::from_utf8_lossy(&value.stderr).to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct Runner;

impl Runner {
    /// Runs the program with the given arguments, capturing stdout and
    /// stderr. A non-zero exit status is an error carrying the full output.
    pub fn run(program: &str, args: &[&str]) -> Result<Output> {
        let mut cmd = process::Command::new(program);
        cmd.args(args).stderr(process::Stdio::piped()).stdout(process::Stdio::piped());

        tracing::debug!(?cmd, "running command");

        let output: Output = cmd.spawn()?.wait_with_output()?.into();

        if !output.status.success() {
            tracing::debug!(?output.stderr, ?output.status, ?cmd, "command returned non-zero status");
            return Err(Error::NonZero(output));
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout() {
        let output = Runner::run("echo", &["hello"]).unwrap();
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[test]
    fn non_zero_status_is_an_error() {
        let result = Runner::run("false", &[]);
        assert!(matches!(result, Err(Error::NonZero(_))));
    }

    #[test]
    fn missing_program_is_an_io_error() {
        let result = Runner::run("definitely-not-a-real-program", &[]);
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
