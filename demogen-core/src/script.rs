//! External command execution for generator scripts
//!
//! Commands are run from an argument vector, never through a shell, so
//! project names and paths are passed through verbatim.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::{Error, Result};

/// Captured output of a successful command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutput {
    /// Trimmed standard output
    pub stdout: String,
    /// Trimmed standard error
    pub stderr: String,
}

/// Runner for external commands
#[derive(Debug, Clone, Default)]
pub struct ScriptRunner {
    /// Kill the command after this long (no limit if unset)
    timeout: Option<Duration>,
}

impl ScriptRunner {
    /// Create a runner with no timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a timeout after which the command is killed
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `program` with `args`, optionally inside `workdir`
    ///
    /// Fails with [`Error::Command`] when the command exits nonzero.
    pub async fn run<I, A>(
        &self,
        program: impl AsRef<Path>,
        args: I,
        workdir: Option<&Path>,
    ) -> Result<ScriptOutput>
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        let program = program.as_ref();
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let cmdline = command_line(program, &args);

        if let Some(dir) = workdir {
            if !dir.exists() {
                return Err(Error::Other(format!(
                    "Working directory does not exist: {}",
                    dir.display()
                )));
            }
        }

        let mut cmd = Command::new(program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = workdir {
            cmd.current_dir(dir);
        }

        debug!(command = %cmdline, "Running command");

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| Error::Timeout {
                    command: cmdline.clone(),
                })?,
            None => cmd.output().await,
        }
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Command {
                    command: cmdline.clone(),
                    stderr: format!("executable not found: {}", program.display()),
                }
            } else {
                Error::Io(e)
            }
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(Error::Command {
                command: cmdline,
                stderr,
            });
        }

        if !stdout.is_empty() {
            debug!(command = %cmdline, stdout = %stdout, "Command output");
        }

        Ok(ScriptOutput { stdout, stderr })
    }

    /// Run a generator script with a single positional argument
    ///
    /// With an interpreter the script path is passed as its first argument.
    pub async fn run_script(
        &self,
        interpreter: Option<&str>,
        script: &Path,
        argument: &str,
        workdir: &Path,
    ) -> Result<ScriptOutput> {
        match interpreter {
            Some(interp) => {
                let args: Vec<OsString> = vec![script.as_os_str().to_owned(), argument.into()];
                self.run(PathBuf::from(interp), args, Some(workdir)).await
            }
            None => self.run(script, [argument], Some(workdir)).await,
        }
    }
}

fn command_line(program: &Path, args: &[OsString]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        let arg = arg.to_string_lossy();
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            line.push_str(&format!(" '{}'", arg));
        } else {
            line.push(' ');
            line.push_str(&arg);
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let runner = ScriptRunner::new();
        let output = runner
            .run("sh", ["-c", "echo '  hello  '"], None)
            .await
            .unwrap();
        assert_eq!(output.stdout, "hello");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_command_error() {
        let runner = ScriptRunner::new();
        let err = runner
            .run("sh", ["-c", "echo broken >&2; exit 3"], None)
            .await
            .unwrap_err();

        match err {
            Error::Command { command, stderr } => {
                assert!(command.starts_with("sh -c"));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_arguments_are_not_shell_expanded() {
        let runner = ScriptRunner::new();
        let output = runner
            .run("sh", ["-c", "printf '%s' \"$1\"", "sh", "$(echo pwned); rm -rf /"], None)
            .await
            .unwrap();
        assert_eq!(output.stdout, "$(echo pwned); rm -rf /");
    }

    #[tokio::test]
    async fn test_runs_in_workdir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), "").unwrap();

        let runner = ScriptRunner::new();
        let output = runner.run("ls", ["marker"], Some(dir.path())).await.unwrap();
        assert_eq!(output.stdout, "marker");
    }

    #[tokio::test]
    async fn test_invalid_workdir() {
        let runner = ScriptRunner::new();
        let result = runner
            .run("true", Vec::<String>::new(), Some(Path::new("/nonexistent/path/12345")))
            .await;
        assert!(matches!(result, Err(Error::Other(_))));
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let runner = ScriptRunner::new();
        let result = runner
            .run("/usr/bin/nonexistent-demogen-binary", Vec::<String>::new(), None)
            .await;
        assert!(matches!(result, Err(Error::Command { .. })));
    }

    #[tokio::test]
    async fn test_timeout_kills_command() {
        let runner = ScriptRunner::new().with_timeout(Some(Duration::from_millis(100)));
        let result = runner.run("sleep", ["5"], None).await;
        assert!(matches!(result, Err(Error::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_run_script_with_interpreter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("gen.sh"), "echo \"name=$1\"\n").unwrap();

        let runner = ScriptRunner::new();
        let output = runner
            .run_script(Some("sh"), Path::new("gen.sh"), "charlie", dir.path())
            .await
            .unwrap();
        assert_eq!(output.stdout, "name=charlie");

        let output = runner
            .run_script(Some("sh"), Path::new("gen.sh"), "", dir.path())
            .await
            .unwrap();
        assert_eq!(output.stdout, "name=");
    }

    #[test]
    fn test_command_line_quotes_empty_args() {
        let line = command_line(Path::new("./build.sh"), &["".into(), "a b".into(), "c".into()]);
        assert_eq!(line, "./build.sh '' 'a b' c");
    }
}
