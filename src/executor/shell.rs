//! Shell command execution
//!
//! Every `sh` line of a task is handed, literally, to the platform command
//! interpreter (`sh -c` on Unix, `cmd /C` on Windows). The runner waits for
//! the process to exit and echoes its captured output. Exit status is
//! reported to the caller, never turned into an error here.

use crate::pipeline::ExecutionError;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Shell execution configuration
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Working directory
    pub cwd: PathBuf,

    /// Extra environment variables for every command
    pub env: HashMap<String, String>,

    /// Interpreter to invoke
    pub shell: String,

    /// Echo captured stdout/stderr after each command
    pub echo_output: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            cwd: env::current_dir().unwrap_or_default(),
            env: HashMap::new(),
            shell: default_shell().to_string(),
            echo_output: true,
        }
    }
}

/// Interpreter used when none is configured
#[must_use]
pub fn default_shell() -> &'static str {
    if cfg!(windows) { "cmd" } else { "sh" }
}

/// Result of shell command execution
#[derive(Debug, Clone)]
pub struct ShellResult {
    /// Standard output
    pub stdout: String,

    /// Standard error
    pub stderr: String,

    /// Exit code (-1 when terminated by a signal)
    pub exit_code: i32,

    /// Duration of execution
    pub duration: Duration,
}

impl ShellResult {
    /// Returns true if command succeeded (exit code 0)
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns true if command failed
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.exit_code != 0
    }
}

/// Runs commands through the configured interpreter
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    config: ShellConfig,
}

impl ShellRunner {
    /// Creates a runner
    #[must_use]
    pub fn new(config: ShellConfig) -> Self {
        Self { config }
    }

    /// Runs `command` and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Io`] if the interpreter cannot be spawned.
    /// A non-zero exit status is returned as a normal [`ShellResult`].
    pub fn run(&self, command: &str) -> Result<ShellResult, ExecutionError> {
        let start = Instant::now();

        tracing::debug!(command = %command, shell = %self.config.shell, "Executing shell command");

        let mut cmd = Command::new(&self.config.shell);
        cmd.arg(interpreter_flag(&self.config.shell));
        cmd.arg(command);
        cmd.current_dir(&self.config.cwd);
        cmd.envs(&self.config.env);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = cmd.output()?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        if self.config.echo_output {
            if !stdout.is_empty() {
                println!("{stdout}");
            }
            if !stderr.is_empty() {
                eprint!("{stderr}");
            }
        }

        Ok(ShellResult {
            stdout,
            stderr,
            exit_code,
            duration: start.elapsed(),
        })
    }

    /// Runs `command` and treats a non-zero exit as an error.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::CommandFailed`] for a non-zero exit and
    /// [`ExecutionError::Io`] if the interpreter cannot be spawned.
    pub fn run_checked(&self, command: &str) -> Result<ShellResult, ExecutionError> {
        let result = self.run(command)?;
        if result.is_failure() {
            return Err(ExecutionError::CommandFailed {
                command: command.to_string(),
                code: result.exit_code,
                stderr: result.stderr,
            });
        }
        Ok(result)
    }
}

/// Flag that makes `shell` read the command from its argument
fn interpreter_flag(shell: &str) -> &'static str {
    let program = shell
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(shell)
        .to_ascii_lowercase();
    if program == "cmd" || program == "cmd.exe" {
        "/C"
    } else {
        "-c"
    }
}
