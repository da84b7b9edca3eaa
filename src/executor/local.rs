use super::shell::{ShellConfig, ShellRunner, default_shell};
use super::sync::{WaitGroup, WaitTicket};
use crate::pipeline::{DeclarationError, ExecutionError, TaskId, TaskRef};
use ahash::AHashSet;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::runtime::{Handle, Runtime};
use uuid::Uuid;

/// Configuration for local executor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Interpreter to run commands with (default: `sh`, or `cmd` on Windows)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,

    /// Maximum concurrently running task bodies (0 = pool default)
    pub workers: usize,

    /// Working directory for commands (default: current directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Extra environment variables for commands
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,

    /// Suppress echoing of command output
    pub quiet: bool,
}

impl ExecutorConfig {
    /// Creates the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets shell to use
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = Some(shell.into());
        self
    }

    /// Bounds the worker pool
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets current working directory
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Adds an environment variable
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Stops echoing command output
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    fn shell_config(&self) -> ShellConfig {
        let defaults = ShellConfig::default();
        ShellConfig {
            cwd: self.cwd.clone().unwrap_or(defaults.cwd),
            env: self.env.clone(),
            shell: self
                .shell
                .clone()
                .unwrap_or_else(|| default_shell().to_string()),
            echo_output: !self.quiet,
        }
    }
}

/// Outcome of a local run, available once every task finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// Identifier of this executor instance
    pub run_id: Uuid,
    /// Number of task bodies that finished
    pub tasks_finished: usize,
    /// Commands that exited non-zero or could not be spawned
    pub failed_commands: usize,
    /// Declaration errors raised inside task bodies
    pub declaration_errors: Vec<DeclarationError>,
}

impl fmt::Display for ExecutionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Local execution finished")
    }
}

/// State shared between the executor and its worker threads.
///
/// Workers only ever hold this, never the executor itself, so the worker
/// pool is always torn down from the declaring thread.
#[derive(Debug)]
pub(crate) struct LocalShared {
    runner: ShellRunner,
    outstanding: Arc<WaitGroup>,
    finished: Mutex<AHashSet<TaskId>>,
    failed_commands: AtomicUsize,
    declaration_errors: Mutex<Vec<DeclarationError>>,
}

impl LocalShared {
    /// Runs one `sh` line for `task`; failures are logged and counted
    pub(crate) fn run_command(&self, task: &TaskRef, command: &str) {
        match self.runner.run_checked(command) {
            Ok(result) => {
                tracing::debug!(
                    task = %task,
                    command = %command,
                    duration_ms = result.duration.as_millis(),
                    "Command completed"
                );
            }
            Err(ExecutionError::CommandFailed { code, .. }) => {
                self.failed_commands.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    task = %task,
                    command = %command,
                    exit_code = code,
                    "Command exited with non-zero status, ignoring"
                );
            }
            Err(e) => {
                self.failed_commands.fetch_add(1, Ordering::Relaxed);
                tracing::error!(task = %task, command = %command, error = %e, "Command could not run");
            }
        }
    }

    /// Returns true once the body of `task` has returned
    pub(crate) fn is_finished(&self, task: TaskId) -> bool {
        self.finished.lock().contains(&task)
    }

    pub(crate) fn record_declaration_error(&self, task: &TaskRef, error: DeclarationError) {
        tracing::error!(task = %task, error = %error, "Task declaration failed");
        self.declaration_errors.lock().push(error);
    }
}

/// Executor that runs task bodies concurrently on this machine.
///
/// The worker pool is shut down in the background on drop, so the executor
/// may be created and dropped from inside another tokio runtime.
#[derive(Debug)]
pub struct LocalExecutor {
    runtime: Option<Runtime>,
    handle: Handle,
    shared: Arc<LocalShared>,
    run_id: Uuid,
}

impl LocalExecutor {
    /// Creates an executor with its own worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Runtime`] if the pool cannot be started.
    pub fn new(config: ExecutorConfig) -> Result<Self, ExecutionError> {
        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder
            .worker_threads(1)
            .thread_name("jobline-worker")
            .enable_all();
        if config.workers > 0 {
            builder.max_blocking_threads(config.workers);
        }
        let runtime = builder
            .build()
            .map_err(|e| ExecutionError::Runtime(e.to_string()))?;

        let run_id = Uuid::new_v4();
        tracing::info!(run_id = %run_id, workers = config.workers, "Local executor started");

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
            shared: Arc::new(LocalShared {
                runner: ShellRunner::new(config.shell_config()),
                outstanding: Arc::new(WaitGroup::new()),
                finished: Mutex::new(AHashSet::new()),
                failed_commands: AtomicUsize::new(0),
                declaration_errors: Mutex::new(Vec::new()),
            }),
            run_id,
        })
    }

    /// Identifier of this run
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Number of dispatched tasks that have not finished yet
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.shared.outstanding.outstanding()
    }

    pub(crate) fn shared(&self) -> Arc<LocalShared> {
        Arc::clone(&self.shared)
    }

    /// Queues `body` on the worker pool and returns immediately.
    ///
    /// The executor-wide barrier is entered before the body is queued. The
    /// extra `tickets` (job and chain-link barriers) and the executor ticket
    /// are released after the body returns or panics.
    pub(crate) fn dispatch<F>(&self, task: TaskRef, tickets: Vec<WaitTicket>, body: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let outstanding = self.shared.outstanding.enter();
        let shared = Arc::clone(&self.shared);

        tracing::info!(task = %task, task_id = %task.id, "Dispatching task");

        self.handle.spawn_blocking(move || {
            let span = tracing::info_span!(
                "task",
                step = %task.step,
                task = %task.name,
                task_id = %task.id
            );
            let _enter = span.enter();

            if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(body)) {
                tracing::error!(panic = %panic_message(panic.as_ref()), "Task body panicked");
            }

            shared.finished.lock().insert(task.id);
            tracing::info!("Task finished");

            drop(tickets);
            drop(outstanding);
        });
    }

    /// Blocks until every dispatched task has finished
    #[must_use]
    pub fn wait(&self) -> ExecutionSummary {
        self.shared.outstanding.wait();

        let summary = ExecutionSummary {
            run_id: self.run_id,
            tasks_finished: self.shared.finished.lock().len(),
            failed_commands: self.shared.failed_commands.load(Ordering::Relaxed),
            declaration_errors: self.shared.declaration_errors.lock().clone(),
        };

        tracing::info!(
            run_id = %summary.run_id,
            tasks = summary.tasks_finished,
            failed_commands = summary.failed_commands,
            "Local execution finished"
        );

        summary
    }
}

impl Drop for LocalExecutor {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
