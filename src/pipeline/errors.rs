//! Error types for pipeline declaration and execution

use thiserror::Error;

/// Top-level error returned by [`Builder`](crate::Builder) operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The pipeline declaration violated a model invariant
    #[error("Declaration failed: {0}")]
    Declaration(#[from] DeclarationError),

    /// The local executor could not be set up
    #[error("Execution failed: {0}")]
    Execution(#[from] ExecutionError),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised synchronously while a pipeline is being declared.
///
/// These abort the declaration of the current job. Every variant names the
/// task or artifact that caused it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    /// A job, step, task or artifact was given an empty name
    #[error("{kind} name cannot be empty")]
    EmptyName {
        /// What was being named ("job", "step", "task" or "artifact").
        kind: &'static str,
    },

    /// An artifact was declared without any path filter
    #[error("Artifact '{artifact}' produced by task '{task}' must contain at least one path")]
    EmptyArtifactPaths {
        /// Task that tried to produce the artifact.
        task: String,
        /// Name of the rejected artifact.
        artifact: String,
    },

    /// A task tried to produce a second artifact
    #[error(
        "Task '{task}' already produced artifact '{existing}', cannot also produce '{requested}'"
    )]
    ArtifactAlreadyProduced {
        /// Task that produced twice.
        task: String,
        /// Artifact produced by the first call.
        existing: String,
        /// Artifact requested by the rejected call.
        requested: String,
    },

    /// A task consumed an artifact handle that was never produced
    #[error(
        "The artifact passed to 'consume_artifact' in task '{task}' is not set. \
         Ensure it is produced by a task that runs earlier"
    )]
    MissingArtifact {
        /// Task that attempted the consumption.
        task: String,
    },

    /// A step name was used twice within one job
    #[error("Step '{step}' is already declared in job '{job}'")]
    DuplicateStep {
        /// Job owning the step.
        job: String,
        /// Duplicated step name.
        step: String,
    },

    /// An artifact slot was filled twice
    #[error("Artifact slot already holds artifact '{artifact}'")]
    SlotAlreadyFilled {
        /// Artifact already stored in the slot.
        artifact: String,
    },
}

/// Errors raised while running tasks on the local executor.
///
/// Task bodies never propagate these; they are logged and counted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// IO error while spawning or waiting for a process
    #[error("IO error: {0}")]
    Io(String),

    /// A command exited with a non-zero status
    #[error("Command '{command}' failed with exit code {code}: {stderr}")]
    CommandFailed {
        /// Command line passed to the interpreter.
        command: String,
        /// Exit code returned by the command.
        code: i32,
        /// Standard error output from the command.
        stderr: String,
    },

    /// The worker pool could not be created
    #[error("Worker pool error: {0}")]
    Runtime(String),
}

impl From<std::io::Error> for ExecutionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
