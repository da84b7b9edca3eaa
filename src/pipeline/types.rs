//! Core types for pipeline domain
//!
//! Identifiers, task lifecycle states and backend targets shared by the
//! model, the renderers and the local executor.

#![allow(clippy::must_use_candidate)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a task, unique within one builder session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub usize);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Immutable identity of a task.
///
/// Artifacts and dependency edges hold this instead of a reference to the
/// task itself, so a produced artifact never keeps its producer alive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskRef {
    /// Task identifier
    pub id: TaskId,
    /// Task name
    pub name: String,
    /// Name of the owning step
    pub step: String,
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.step, self.name)
    }
}

/// Lifecycle of a task.
///
/// `Finished` is terminal regardless of command exit status or errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Slot reserved, body not yet handed to a worker
    Declared,
    /// Body queued on the worker pool
    Dispatched,
    /// Body currently running
    Running,
    /// Body returned, failed or panicked
    Finished,
}

impl TaskState {
    /// Returns true once the task can no longer change
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared => write!(f, "DECLARED"),
            Self::Dispatched => write!(f, "DISPATCHED"),
            Self::Running => write!(f, "RUNNING"),
            Self::Finished => write!(f, "FINISHED"),
        }
    }
}

/// Backend a declaration is interpreted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    /// GitLab CI style configuration text
    #[default]
    Gitlab,
    /// Azure DevOps style configuration text
    AzureDevops,
    /// Real concurrent execution on this machine
    Local,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gitlab => write!(f, "gitlab"),
            Self::AzureDevops => write!(f, "azure-devops"),
            Self::Local => write!(f, "local"),
        }
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gitlab" | "gitlab-ci" => Ok(Self::Gitlab),
            "azure" | "azure-devops" | "azuredevops" => Ok(Self::AzureDevops),
            "local" => Ok(Self::Local),
            other => Err(format!("unknown target '{other}'")),
        }
    }
}
