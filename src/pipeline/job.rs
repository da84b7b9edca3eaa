//! Job, step and task records
//!
//! The model is filled in while the declaration callbacks run. Renderers read
//! it once the top-level callback returns; the local executor keeps updating
//! task state until its workers drain.

#![allow(clippy::must_use_candidate)]

use super::artifact::Artifact;
use super::types::{TaskId, TaskRef, TaskState};
use serde::Serialize;
use std::fmt;

/// Unit of work: a name, ordered shell commands and artifact edges
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    /// Task identifier
    pub id: TaskId,

    /// Task name
    pub name: String,

    /// Name of the owning step
    pub step: String,

    /// Index of the chain link this task belongs to (0 for plain `task` calls)
    pub link: usize,

    /// Shell command lines in declaration order
    pub commands: Vec<String>,

    /// Artifact produced by this task
    #[serde(skip_serializing_if = "Option::is_none")]
    pub produces: Option<Artifact>,

    /// Artifacts consumed by this task
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub consumes: Vec<Artifact>,

    /// Current lifecycle state
    pub state: TaskState,
}

impl Task {
    /// Creates a declared task with no commands yet
    pub fn new(id: TaskId, name: impl Into<String>, step: impl Into<String>, link: usize) -> Self {
        Self {
            id,
            name: name.into(),
            step: step.into(),
            link,
            commands: Vec::new(),
            produces: None,
            consumes: Vec::new(),
            state: TaskState::Declared,
        }
    }

    /// Identity of this task
    pub fn task_ref(&self) -> TaskRef {
        TaskRef {
            id: self.id,
            name: self.name.clone(),
            step: self.step.clone(),
        }
    }
}

/// Named, ordered group of tasks within a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    /// Step name, unique within its job
    pub name: String,

    /// Tasks in declaration order
    pub tasks: Vec<Task>,

    /// Number of chain links opened on this step
    pub links: usize,
}

impl Step {
    /// Creates an empty step with its first chain link open
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
            links: 1,
        }
    }

    /// Tasks of one chain link
    pub fn link_tasks(&self, link: usize) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.link == link)
    }
}

/// Root container of a pipeline declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    /// Job name
    pub name: String,

    /// Steps in declaration order
    pub steps: Vec<Step>,
}

impl Job {
    /// Creates an empty job
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Step names in declaration order
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    /// Looks up a step by name
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// All tasks, step by step, in declaration order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.steps.iter().flat_map(|s| s.tasks.iter())
    }

    /// Looks up a task by identifier
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks().find(|t| t.id == id)
    }

    pub(crate) fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.steps
            .iter_mut()
            .flat_map(|s| s.tasks.iter_mut())
            .find(|t| t.id == id)
    }

    /// Number of tasks across all steps
    pub fn task_count(&self) -> usize {
        self.steps.iter().map(|s| s.tasks.len()).sum()
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Job({}): {} steps, {} tasks",
            self.name,
            self.steps.len(),
            self.task_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> Job {
        let mut job = Job::new("Release");
        let mut build = Step::new("Build");
        build.tasks.push(Task::new(TaskId(0), "Compile", "Build", 0));
        build.tasks.push(Task::new(TaskId(1), "Lint", "Build", 0));
        build.tasks.push(Task::new(TaskId(2), "Package", "Build", 1));
        build.links = 2;
        let mut test = Step::new("Test");
        test.tasks.push(Task::new(TaskId(3), "Unit", "Test", 0));
        job.steps.push(build);
        job.steps.push(test);
        job
    }

    #[test]
    fn test_step_names_keep_declaration_order() {
        assert_eq!(sample_job().step_names(), vec!["Build", "Test"]);
    }

    #[test]
    fn test_tasks_iterate_in_declaration_order() {
        let job = sample_job();
        let names: Vec<_> = job.tasks().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Compile", "Lint", "Package", "Unit"]);
        assert_eq!(job.task_count(), 4);
    }

    #[test]
    fn test_link_tasks() {
        let job = sample_job();
        let build = job.step("Build").unwrap();
        let first: Vec<_> = build.link_tasks(0).map(|t| t.name.as_str()).collect();
        assert_eq!(first, vec!["Compile", "Lint"]);
        assert_eq!(build.link_tasks(1).count(), 1);
    }

    #[test]
    fn test_task_lookup_and_ref() {
        let job = sample_job();
        let task = job.task(TaskId(2)).unwrap();
        assert_eq!(task.state, TaskState::Declared);
        assert_eq!(task.task_ref().to_string(), "Build/Package");
        assert!(job.task(TaskId(9)).is_none());
    }

    #[test]
    fn test_job_display() {
        assert_eq!(sample_job().to_string(), "Job(Release): 2 steps, 4 tasks");
    }

    #[test]
    fn test_job_serializes_to_json() {
        let json = serde_json::to_value(sample_job()).unwrap();
        assert_eq!(json["name"], "Release");
        assert_eq!(json["steps"][0]["tasks"][0]["state"], "declared");
        assert!(json["steps"][0]["tasks"][0].get("produces").is_none());
    }
}
