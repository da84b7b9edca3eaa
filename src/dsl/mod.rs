//! Declaration DSL
//!
//! A pipeline is declared through nested callbacks:
//! [`Builder::job`] → [`JobContext::step`] → [`StepContext::task`]. Each
//! callback runs as soon as it is declared. Renderers record tasks inline;
//! the local executor hands every task body to its worker pool and only
//! blocks the declaring thread at `and_then` boundaries and in
//! [`Builder::finish`].
//!
//! ```no_run
//! use jobline::{ArtifactSlot, Builder, ExecutorConfig};
//!
//! # fn main() -> Result<(), jobline::PipelineError> {
//! let mut builder = Builder::local(ExecutorConfig::new())?;
//! let dist = ArtifactSlot::new();
//!
//! builder.job("Release", |job| {
//!     let produced = dist.clone();
//!     let consumed = dist.clone();
//!     job.step("Build", move |step| {
//!         step.task("Compile", move |t| {
//!             t.sh("make dist");
//!             produced.set(t.produce_artifact("dist", ["./out"])?)
//!         })?
//!         .and_then("Verify", move |t| {
//!             t.consume_slot(&consumed)?.sh("ls ./out");
//!             Ok(())
//!         })?;
//!         Ok(())
//!     })?;
//!     Ok(())
//! })?;
//!
//! println!("{}", builder.finish()?);
//! # Ok(())
//! # }
//! ```

mod context;
mod task;

pub use context::{JobContext, StepContext};
pub use task::TaskContext;

use crate::executor::{ExecutionSummary, ExecutorConfig, LocalExecutor, WaitGroup};
use crate::infrastructure::{
    AzureDevOpsRenderer, Config, GitLabRenderer, Renderer, renderer_for,
};
use crate::pipeline::{
    DeclarationError, DependencyLedger, ExecutionError, Job, PipelineError, Step, Target, Task,
    TaskId, TaskRef, TaskState,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Backend interpreting the declaration
pub(crate) enum Backend {
    Render(Box<dyn Renderer>),
    Local(LocalExecutor),
}

impl Backend {
    fn target(&self) -> Target {
        match self {
            Self::Render(renderer) => renderer.target(),
            Self::Local(_) => Target::Local,
        }
    }
}

/// State shared by every context of one builder
pub(crate) struct Session {
    pub(crate) backend: Backend,
    pub(crate) ledger: Arc<DependencyLedger>,
    next_task: AtomicUsize,
}

impl Session {
    fn new(backend: Backend) -> Self {
        Self {
            backend,
            ledger: Arc::new(DependencyLedger::new()),
            next_task: AtomicUsize::new(0),
        }
    }

    pub(crate) fn next_task_id(&self) -> TaskId {
        TaskId(self.next_task.fetch_add(1, Ordering::Relaxed))
    }
}

/// A job's model plus the barrier over its dispatched tasks
#[derive(Debug)]
pub(crate) struct JobShared {
    model: Mutex<Job>,
    pub(crate) outstanding: Arc<WaitGroup>,
}

impl JobShared {
    fn new(name: String) -> Self {
        Self {
            model: Mutex::new(Job::new(name)),
            outstanding: Arc::new(WaitGroup::new()),
        }
    }

    pub(crate) fn name(&self) -> String {
        self.model.lock().name.clone()
    }

    pub(crate) fn snapshot(&self) -> Job {
        self.model.lock().clone()
    }

    pub(crate) fn add_step(&self, name: &str) -> Result<(), DeclarationError> {
        let mut job = self.model.lock();
        if job.step(name).is_some() {
            return Err(DeclarationError::DuplicateStep {
                job: job.name.clone(),
                step: name.to_string(),
            });
        }
        job.steps.push(Step::new(name));
        Ok(())
    }

    pub(crate) fn open_link(&self, step: &str) {
        let mut job = self.model.lock();
        if let Some(step) = job.steps.iter_mut().find(|s| s.name == step) {
            step.links += 1;
        }
    }

    /// Reserves the declaration-order slot of a new task
    pub(crate) fn declare_task(&self, id: TaskId, name: &str, step: &str, link: usize) -> TaskRef {
        let task = Task::new(id, name, step, link);
        let task_ref = task.task_ref();
        let mut job = self.model.lock();
        if let Some(step) = job.steps.iter_mut().find(|s| s.name == step) {
            step.tasks.push(task);
        }
        task_ref
    }

    pub(crate) fn set_state(&self, id: TaskId, state: TaskState) {
        if let Some(task) = self.model.lock().task_mut(id) {
            task.state = state;
        }
    }

    /// Copies what a task body declared into the task's slot
    pub(crate) fn commit(&self, ctx: TaskContext) {
        if let Some(task) = self.model.lock().task_mut(ctx.id()) {
            ctx.apply_to(task);
        }
    }
}

/// Result of [`Builder::finish`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutput {
    /// Configuration text from a renderer
    Rendered(String),
    /// Summary of a local run
    Executed(ExecutionSummary),
}

impl PipelineOutput {
    /// Rendered text, if a renderer produced this output
    #[must_use]
    pub fn rendered(&self) -> Option<&str> {
        match self {
            Self::Rendered(text) => Some(text),
            Self::Executed(_) => None,
        }
    }

    /// Execution summary, if the local executor produced this output
    #[must_use]
    pub fn summary(&self) -> Option<&ExecutionSummary> {
        match self {
            Self::Rendered(_) => None,
            Self::Executed(summary) => Some(summary),
        }
    }
}

impl fmt::Display for PipelineOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rendered(text) => f.write_str(text),
            Self::Executed(summary) => write!(f, "{summary}"),
        }
    }
}

/// Entry point of a pipeline declaration.
///
/// The backend is fixed at construction time; every job declared on the
/// builder is interpreted by it.
pub struct Builder {
    session: Session,
    jobs: Vec<Arc<JobShared>>,
}

impl Builder {
    fn with_backend(backend: Backend) -> Self {
        Self {
            session: Session::new(backend),
            jobs: Vec::new(),
        }
    }

    /// Creates a builder rendering GitLab CI configuration
    #[must_use]
    pub fn gitlab() -> Self {
        Self::with_backend(Backend::Render(Box::new(GitLabRenderer::new())))
    }

    /// Creates a builder rendering Azure DevOps configuration
    #[must_use]
    pub fn azure_devops() -> Self {
        Self::with_backend(Backend::Render(Box::new(AzureDevOpsRenderer::new())))
    }

    /// Creates a builder using a custom renderer
    #[must_use]
    pub fn with_renderer(renderer: Box<dyn Renderer>) -> Self {
        Self::with_backend(Backend::Render(renderer))
    }

    /// Creates a builder that executes tasks on this machine.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Runtime`] if the worker pool cannot start.
    pub fn local(config: ExecutorConfig) -> Result<Self, ExecutionError> {
        Ok(Self::with_backend(Backend::Local(LocalExecutor::new(
            config,
        )?)))
    }

    /// Creates a builder for `target` with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Execution`] if the local worker pool cannot start.
    pub fn new(target: Target) -> Result<Self, PipelineError> {
        match renderer_for(target) {
            Some(renderer) => Ok(Self::with_renderer(renderer)),
            None => Ok(Self::local(ExecutorConfig::default())?),
        }
    }

    /// Creates a builder from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Execution`] if the local worker pool cannot start.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        match config.target {
            Target::Local => Ok(Self::local(config.executor.clone())?),
            target => Self::new(target),
        }
    }

    /// Backend target of this builder
    #[must_use]
    pub fn target(&self) -> Target {
        self.session.backend.target()
    }

    /// Declares a job and runs `configure` against it.
    ///
    /// # Errors
    ///
    /// Returns the first [`DeclarationError`] raised while configuring. The
    /// failed job is not rendered.
    pub fn job<F>(
        &mut self,
        name: impl Into<String>,
        configure: F,
    ) -> Result<JobHandle<'_>, DeclarationError>
    where
        F: FnOnce(&mut JobContext<'_>) -> Result<(), DeclarationError>,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(DeclarationError::EmptyName { kind: "job" });
        }

        tracing::info!(job = %name, target = %self.target(), "Declaring job");

        let job = Arc::new(JobShared::new(name));
        let mut ctx = JobContext::new(&self.session, Arc::clone(&job));
        configure(&mut ctx)?;

        self.jobs.push(Arc::clone(&job));
        Ok(JobHandle {
            session: &self.session,
            job,
        })
    }

    /// Snapshot of every successfully declared job
    #[must_use]
    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.iter().map(|job| job.snapshot()).collect()
    }

    /// Dependency edges recorded so far
    #[must_use]
    pub fn ledger(&self) -> &DependencyLedger {
        &self.session.ledger
    }

    /// Finishes the pipeline.
    ///
    /// Renderers return the text of every job in declaration order, joined
    /// by a blank line. Task names are not made unique across jobs, so the
    /// GitLab output of two jobs sharing a task name repeats that key. The
    /// local executor blocks until every dispatched task in every job has
    /// finished.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Declaration`] if a task body running on the
    /// local executor raised a declaration error. Command failures never
    /// produce an error.
    pub fn finish(self) -> Result<PipelineOutput, PipelineError> {
        match &self.session.backend {
            Backend::Render(renderer) => {
                let rendered = self
                    .jobs
                    .iter()
                    .map(|job| renderer.render(&job.model.lock(), &self.session.ledger))
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(PipelineOutput::Rendered(rendered))
            }
            Backend::Local(executor) => {
                let summary = executor.wait();
                if let Some(error) = summary.declaration_errors.first() {
                    return Err(error.clone().into());
                }
                Ok(PipelineOutput::Executed(summary))
            }
        }
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("target", &self.target())
            .field("jobs", &self.jobs.len())
            .finish()
    }
}

/// Handle to a declared job, used to append more declarations to it
pub struct JobHandle<'s> {
    session: &'s Session,
    job: Arc<JobShared>,
}

impl JobHandle<'_> {
    /// Runs `configure` against a fresh context of the same job.
    ///
    /// Nothing waits here; use [`JobContext::and_then`] to serialize.
    ///
    /// # Errors
    ///
    /// Returns the first [`DeclarationError`] raised while configuring.
    pub fn and_then<F>(self, configure: F) -> Result<Self, DeclarationError>
    where
        F: FnOnce(&mut JobContext<'_>) -> Result<(), DeclarationError>,
    {
        let mut ctx = JobContext::new(self.session, Arc::clone(&self.job));
        configure(&mut ctx)?;
        Ok(self)
    }

    /// Job name
    #[must_use]
    pub fn name(&self) -> String {
        self.job.name()
    }

    /// Snapshot of the job model
    #[must_use]
    pub fn snapshot(&self) -> Job {
        self.job.snapshot()
    }
}

impl fmt::Debug for JobHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("job", &self.job.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder_targets() {
        assert_eq!(Builder::gitlab().target(), Target::Gitlab);
        assert_eq!(Builder::azure_devops().target(), Target::AzureDevops);
        assert_eq!(Builder::new(Target::Local).unwrap().target(), Target::Local);
    }

    #[test]
    fn test_from_config_selects_backend() {
        let config = Config::from_yaml_str("target: azure-devops").unwrap();
        assert_eq!(
            Builder::from_config(&config).unwrap().target(),
            Target::AzureDevops
        );

        let config = Config::from_yaml_str("target: local\nexecutor:\n  workers: 2").unwrap();
        assert_eq!(Builder::from_config(&config).unwrap().target(), Target::Local);
    }

    #[test]
    fn test_empty_job_name_rejected() {
        let mut builder = Builder::gitlab();
        let err = builder.job("", |_| Ok(())).unwrap_err();
        assert_eq!(err, DeclarationError::EmptyName { kind: "job" });
        assert!(builder.jobs().is_empty());
    }

    #[test]
    fn test_failed_job_is_not_rendered() {
        let mut builder = Builder::gitlab();
        let result = builder.job("Broken", |job| {
            job.step("Build", |step| {
                step.task("Bad", |t| {
                    t.consume_artifact(None)?;
                    Ok(())
                })?;
                Ok(())
            })?;
            Ok(())
        });

        assert!(matches!(
            result,
            Err(DeclarationError::MissingArtifact { ref task }) if task == "Bad"
        ));
        assert_eq!(builder.finish().unwrap().rendered(), Some(""));
    }

    #[test]
    fn test_job_handle_and_then_appends_to_same_job() {
        let mut builder = Builder::gitlab();
        let handle = builder
            .job("JobName", |job| {
                job.step("Stage1", |step| {
                    step.task("A", |t| {
                        t.sh("echo A");
                        Ok(())
                    })?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap()
            .and_then(|job| {
                job.step("Stage2", |step| {
                    step.task("B", |t| {
                        t.sh("echo B");
                        Ok(())
                    })?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();

        assert_eq!(handle.name(), "JobName");
        assert_eq!(handle.snapshot().step_names(), vec!["Stage1", "Stage2"]);
        assert_eq!(builder.jobs().len(), 1);
    }

    #[test]
    fn test_multiple_jobs_render_in_order() {
        let mut builder = Builder::gitlab();
        for name in ["First", "Second"] {
            builder
                .job(name, move |job| {
                    job.step(name, |step| {
                        step.task("T", |t| {
                            t.sh("true");
                            Ok(())
                        })?;
                        Ok(())
                    })?;
                    Ok(())
                })
                .unwrap();
        }

        let output = builder.finish().unwrap().to_string();
        let first = output.find("  - First").unwrap();
        let second = output.find("  - Second").unwrap();
        assert!(first < second);
        assert_eq!(output.matches("stages:").count(), 2);
    }

    #[test]
    fn test_task_ids_are_unique_across_jobs() {
        let mut builder = Builder::azure_devops();
        for name in ["One", "Two"] {
            builder
                .job(name, |job| {
                    job.step("S", |step| {
                        step.task("A", |_| Ok(()))?.task("B", |_| Ok(()))?;
                        Ok(())
                    })?;
                    Ok(())
                })
                .unwrap();
        }

        let ids: Vec<_> = builder
            .jobs()
            .iter()
            .flat_map(|job| job.tasks().map(|t| t.id).collect::<Vec<_>>())
            .collect();
        assert_eq!(ids, vec![TaskId(0), TaskId(1), TaskId(2), TaskId(3)]);
    }

    #[test]
    fn test_pipeline_output_accessors() {
        let rendered = PipelineOutput::Rendered("stages:\n".to_string());
        assert_eq!(rendered.rendered(), Some("stages:\n"));
        assert!(rendered.summary().is_none());
        assert_eq!(rendered.to_string(), "stages:\n");
    }
}
