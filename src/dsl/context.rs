//! Job and step declaration contexts

use super::task::TaskContext;
use super::{Backend, JobShared, Session};
use crate::executor::{LocalShared, WaitGroup};
use crate::pipeline::{DeclarationError, DependencyLedger, TaskId, TaskRef, TaskState};
use std::fmt;
use std::sync::Arc;

/// Context handed to a job callback
pub struct JobContext<'s> {
    session: &'s Session,
    job: Arc<JobShared>,
}

impl<'s> JobContext<'s> {
    pub(crate) fn new(session: &'s Session, job: Arc<JobShared>) -> Self {
        Self { session, job }
    }

    /// Job name
    #[must_use]
    pub fn name(&self) -> String {
        self.job.name()
    }

    /// Declares a step and runs `configure` against it.
    ///
    /// # Errors
    ///
    /// Returns [`DeclarationError::EmptyName`] for an empty name,
    /// [`DeclarationError::DuplicateStep`] if the job already has a step with
    /// this name, or the first error raised by `configure`.
    pub fn step<F>(
        &mut self,
        name: impl Into<String>,
        configure: F,
    ) -> Result<&mut Self, DeclarationError>
    where
        F: FnOnce(&mut StepContext<'_>) -> Result<(), DeclarationError>,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(DeclarationError::EmptyName { kind: "step" });
        }
        self.job.add_step(&name)?;

        tracing::debug!(step = %name, "Declaring step");

        let mut ctx = StepContext::new(self.session, Arc::clone(&self.job), name);
        configure(&mut ctx)?;
        Ok(self)
    }

    /// Runs `configure` once every task already dispatched in this job has
    /// finished. Renderers do not wait.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `configure`.
    pub fn and_then<F>(&mut self, configure: F) -> Result<&mut Self, DeclarationError>
    where
        F: FnOnce(&mut JobContext<'_>) -> Result<(), DeclarationError>,
    {
        if let Backend::Local(_) = self.session.backend {
            tracing::debug!(
                job = %self.job.name(),
                outstanding = self.job.outstanding.outstanding(),
                "Waiting for job tasks"
            );
            self.job.outstanding.wait();
        }

        let mut ctx = JobContext::new(self.session, Arc::clone(&self.job));
        configure(&mut ctx)?;
        Ok(self)
    }
}

impl fmt::Debug for JobContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobContext")
            .field("job", &self.job.name())
            .finish()
    }
}

/// Context handed to a step callback.
///
/// Tasks declared with [`task`](Self::task) share the current chain link and
/// may run concurrently. [`and_then`](Self::and_then) opens the next link
/// after every task of the current one has finished.
pub struct StepContext<'s> {
    session: &'s Session,
    job: Arc<JobShared>,
    step: String,
    link: usize,
    link_group: Arc<WaitGroup>,
}

impl<'s> StepContext<'s> {
    fn new(session: &'s Session, job: Arc<JobShared>, step: String) -> Self {
        Self {
            session,
            job,
            step,
            link: 0,
            link_group: Arc::new(WaitGroup::new()),
        }
    }

    /// Step name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.step
    }

    /// Index of the current chain link
    #[must_use]
    pub fn link(&self) -> usize {
        self.link
    }

    /// Declares a task in the current chain link.
    ///
    /// Renderers run `configure` before returning. The local executor queues
    /// it on the worker pool and returns at once; errors raised by the body
    /// are reported by [`Builder::finish`](super::Builder::finish).
    ///
    /// # Errors
    ///
    /// Returns [`DeclarationError::EmptyName`] for an empty name, or, when
    /// rendering, the first error raised by `configure`.
    pub fn task<F>(
        &mut self,
        name: impl Into<String>,
        configure: F,
    ) -> Result<&mut Self, DeclarationError>
    where
        F: FnOnce(&mut TaskContext) -> Result<(), DeclarationError> + Send + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(DeclarationError::EmptyName { kind: "task" });
        }

        let task = self.job.declare_task(
            self.session.next_task_id(),
            &name,
            &self.step,
            self.link,
        );
        let ledger = Arc::clone(&self.session.ledger);

        match &self.session.backend {
            Backend::Render(_) => {
                self.job.set_state(task.id, TaskState::Running);
                let mut ctx = TaskContext::new(task.clone(), ledger, None);
                let result = configure(&mut ctx);
                self.job.commit(ctx);
                self.job.set_state(task.id, TaskState::Finished);
                result?;
            }
            Backend::Local(executor) => {
                let tickets = vec![self.job.outstanding.enter(), self.link_group.enter()];
                self.job.set_state(task.id, TaskState::Dispatched);

                let job = Arc::clone(&self.job);
                let shared = executor.shared();
                executor.dispatch(task.clone(), tickets, move || {
                    run_local_task(&job, task, ledger, &shared, configure);
                });
            }
        }

        Ok(self)
    }

    /// Declares a task that starts only after every task of the current
    /// chain link has finished. Renderers do not wait.
    ///
    /// # Errors
    ///
    /// Same as [`task`](Self::task).
    pub fn and_then<F>(
        &mut self,
        name: impl Into<String>,
        configure: F,
    ) -> Result<&mut Self, DeclarationError>
    where
        F: FnOnce(&mut TaskContext) -> Result<(), DeclarationError> + Send + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(DeclarationError::EmptyName { kind: "task" });
        }

        if let Backend::Local(_) = self.session.backend {
            tracing::debug!(
                step = %self.step,
                link = self.link,
                outstanding = self.link_group.outstanding(),
                "Waiting for chain link"
            );
            self.link_group.wait();
        }

        self.link += 1;
        self.link_group = Arc::new(WaitGroup::new());
        self.job.open_link(&self.step);

        self.task(name, configure)
    }
}

impl fmt::Debug for StepContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepContext")
            .field("step", &self.step)
            .field("link", &self.link)
            .finish_non_exhaustive()
    }
}

/// Marks a task finished in the model even if its body panics
struct FinishGuard<'a> {
    job: &'a JobShared,
    id: TaskId,
}

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.job.set_state(self.id, TaskState::Finished);
    }
}

/// Worker-side body of a locally executed task
fn run_local_task<F>(
    job: &JobShared,
    task: TaskRef,
    ledger: Arc<DependencyLedger>,
    shared: &Arc<LocalShared>,
    configure: F,
) where
    F: FnOnce(&mut TaskContext) -> Result<(), DeclarationError>,
{
    let _finished = FinishGuard { job, id: task.id };
    job.set_state(task.id, TaskState::Running);

    let mut ctx = TaskContext::new(task.clone(), ledger, Some(Arc::clone(shared)));
    if let Err(error) = configure(&mut ctx) {
        shared.record_declaration_error(&task, error);
    }

    for artifact in ctx.consumed() {
        let producer = artifact.producer();
        if !shared.is_finished(producer.id) {
            tracing::warn!(
                artifact = %artifact.name(),
                producer = %producer,
                "Consumed artifact whose producer has not finished"
            );
        }
    }

    job.commit(ctx);
}
