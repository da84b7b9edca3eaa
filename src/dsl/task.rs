//! Task declaration context

use crate::executor::LocalShared;
use crate::pipeline::{
    Artifact, ArtifactSlot, DeclarationError, DependencyLedger, Task, TaskId, TaskRef,
};
use std::sync::Arc;

/// Context handed to a task body.
///
/// When rendering, the context only records what the body declares. On the
/// local executor every [`sh`](Self::sh) line also runs immediately, in the
/// order it was declared.
#[derive(Debug)]
pub struct TaskContext {
    task: TaskRef,
    commands: Vec<String>,
    produced: Option<Artifact>,
    consumed: Vec<Artifact>,
    ledger: Arc<DependencyLedger>,
    executor: Option<Arc<LocalShared>>,
}

impl TaskContext {
    pub(crate) fn new(
        task: TaskRef,
        ledger: Arc<DependencyLedger>,
        executor: Option<Arc<LocalShared>>,
    ) -> Self {
        Self {
            task,
            commands: Vec::new(),
            produced: None,
            consumed: Vec::new(),
            ledger,
            executor,
        }
    }

    /// Task name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.task.name
    }

    /// Task identifier
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.task.id
    }

    /// Name of the owning step
    #[must_use]
    pub fn step(&self) -> &str {
        &self.task.step
    }

    /// Commands declared so far
    #[must_use]
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Artifact produced by this task, if any
    #[must_use]
    pub fn produced(&self) -> Option<&Artifact> {
        self.produced.as_ref()
    }

    /// Artifacts consumed so far
    #[must_use]
    pub fn consumed(&self) -> &[Artifact] {
        &self.consumed
    }

    /// Appends a shell command line.
    ///
    /// A failing command is logged and never aborts the task.
    pub fn sh(&mut self, command: impl Into<String>) -> &mut Self {
        let command = command.into();
        if let Some(executor) = &self.executor {
            executor.run_command(&self.task, &command);
        }
        self.commands.push(command);
        self
    }

    /// Declares the single artifact this task produces.
    ///
    /// The returned handle is what later tasks pass to
    /// [`consume_artifact`](Self::consume_artifact).
    ///
    /// # Errors
    ///
    /// Returns [`DeclarationError::EmptyName`] or
    /// [`DeclarationError::EmptyArtifactPaths`] for an invalid artifact, and
    /// [`DeclarationError::ArtifactAlreadyProduced`] on a second call.
    pub fn produce_artifact<I, S>(
        &mut self,
        name: impl Into<String>,
        paths: I,
    ) -> Result<Artifact, DeclarationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let artifact = Artifact::new(
            self.task.clone(),
            name,
            paths.into_iter().map(Into::into).collect(),
        )?;

        if let Some(existing) = &self.produced {
            return Err(DeclarationError::ArtifactAlreadyProduced {
                task: self.task.name.clone(),
                existing: existing.name().to_string(),
                requested: artifact.name().to_string(),
            });
        }

        tracing::debug!(
            task = %self.task,
            artifact = %artifact.name(),
            paths = ?artifact.paths(),
            "Artifact produced"
        );

        self.produced = Some(artifact.clone());
        Ok(artifact)
    }

    /// Declares that this task consumes `artifact`.
    ///
    /// The edge is recorded in the dependency ledger. Nothing waits for the
    /// producer; ordering comes from chaining with `and_then`.
    ///
    /// # Errors
    ///
    /// Returns [`DeclarationError::MissingArtifact`] when `artifact` is
    /// `None`, which is what an unfilled hand-off yields.
    pub fn consume_artifact(
        &mut self,
        artifact: Option<&Artifact>,
    ) -> Result<&mut Self, DeclarationError> {
        let artifact = artifact.ok_or_else(|| DeclarationError::MissingArtifact {
            task: self.task.name.clone(),
        })?;

        self.ledger.record(self.task.clone(), artifact);
        self.consumed.push(artifact.clone());
        Ok(self)
    }

    /// Consumes whatever artifact `slot` currently holds.
    ///
    /// # Errors
    ///
    /// Returns [`DeclarationError::MissingArtifact`] if the slot is empty.
    pub fn consume_slot(&mut self, slot: &ArtifactSlot) -> Result<&mut Self, DeclarationError> {
        self.consume_artifact(slot.get().as_ref())
    }

    pub(crate) fn apply_to(self, task: &mut Task) {
        task.commands = self.commands;
        task.produces = self.produced;
        task.consumes = self.consumed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn context(id: usize, name: &str) -> (TaskContext, Arc<DependencyLedger>) {
        let ledger = Arc::new(DependencyLedger::new());
        let task = TaskRef {
            id: TaskId(id),
            name: name.to_string(),
            step: "Stage1".to_string(),
        };
        (TaskContext::new(task, Arc::clone(&ledger), None), ledger)
    }

    #[test]
    fn test_sh_records_in_order() {
        let (mut ctx, _) = context(0, "A");
        ctx.sh("echo one").sh("echo two");
        assert_eq!(ctx.commands(), ["echo one", "echo two"]);
        assert_eq!(ctx.name(), "A");
        assert_eq!(ctx.step(), "Stage1");
        assert_eq!(ctx.id(), TaskId(0));
    }

    #[test]
    fn test_produce_artifact_once() {
        let (mut ctx, _) = context(0, "Build");
        let artifact = ctx.produce_artifact("P1", ["./out"]).unwrap();
        assert_eq!(artifact.name(), "P1");
        assert_eq!(artifact.producer().name, "Build");
        assert_eq!(ctx.produced(), Some(&artifact));

        let err = ctx.produce_artifact("P2", ["./other"]).unwrap_err();
        assert_eq!(
            err,
            DeclarationError::ArtifactAlreadyProduced {
                task: "Build".to_string(),
                existing: "P1".to_string(),
                requested: "P2".to_string(),
            }
        );
        assert_eq!(ctx.produced().unwrap().name(), "P1");
    }

    #[test]
    fn test_produce_artifact_requires_paths() {
        let (mut ctx, _) = context(0, "Build");
        let err = ctx.produce_artifact("P1", Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, DeclarationError::EmptyArtifactPaths { .. }));
        assert!(ctx.produced().is_none());
    }

    #[test]
    fn test_consume_missing_artifact() {
        let (mut ctx, ledger) = context(1, "Use");
        let err = ctx.consume_artifact(None).unwrap_err();
        assert_eq!(
            err,
            DeclarationError::MissingArtifact {
                task: "Use".to_string()
            }
        );
        assert!(ledger.is_empty());

        let err = ctx.consume_slot(&ArtifactSlot::new()).unwrap_err();
        assert!(matches!(err, DeclarationError::MissingArtifact { .. }));
    }

    #[test]
    fn test_consume_records_edge() {
        let (mut producer, ledger) = context(0, "Make");
        let artifact = producer.produce_artifact("dist", ["./dist"]).unwrap();

        let mut consumer = TaskContext::new(
            TaskRef {
                id: TaskId(1),
                name: "Ship".to_string(),
                step: "Stage1".to_string(),
            },
            Arc::clone(&ledger),
            None,
        );
        consumer.consume_artifact(Some(&artifact)).unwrap();

        assert_eq!(consumer.consumed(), [artifact]);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.needs(TaskId(1))[0].name, "Make");
    }

    #[test]
    fn test_apply_to_task() {
        let (mut ctx, _) = context(3, "Pack");
        ctx.sh("tar czf out.tgz out");
        ctx.produce_artifact("tarball", ["out.tgz"]).unwrap();

        let mut task = Task::new(TaskId(3), "Pack", "Stage1", 0);
        ctx.apply_to(&mut task);
        assert_eq!(task.commands, vec!["tar czf out.tgz out"]);
        assert_eq!(task.produces.unwrap().paths(), ["out.tgz"]);
    }
}
