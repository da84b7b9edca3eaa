//! Artifacts produced and consumed by tasks

use super::errors::DeclarationError;
use super::types::TaskRef;
use once_cell::sync::OnceCell;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, PartialEq, Eq, Serialize)]
struct ArtifactInner {
    name: String,
    paths: Vec<String>,
    producer: TaskRef,
}

/// Named, path-filtered output of a single task.
///
/// Cloning is cheap; every clone refers to the same immutable data. An
/// artifact only exists once its producing task has run, so holding one
/// proves the producer already executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    inner: Arc<ArtifactInner>,
}

impl Artifact {
    /// Creates an artifact bound to `producer`.
    ///
    /// # Errors
    ///
    /// Returns [`DeclarationError::EmptyName`] for an empty name and
    /// [`DeclarationError::EmptyArtifactPaths`] when `paths` is empty.
    pub fn new(
        producer: TaskRef,
        name: impl Into<String>,
        paths: Vec<String>,
    ) -> Result<Self, DeclarationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DeclarationError::EmptyName { kind: "artifact" });
        }
        if paths.is_empty() {
            return Err(DeclarationError::EmptyArtifactPaths {
                task: producer.name,
                artifact: name,
            });
        }

        Ok(Self {
            inner: Arc::new(ArtifactInner {
                name,
                paths,
                producer,
            }),
        })
    }

    /// Artifact name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Path filters, in declaration order
    #[must_use]
    pub fn paths(&self) -> &[String] {
        &self.inner.paths
    }

    /// Task that produced this artifact
    #[must_use]
    pub fn producer(&self) -> &TaskRef {
        &self.inner.producer
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (from {})", self.inner.name, self.inner.producer)
    }
}

impl Serialize for Artifact {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.serialize(serializer)
    }
}

/// Write-once cell used to hand an artifact from the task that produces it
/// to the tasks that consume it.
///
/// Task bodies are `'static`, so they capture a clone of the slot instead of
/// a local variable. An empty slot is the "not yet produced" handle.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSlot {
    cell: Arc<OnceCell<Artifact>>,
}

impl ArtifactSlot {
    /// Creates an empty slot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `artifact` in the slot.
    ///
    /// # Errors
    ///
    /// Returns [`DeclarationError::SlotAlreadyFilled`] if the slot is set.
    pub fn set(&self, artifact: Artifact) -> Result<(), DeclarationError> {
        self.cell
            .set(artifact)
            .map_err(|_| DeclarationError::SlotAlreadyFilled {
                artifact: self
                    .cell
                    .get()
                    .map(|a| a.name().to_string())
                    .unwrap_or_default(),
            })
    }

    /// Returns the stored artifact, if any
    #[must_use]
    pub fn get(&self) -> Option<Artifact> {
        self.cell.get().cloned()
    }

    /// Returns true once an artifact has been stored
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }
}
