//! Pipeline domain types and logic

pub mod artifact;
pub mod dependencies;
pub mod errors;
pub mod job;
pub mod types;

pub use artifact::{Artifact, ArtifactSlot};
pub use dependencies::{DependencyEdge, DependencyLedger};
pub use errors::{DeclarationError, ExecutionError, PipelineError};
pub use job::{Job, Step, Task};
pub use types::{Target, TaskId, TaskRef, TaskState};
