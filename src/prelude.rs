//! Prelude module for common imports

pub use crate::dsl::{Builder, JobContext, JobHandle, PipelineOutput, StepContext, TaskContext};
pub use crate::executor::{ExecutionSummary, ExecutorConfig};
pub use crate::infrastructure::{Config, init_logging};
pub use crate::pipeline::{
    Artifact, ArtifactSlot, DeclarationError, ExecutionError, PipelineError, Target,
};
