//! Artifact dependency ledger
//!
//! Records a "must complete before" edge from the producer of an artifact to
//! every task that consumes it. The ledger is passive: nothing here reorders
//! execution. Renderers read it to annotate output and the local executor
//! reads it to report consumptions that chaining did not enforce.

use super::artifact::Artifact;
use super::types::{TaskId, TaskRef};
use ahash::AHashSet;
use parking_lot::Mutex;
use serde::Serialize;

/// One recorded consumption
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEdge {
    /// Task that consumed the artifact
    pub consumer: TaskRef,
    /// Task that produced the artifact
    pub producer: TaskRef,
    /// Name of the consumed artifact
    pub artifact: String,
}

/// Ledger of producer → consumer edges, shared by one builder session
#[derive(Debug, Default)]
pub struct DependencyLedger {
    edges: Mutex<Vec<DependencyEdge>>,
}

impl DependencyLedger {
    /// Creates an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `consumer` depends on the producer of `artifact`
    pub fn record(&self, consumer: TaskRef, artifact: &Artifact) {
        tracing::debug!(
            consumer = %consumer,
            producer = %artifact.producer(),
            artifact = artifact.name(),
            "Recorded artifact dependency"
        );

        self.edges.lock().push(DependencyEdge {
            consumer,
            producer: artifact.producer().clone(),
            artifact: artifact.name().to_string(),
        });
    }

    /// Snapshot of every edge in recording order
    #[must_use]
    pub fn edges(&self) -> Vec<DependencyEdge> {
        self.edges.lock().clone()
    }

    /// Producers `consumer` depends on, first-seen order, without duplicates
    #[must_use]
    pub fn needs(&self, consumer: TaskId) -> Vec<TaskRef> {
        let edges = self.edges.lock();
        let mut seen = AHashSet::new();
        edges
            .iter()
            .filter(|edge| edge.consumer.id == consumer)
            .filter(|edge| seen.insert(edge.producer.id))
            .map(|edge| edge.producer.clone())
            .collect()
    }

    /// Consumers that depend on `producer`, first-seen order, without duplicates
    #[must_use]
    pub fn dependents(&self, producer: TaskId) -> Vec<TaskRef> {
        let edges = self.edges.lock();
        let mut seen = AHashSet::new();
        edges
            .iter()
            .filter(|edge| edge.producer.id == producer)
            .filter(|edge| seen.insert(edge.consumer.id))
            .map(|edge| edge.consumer.clone())
            .collect()
    }

    /// Number of recorded edges
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.lock().len()
    }

    /// Returns true if nothing was consumed yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: usize, name: &str) -> TaskRef {
        TaskRef {
            id: TaskId(id),
            name: name.to_string(),
            step: "Stage1".to_string(),
        }
    }

    fn artifact_from(producer: TaskRef, name: &str) -> Artifact {
        Artifact::new(producer, name, vec!["./out".to_string()]).unwrap()
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = DependencyLedger::new();
        assert!(ledger.is_empty());
        assert!(ledger.needs(TaskId(0)).is_empty());
    }

    #[test]
    fn test_record_creates_edge_to_producer() {
        let ledger = DependencyLedger::new();
        let p1 = artifact_from(task(1, "SecondTask"), "P1");

        ledger.record(task(2, "ThirdTask"), &p1);

        let edges = ledger.edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].producer.name, "SecondTask");
        assert_eq!(edges[0].consumer.name, "ThirdTask");
        assert_eq!(edges[0].artifact, "P1");
    }

    #[test]
    fn test_needs_deduplicates_producers() {
        let ledger = DependencyLedger::new();
        let p1 = artifact_from(task(1, "A"), "P1");
        let p2 = artifact_from(task(3, "B"), "P2");

        ledger.record(task(4, "C"), &p1);
        ledger.record(task(4, "C"), &p1);
        ledger.record(task(4, "C"), &p2);

        let needs: Vec<_> = ledger.needs(TaskId(4)).into_iter().map(|t| t.name).collect();
        assert_eq!(needs, vec!["A", "B"]);
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_dependents_of_producer() {
        let ledger = DependencyLedger::new();
        let p1 = artifact_from(task(1, "A"), "P1");

        ledger.record(task(2, "B"), &p1);
        ledger.record(task(3, "C"), &p1);

        let dependents: Vec<_> = ledger
            .dependents(TaskId(1))
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(dependents, vec!["B", "C"]);
        assert!(ledger.dependents(TaskId(2)).is_empty());
    }
}
