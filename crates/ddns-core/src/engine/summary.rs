//! Per-operation outcomes and the run summary

use crate::error::ProviderError;
use crate::reconcile::{RecordOperation, SkippedPair};

/// What happened to one planned operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    /// The provider accepted the write
    Applied,
    /// The write failed; sibling operations were unaffected
    Failed(ProviderError),
    /// Dry-run mode; nothing was sent
    DryRun,
}

/// A planned operation together with its result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub operation: RecordOperation,
    pub status: OperationStatus,
}

impl OperationOutcome {
    pub fn error(&self) -> Option<&ProviderError> {
        match &self.status {
            OperationStatus::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Aggregate counters for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub updated: usize,
    pub created: usize,
    pub deleted: usize,
    /// Wanted pairs without an address, plus operations not sent in dry-run mode
    pub skipped: usize,
    pub failed: usize,
}

/// Result of one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub counts: RunCounts,
    /// Outcomes in plan order
    pub outcomes: Vec<OperationOutcome>,
    pub skipped: Vec<SkippedPair>,
}

impl RunSummary {
    /// Aggregate outcomes into a summary
    pub fn new(outcomes: Vec<OperationOutcome>, skipped: Vec<SkippedPair>) -> Self {
        let mut counts = RunCounts {
            skipped: skipped.len(),
            ..RunCounts::default()
        };

        for outcome in &outcomes {
            match (&outcome.status, &outcome.operation) {
                (OperationStatus::Failed(_), _) => counts.failed += 1,
                (OperationStatus::DryRun, _) => counts.skipped += 1,
                (OperationStatus::Applied, RecordOperation::Update(_)) => counts.updated += 1,
                (OperationStatus::Applied, RecordOperation::Create(_)) => counts.created += 1,
                (OperationStatus::Applied, RecordOperation::Delete(_)) => counts.deleted += 1,
            }
        }

        Self {
            counts,
            outcomes,
            skipped,
        }
    }

    /// Operations actually sent to the provider
    pub fn attempted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status != OperationStatus::DryRun)
            .count()
    }

    /// Operations the provider accepted
    pub fn succeeded(&self) -> usize {
        self.counts.updated + self.counts.created + self.counts.deleted
    }

    /// Failed operations with their errors
    pub fn failures(&self) -> impl Iterator<Item = (&RecordOperation, &ProviderError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.error().map(|e| (&o.operation, e)))
    }

    /// `true` when no operation failed
    pub fn is_success(&self) -> bool {
        self.counts.failed == 0
    }
}
