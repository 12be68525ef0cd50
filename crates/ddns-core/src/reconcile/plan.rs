//! Reconciliation plan types

use crate::model::{ObservedRecord, RecordSpec, RecordType};
use std::collections::BTreeSet;
use std::fmt;

/// An existing record whose content must change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpdate {
    /// The record as observed on the provider
    pub record: ObservedRecord,
    pub record_type: RecordType,
    /// New content (the discovered address)
    pub content: String,
    /// Proxy flag of the desired host
    pub proxied: bool,
}

impl PlannedUpdate {
    /// Body of the update call
    pub fn spec(&self) -> RecordSpec {
        RecordSpec {
            name: self.record.name.clone(),
            record_type: self.record_type,
            content: self.content.clone(),
            proxied: self.proxied,
        }
    }
}

/// Why a wanted (host, type) pair was left alone this run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No address was discovered for the record type
    MissingAddress,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingAddress => f.write_str("no address discovered"),
        }
    }
}

/// A wanted (host, type) pair that could not be updated or created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPair {
    pub name: String,
    pub record_type: RecordType,
    pub reason: SkipReason,
}

/// A single write against the record store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOperation {
    Update(PlannedUpdate),
    Create(RecordSpec),
    Delete(ObservedRecord),
}

impl RecordOperation {
    /// Host name the operation touches
    pub fn name(&self) -> &str {
        match self {
            RecordOperation::Update(update) => &update.record.name,
            RecordOperation::Create(spec) => &spec.name,
            RecordOperation::Delete(record) => &record.name,
        }
    }

    /// Raw record type the operation touches
    pub fn record_type(&self) -> &str {
        match self {
            RecordOperation::Update(update) => update.record_type.as_str(),
            RecordOperation::Create(spec) => spec.record_type.as_str(),
            RecordOperation::Delete(record) => &record.record_type,
        }
    }

    /// Short verb used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            RecordOperation::Update(_) => "update",
            RecordOperation::Create(_) => "create",
            RecordOperation::Delete(_) => "delete",
        }
    }
}

impl fmt::Display for RecordOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordOperation::Update(update) => write!(
                f,
                "update {} {} {} -> {}",
                update.record.name, update.record_type, update.record.content, update.content
            ),
            RecordOperation::Create(spec) => {
                write!(f, "create {} {} {}", spec.name, spec.record_type, spec.content)
            }
            RecordOperation::Delete(record) => write!(
                f,
                "delete {} {} {}",
                record.name, record.record_type, record.content
            ),
        }
    }
}

/// Output of one reconciliation: the minimal operation set to converge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub to_update: Vec<PlannedUpdate>,
    pub to_create: Vec<RecordSpec>,
    pub to_delete: Vec<ObservedRecord>,
    /// Wanted pairs left alone for lack of an address
    pub skipped: Vec<SkippedPair>,
}

impl ReconciliationPlan {
    /// `true` when no write is needed
    pub fn is_empty(&self) -> bool {
        self.operation_count() == 0
    }

    pub fn operation_count(&self) -> usize {
        self.to_update.len() + self.to_create.len() + self.to_delete.len()
    }

    /// All operations, updates first, then creates, then deletes
    pub fn operations(&self) -> Vec<RecordOperation> {
        let mut ops = Vec::with_capacity(self.operation_count());
        ops.extend(self.to_update.iter().cloned().map(RecordOperation::Update));
        ops.extend(self.to_create.iter().cloned().map(RecordOperation::Create));
        ops.extend(self.to_delete.iter().cloned().map(RecordOperation::Delete));
        ops
    }

    /// (name, type) keys touched by the update, create and delete lists
    pub fn touched_keys(&self) -> [BTreeSet<(String, String)>; 3] {
        let updates = self
            .to_update
            .iter()
            .map(|u| (u.record.name.clone(), u.record_type.to_string()))
            .collect();
        let creates = self
            .to_create
            .iter()
            .map(|c| (c.name.clone(), c.record_type.to_string()))
            .collect();
        let deletes = self
            .to_delete
            .iter()
            .map(|d| (d.name.clone(), d.record_type.clone()))
            .collect();
        [updates, creates, deletes]
    }
}
