//! Reconciler
//!
//! Diffs the desired host configuration against the provider's record set
//! and the freshly discovered addresses, and produces the minimal set of
//! writes needed to converge.
//!
//! ## Classification
//!
//! For each observed record, in listing order:
//!
//! 1. Name not configured → untouched.
//! 2. Address type wanted by the host → marked seen; updated if the content
//!    differs from the discovered address.
//! 3. Address type not wanted by the host → deleted (unless
//!    [`ReconcilerOptions::delete_unwanted`] is off).
//!
//! Non-address records (MX, TXT, ...) are never touched.
//!
//! Afterwards every configured (host, type) pair that was not seen is
//! created. Iteration order is fixed, so identical inputs always yield
//! identical plans.

mod plan;

pub use plan::{PlannedUpdate, ReconciliationPlan, RecordOperation, SkipReason, SkippedPair};

use crate::model::{
    normalize_name, DesiredState, DiscoveredAddresses, ObservedRecord, RecordSpec, RecordType,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Tunables for the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerOptions {
    /// Delete address records of a type the host no longer wants
    pub delete_unwanted: bool,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            delete_unwanted: true,
        }
    }
}

/// (host, type) pairs confirmed present on the provider during one run
#[derive(Debug, Default)]
struct SeenSet(HashMap<String, HashSet<RecordType>>);

impl SeenSet {
    /// Returns `true` on the first sighting of the pair
    fn mark(&mut self, name: &str, record_type: RecordType) -> bool {
        self.0
            .entry(name.to_string())
            .or_default()
            .insert(record_type)
    }

    fn contains(&self, name: &str, record_type: RecordType) -> bool {
        self.0
            .get(name)
            .is_some_and(|types| types.contains(&record_type))
    }
}

/// Computes reconciliation plans
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    options: ReconcilerOptions,
}

impl Reconciler {
    pub fn new(options: ReconcilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ReconcilerOptions {
        self.options
    }

    /// Build the plan for one run
    pub fn reconcile(
        &self,
        desired: &DesiredState,
        observed: &[ObservedRecord],
        addresses: &DiscoveredAddresses,
    ) -> ReconciliationPlan {
        let mut seen = SeenSet::default();
        let mut plan = ReconciliationPlan::default();

        for record in observed {
            let Some(host) = desired.get(&normalize_name(&record.name)) else {
                continue;
            };

            debug!("Processing {} - {}", record.name, record.record_type);

            let Some(record_type) = record.address_type() else {
                debug!(
                    "Leaving non-address record {} {} untouched",
                    record.name, record.record_type
                );
                continue;
            };

            if !host.wants(record_type) {
                if self.options.delete_unwanted {
                    debug!("Record {} {} has unwanted type, deleting", record.name, record_type);
                    plan.to_delete.push(record.clone());
                } else {
                    debug!("Record {} {} has unwanted type, keeping", record.name, record_type);
                }
                continue;
            }

            let first_sighting = seen.mark(host.name(), record_type);

            match addresses.get(record_type) {
                None if first_sighting => skip(&mut plan, host.name(), record_type),
                None => {}
                Some(address) if address == record.content => {
                    debug!("Addresses equal for {} {}, nothing to do", record.name, record_type);
                }
                Some(address) => {
                    debug!(
                        "Addresses differ for {} {}: {} -> {}",
                        record.name, record_type, record.content, address
                    );
                    plan.to_update.push(PlannedUpdate {
                        record: record.clone(),
                        record_type,
                        content: address.to_string(),
                        proxied: host.proxied(),
                    });
                }
            }
        }

        for host in desired.hosts() {
            for &record_type in host.wanted_types() {
                if seen.contains(host.name(), record_type) {
                    continue;
                }

                match addresses.get(record_type) {
                    None => skip(&mut plan, host.name(), record_type),
                    Some(address) => {
                        debug!("Record {} {} missing, creating", host.name(), record_type);
                        plan.to_create.push(RecordSpec {
                            name: host.name().to_string(),
                            record_type,
                            content: address.to_string(),
                            proxied: host.proxied(),
                        });
                    }
                }
            }
        }

        plan
    }
}

fn skip(plan: &mut ReconciliationPlan, name: &str, record_type: RecordType) {
    warn!(
        "No {} address discovered, skipping {} {}",
        record_type, name, record_type
    );
    plan.skipped.push(SkippedPair {
        name: name.to_string(),
        record_type,
        reason: SkipReason::MissingAddress,
    });
}
