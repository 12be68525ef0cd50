//! Sync engine (run controller)
//!
//! The SyncEngine is responsible for one reconciliation pass:
//! - Discovering the current public addresses via AddressSource
//! - Listing the zone's records via RecordStore
//! - Building a plan with the Reconciler
//! - Executing the plan's writes and aggregating their outcomes
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   ┌──────────────┐
//! │ AddressSource │   │ RecordStore  │
//! │  (discover)   │   │   (list)     │
//! └───────────────┘   └──────────────┘
//!         │                  │
//!         └────────┬─────────┘
//!                  ▼
//!          ┌──────────────┐
//!          │  Reconciler  │── ReconciliationPlan
//!          └──────────────┘           │
//!                                     ▼
//!                       ┌───────────────────────────┐
//!                       │ RecordStore               │
//!                       │ (update / create / delete)│
//!                       └───────────────────────────┘
//!                                     │
//!                                     ▼
//!                               RunSummary
//! ```
//!
//! ## Failure handling
//!
//! Discovery and listing are prerequisites: if either fails the run is
//! aborted before any write. Once the plan exists, every operation runs
//! independently; a failed write is recorded in its own outcome and does
//! not stop its siblings. Every network call is bounded by the configured
//! operation timeout.

mod summary;

pub use summary::{OperationOutcome, OperationStatus, RunCounts, RunSummary};

use crate::config::EngineConfig;
use crate::error::{Error, ProviderError, Result};
use crate::model::{DesiredState, DiscoveredAddresses};
use crate::reconcile::{ReconciliationPlan, Reconciler, RecordOperation};
use crate::traits::{AddressSource, RecordStore};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Run started
    Started { hosts_count: usize },

    /// Public addresses resolved
    AddressesDiscovered { addresses: DiscoveredAddresses },

    /// Zone listing received
    RecordsListed { records_count: usize },

    /// Plan computed
    PlanBuilt {
        updates: usize,
        creates: usize,
        deletes: usize,
        skipped: usize,
    },

    /// A write was accepted by the provider
    OperationSucceeded { operation: RecordOperation },

    /// A write failed
    OperationFailed {
        operation: RecordOperation,
        error: String,
    },

    /// Run completed (possibly with failed operations)
    Finished { counts: RunCounts },

    /// Run aborted before any write
    Aborted { reason: String },
}

/// Run controller for one reconciliation pass
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Call [`SyncEngine::run()`] once per scheduled invocation
///
/// Nothing is carried from one run to the next: every run starts from a
/// fresh discovery and a fresh listing.
pub struct SyncEngine {
    /// Address source for the current public addresses
    address_source: Box<dyn AddressSource>,

    /// Record store for the managed zone
    record_store: Box<dyn RecordStore>,

    /// Hosts to keep in sync, in configuration order
    desired: DesiredState,

    reconciler: Reconciler,

    /// Timeout applied to every network call
    operation_timeout: Duration,

    /// Maximum concurrent writes
    max_concurrency: usize,

    /// Plan only, never write
    dry_run: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        address_source: Box<dyn AddressSource>,
        record_store: Box<dyn RecordStore>,
        desired: DesiredState,
        config: EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        if desired.is_empty() {
            return Err(Error::config("No hosts configured"));
        }

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            address_source,
            record_store,
            desired,
            reconciler: Reconciler::new(config.reconciler_options()),
            operation_timeout: config.operation_timeout(),
            max_concurrency: config.max_concurrency,
            dry_run: config.dry_run,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run one reconciliation pass
    ///
    /// # Returns
    ///
    /// - `Ok(RunSummary)`: the plan was executed; inspect
    ///   [`RunSummary::is_success`] for per-operation failures
    /// - `Err(Error::Discovery)` / `Err(Error::Provider)`: the run was aborted
    ///   before any write
    pub async fn run(&self) -> Result<RunSummary> {
        self.emit_event(SyncEvent::Started {
            hosts_count: self.desired.len(),
        });
        info!(
            "Starting reconciliation of {} host(s) via {} [mode: {}]",
            self.desired.len(),
            self.record_store.provider_name(),
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        let addresses = self.discover().await.map_err(|e| self.abort(e))?;
        info!("Discovered addresses: {}", addresses);
        self.emit_event(SyncEvent::AddressesDiscovered {
            addresses: addresses.clone(),
        });

        let observed = with_timeout(self.operation_timeout, self.record_store.list())
            .await
            .map_err(|e| self.abort(e.into()))?;
        info!("Fetched {} existing DNS record(s)", observed.len());
        self.emit_event(SyncEvent::RecordsListed {
            records_count: observed.len(),
        });

        let plan = self.reconciler.reconcile(&self.desired, &observed, &addresses);
        self.log_plan(&plan);

        let outcomes = self.execute(&plan).await;
        let summary = RunSummary::new(outcomes, plan.skipped);

        let counts = summary.counts;
        info!(
            updated = counts.updated,
            created = counts.created,
            deleted = counts.deleted,
            skipped = counts.skipped,
            failed = counts.failed,
            "Run finished: {} of {} attempted operation(s) succeeded",
            summary.succeeded(),
            summary.attempted()
        );
        self.emit_event(SyncEvent::Finished { counts });

        Ok(summary)
    }

    /// Resolve addresses, failing if neither family is available
    async fn discover(&self) -> Result<DiscoveredAddresses> {
        let addresses =
            match tokio::time::timeout(self.operation_timeout, self.address_source.discover())
                .await
            {
                Ok(Ok(addresses)) => addresses,
                Ok(Err(Error::Discovery(msg))) => return Err(Error::Discovery(msg)),
                Ok(Err(e)) => return Err(Error::discovery(e.to_string())),
                Err(_) => {
                    return Err(Error::discovery(format!(
                        "{} did not answer within {:?}",
                        self.address_source.name(),
                        self.operation_timeout
                    )));
                }
            };

        if addresses.is_empty() {
            return Err(Error::discovery(
                "No public address could be determined for either family",
            ));
        }

        Ok(addresses)
    }

    /// Execute every operation of the plan, at most `max_concurrency` at a time
    ///
    /// Outcomes are returned in plan order.
    async fn execute(&self, plan: &ReconciliationPlan) -> Vec<OperationOutcome> {
        let operations = plan.operations();

        if self.dry_run {
            return operations
                .into_iter()
                .map(|operation| {
                    info!("[DRY-RUN] Would {}", operation);
                    OperationOutcome {
                        operation,
                        status: OperationStatus::DryRun,
                    }
                })
                .collect();
        }

        let mut indexed: Vec<(usize, OperationOutcome)> =
            stream::iter(operations.into_iter().enumerate())
                .map(|(index, operation)| async move {
                    let status = match self.apply(&operation).await {
                        Ok(()) => {
                            self.emit_event(SyncEvent::OperationSucceeded {
                                operation: operation.clone(),
                            });
                            OperationStatus::Applied
                        }
                        Err(err) => {
                            error!("Failed to {}: {}", operation, err);
                            self.emit_event(SyncEvent::OperationFailed {
                                operation: operation.clone(),
                                error: err.to_string(),
                            });
                            OperationStatus::Failed(err)
                        }
                    };
                    (index, OperationOutcome { operation, status })
                })
                .buffer_unordered(self.max_concurrency)
                .collect()
                .await;

        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, outcome)| outcome).collect()
    }

    /// Perform a single write
    async fn apply(&self, operation: &RecordOperation) -> std::result::Result<(), ProviderError> {
        let store = &self.record_store;

        let call = async {
            match operation {
                RecordOperation::Update(update) => {
                    let record = store.update(&update.record.id, &update.spec()).await?;
                    info!(
                        "Updated {} {} -> {} (was: {})",
                        record.name, record.record_type, record.content, update.record.content
                    );
                }
                RecordOperation::Create(spec) => {
                    let record = store.create(spec).await?;
                    info!(
                        "Created {} {} {}",
                        record.name, record.record_type, record.content
                    );
                }
                RecordOperation::Delete(record) => {
                    store.delete(&record.id).await?;
                    info!(
                        "Deleted {} {} {}",
                        record.name, record.record_type, record.content
                    );
                }
            }
            Ok::<(), ProviderError>(())
        };

        with_timeout(self.operation_timeout, call).await
    }

    fn log_plan(&self, plan: &ReconciliationPlan) {
        self.emit_event(SyncEvent::PlanBuilt {
            updates: plan.to_update.len(),
            creates: plan.to_create.len(),
            deletes: plan.to_delete.len(),
            skipped: plan.skipped.len(),
        });

        if plan.is_empty() {
            info!("All records in place - nothing to do");
            return;
        }

        info!(
            "Planned {} update(s), {} create(s), {} delete(s)",
            plan.to_update.len(),
            plan.to_create.len(),
            plan.to_delete.len()
        );
        for operation in plan.operations() {
            debug!("  planned: {}", operation);
        }
    }

    /// Record an aborted run and hand the error back
    fn abort(&self, err: Error) -> Error {
        error!("Run aborted before any write: {}", err);
        self.emit_event(SyncEvent::Aborted {
            reason: err.to_string(),
        });
        err
    }

    /// Emit an engine event
    fn emit_event(&self, event: SyncEvent) {
        // Send event, logging warning if channel is full (backpressure)
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

/// Bound a provider call by `duration`, mapping expiry to a timeout error
async fn with_timeout<T, F>(duration: Duration, call: F) -> std::result::Result<T, ProviderError>
where
    F: Future<Output = std::result::Result<T, ProviderError>>,
{
    match tokio::time::timeout(duration, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::timeout()),
    }
}
