// # ddns-core
//
// Core library for the DDNS record synchronizer.
//
// ## Architecture Overview
//
// This library keeps a fixed set of host names at a DNS provider in sync
// with the machine's current public addresses:
// - **AddressSource**: Trait for discovering the current public IPv4/IPv6 addresses
// - **RecordStore**: Trait for listing and modifying records via a provider API
// - **Reconciler**: Diffs desired hosts against observed records into a minimal plan
// - **SyncEngine**: Runs one discover → list → reconcile → execute pass
// - **ProviderRegistry**: Plugin-based registry for record stores and address sources
//
// ## Design Principles
//
// 1. **Separation of Concerns**: The reconciler is pure; I/O lives behind traits
// 2. **Deterministic Plans**: Identical inputs always produce identical plans
// 3. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Observable Partial Success**: Failed writes are reported, never fatal to siblings

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod registry;
pub mod traits;

// Re-export core types for convenience
pub use config::{AddressSourceConfig, DdnsConfig, EngineConfig, ProviderConfig};
pub use engine::{OperationOutcome, OperationStatus, RunCounts, RunSummary, SyncEngine, SyncEvent};
pub use error::{ApiMessage, Error, ProviderError, ProviderStatus, Result};
pub use model::{DesiredHost, DesiredState, DiscoveredAddresses, ObservedRecord, RecordSpec, RecordType};
pub use reconcile::{ReconciliationPlan, Reconciler, ReconcilerOptions, RecordOperation};
pub use registry::ProviderRegistry;
pub use traits::{AddressSource, RecordStore};
