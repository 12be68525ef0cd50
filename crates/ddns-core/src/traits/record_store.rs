// # Record Store Trait
//
// Defines the interface the engine needs from a DNS provider: list the
// zone's records, and create, update or delete one record.
//
// ## Implementations
//
// - Cloudflare: `ddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::RecordStore;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* RecordStore implementation */;
//
//     for record in store.list().await? {
//         println!("{} {} {}", record.name, record.record_type, record.content);
//     }
//
//     Ok(())
// }
// ```

use crate::error::ProviderError;
use crate::model::{ObservedRecord, RecordSpec};
use async_trait::async_trait;

/// Trait for zone-scoped record store implementations
///
/// A store is bound to a single zone when it is constructed. Every call is
/// a single request against the provider.
///
/// # Thread Safety
///
/// Implementations must be thread-safe: the engine dispatches independent
/// operations concurrently against the same store.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (a failed call is reported, not repeated)
/// - ❌ Decide which records need to change (owned by `Reconciler`)
/// - ❌ Cache records between calls (each run starts from a fresh listing)
/// - ❌ Spawn tasks or threads
///
/// All four operations must be safe for a caller to retry.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List every record in the zone
    ///
    /// Implementations follow pagination internally and return the complete
    /// record set in provider order.
    async fn list(&self) -> Result<Vec<ObservedRecord>, ProviderError>;

    /// Create a record
    async fn create(&self, spec: &RecordSpec) -> Result<ObservedRecord, ProviderError>;

    /// Overwrite the record identified by `id`
    async fn update(&self, id: &str, spec: &RecordSpec) -> Result<ObservedRecord, ProviderError>;

    /// Delete the record identified by `id`
    async fn delete(&self, id: &str) -> Result<(), ProviderError>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing record stores from configuration
pub trait RecordStoreFactory: Send + Sync {
    /// Create a RecordStore instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn RecordStore>, crate::Error>;
}
