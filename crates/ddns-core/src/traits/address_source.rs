// # Address Source Trait
//
// Defines the interface for discovering the host's current public
// addresses.
//
// ## Implementations
//
// - HTTP echo services: `ddns-ip-http` crate
// - Local interface addresses: `ddns-ip-local` crate
// - Ordered combination of the above: `registry::LayeredAddressSource`
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::AddressSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* AddressSource implementation */;
//
//     let addresses = source.discover().await?;
//     println!("A={:?} AAAA={:?}", addresses.a, addresses.aaaa);
//
//     Ok(())
// }
// ```

use crate::model::DiscoveredAddresses;
use async_trait::async_trait;

/// Trait for address source implementations
///
/// # Per-family degradation
///
/// A family that cannot be resolved is reported as absent in the returned
/// [`DiscoveredAddresses`]; it must not turn the whole call into an error.
/// `Err` is reserved for failures that leave the source unable to say
/// anything at all.
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Perform network I/O to resolve addresses
///
/// ## Forbidden Capabilities
/// - ❌ Perform DNS updates (use `RecordStore`)
/// - ❌ Retry across runs or poll in the background
#[async_trait]
pub trait AddressSource: Send + Sync {
    /// Resolve the current public IPv4 and IPv6 addresses
    async fn discover(&self) -> Result<DiscoveredAddresses, crate::Error>;

    /// Name of the source (for logging)
    fn name(&self) -> &'static str;
}

/// Helper trait for constructing address sources from configuration
pub trait AddressSourceFactory: Send + Sync {
    /// Create an AddressSource instance from configuration
    fn create(
        &self,
        config: &crate::config::AddressSourceConfig,
    ) -> Result<Box<dyn AddressSource>, crate::Error>;
}
