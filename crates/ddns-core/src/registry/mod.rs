//! Plugin-based provider registry
//!
//! The registry allows record stores and address sources to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ddns_core::registry::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new();
//! ddns_provider_cloudflare::register(&registry);
//! ddns_ip_http::register(&registry);
//!
//! let store = registry.create_record_store(&config.provider)?;
//! let source = registry.create_address_source(&config.address_source)?;
//! ```
//!
//! `layered` address source configurations are assembled by the registry
//! itself from their registered member types.

mod layered;

pub use layered::LayeredAddressSource;

use crate::config::{AddressSourceConfig, ProviderConfig};
use crate::error::{Error, Result};
use crate::traits::{AddressSource, AddressSourceFactory, RecordStore, RecordStoreFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Registry for plugin-based collaborator creation
///
/// The registry maintains maps of type names to factory objects,
/// allowing dynamic instantiation based on configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered record store factories
    record_stores: RwLock<HashMap<String, Box<dyn RecordStoreFactory>>>,

    /// Registered address source factories
    address_sources: RwLock<HashMap<String, Box<dyn AddressSourceFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record store factory under `name` (e.g. "cloudflare")
    pub fn register_record_store(
        &self,
        name: impl Into<String>,
        factory: Box<dyn RecordStoreFactory>,
    ) {
        self.record_stores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), factory);
    }

    /// Register an address source factory under `name` (e.g. "http")
    pub fn register_address_source(
        &self,
        name: impl Into<String>,
        factory: Box<dyn AddressSourceFactory>,
    ) {
        self.address_sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), factory);
    }

    /// Create a record store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn RecordStore>)`: Created store instance
    /// - `Err(Error)`: If the type is not registered or creation fails
    pub fn create_record_store(&self, config: &ProviderConfig) -> Result<Box<dyn RecordStore>> {
        let provider_type = config.type_name();
        let stores = self
            .record_stores
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = stores
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config)
    }

    /// Create an address source from configuration
    pub fn create_address_source(
        &self,
        config: &AddressSourceConfig,
    ) -> Result<Box<dyn AddressSource>> {
        if let AddressSourceConfig::Layered { sources } = config {
            let members = sources
                .iter()
                .map(|member| self.create_address_source(member))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Box::new(LayeredAddressSource::new(members)?));
        }

        let source_type = config.type_name();
        let sources = self
            .address_sources
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = sources.get(source_type).ok_or_else(|| {
            Error::config(format!("Unknown address source type: {}", source_type))
        })?;

        factory.create(config)
    }

    /// List all registered record store types
    pub fn list_record_stores(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .record_stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// List all registered address source types
    pub fn list_address_sources(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .address_sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Check if a record store type is registered
    pub fn has_record_store(&self, name: &str) -> bool {
        self.record_stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Check if an address source type is registered
    pub fn has_address_source(&self, name: &str) -> bool {
        self.address_sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}
