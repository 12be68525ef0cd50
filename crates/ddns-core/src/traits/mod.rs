//! Collaborator traits for the DDNS synchronizer
//!
//! - [`AddressSource`]: resolve the host's public addresses
//! - [`RecordStore`]: list and modify records at the DNS provider

pub mod address_source;
pub mod record_store;

pub use address_source::{AddressSource, AddressSourceFactory};
pub use record_store::{RecordStore, RecordStoreFactory};
