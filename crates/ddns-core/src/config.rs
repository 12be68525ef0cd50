//! Configuration types for the DDNS synchronizer
//!
//! This module defines the collaborator and engine settings, and the loader
//! for the desired host map.
//!
//! ## Host map format
//!
//! ```json
//! {
//!   "home.example.com": { "types": ["A", "AAAA"], "proxied": false },
//!   "vpn.example.com":  { "types": ["A"] }
//! }
//! ```
//!
//! Key order is configuration order.

use crate::error::{Error, Result};
use crate::model::{DesiredHost, DesiredState, RecordType};
use crate::reconcile::ReconcilerOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Address source configuration
    #[serde(default)]
    pub address_source: AddressSourceConfig,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DdnsConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.provider.validate()?;
        self.address_source.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// Address source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AddressSourceConfig {
    /// Plain-text HTTP echo services
    Http {
        /// IPv4 lookup URLs; `None` uses the built-in list, empty disables IPv4
        #[serde(default)]
        ipv4_urls: Option<Vec<String>>,
        /// IPv6 lookup URLs; `None` uses the built-in list, empty disables IPv6
        #[serde(default)]
        ipv6_urls: Option<Vec<String>>,
    },

    /// Global unicast addresses assigned to local network interfaces
    Interface {
        /// Only consider this interface (e.g. "eth0"); `None` scans all
        #[serde(default)]
        interface: Option<String>,
    },

    /// Several sources consulted in order; each family is taken from the
    /// first source that reports it
    Layered {
        sources: Vec<AddressSourceConfig>,
    },

    /// Custom address source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl AddressSourceConfig {
    /// Validate the address source configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            AddressSourceConfig::Http {
                ipv4_urls,
                ipv6_urls,
            } => {
                let v4_disabled = ipv4_urls.as_ref().is_some_and(|u| u.is_empty());
                let v6_disabled = ipv6_urls.as_ref().is_some_and(|u| u.is_empty());
                if v4_disabled && v6_disabled {
                    return Err(Error::config(
                        "HTTP address source has both IPv4 and IPv6 lookups disabled",
                    ));
                }

                for url in ipv4_urls.iter().chain(ipv6_urls.iter()).flatten() {
                    if !url.starts_with("https://") && !url.starts_with("http://") {
                        return Err(Error::config(format!(
                            "Address lookup URL must use HTTP or HTTPS scheme. Got: {}",
                            url
                        )));
                    }
                }
                Ok(())
            }
            AddressSourceConfig::Interface { interface } => {
                if interface.as_ref().is_some_and(|name| name.trim().is_empty()) {
                    return Err(Error::config("Interface name cannot be empty"));
                }
                Ok(())
            }
            AddressSourceConfig::Layered { sources } => {
                if sources.is_empty() {
                    return Err(Error::config("Layered address source needs at least one source"));
                }
                sources.iter().try_for_each(AddressSourceConfig::validate)
            }
            AddressSourceConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(Error::config("Custom address source factory cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the address source type name
    pub fn type_name(&self) -> &str {
        match self {
            AddressSourceConfig::Http { .. } => "http",
            AddressSourceConfig::Interface { .. } => "interface",
            AddressSourceConfig::Layered { .. } => "layered",
            AddressSourceConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for AddressSourceConfig {
    fn default() -> Self {
        AddressSourceConfig::Http {
            ipv4_urls: None,
            ipv6_urls: None,
        }
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Scoped API token (bearer auth)
        #[serde(default)]
        api_token: Option<String>,
        /// Global API key (requires `api_email`)
        #[serde(default)]
        api_key: Option<String>,
        /// Account email paired with `api_key`
        #[serde(default)]
        api_email: Option<String>,
        /// Zone identifier
        zone_id: String,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            ProviderConfig::Cloudflare {
                api_token,
                api_key,
                api_email,
                zone_id,
            } => {
                if zone_id.trim().is_empty() {
                    return Err(Error::config("Cloudflare zone identifier cannot be empty"));
                }

                let has_token = api_token.as_ref().is_some_and(|t| !t.is_empty());
                let has_key = api_key.as_ref().is_some_and(|k| !k.is_empty());
                let has_email = api_email.as_ref().is_some_and(|e| !e.is_empty());

                match (has_token, has_key, has_email) {
                    (true, _, _) | (false, true, true) => Ok(()),
                    (false, true, false) => Err(Error::config(
                        "Cloudflare API key requires the account email",
                    )),
                    (false, false, _) => Err(Error::config(
                        "Cloudflare credentials missing: set an API token or an API key and email",
                    )),
                }
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(Error::config("Custom provider factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(Error::config("Custom provider config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Cloudflare {
            api_token: None,
            api_key: None,
            api_email: None,
            zone_id: String::new(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Timeout for every network call (discovery, listing, each write), in milliseconds
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// Maximum number of write operations in flight at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Plan and log, but do not write
    #[serde(default)]
    pub dry_run: bool,

    /// Delete address records of a type the host no longer wants
    #[serde(default = "default_delete_unwanted")]
    pub delete_unwanted: bool,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<()> {
        if self.operation_timeout_ms == 0 {
            return Err(Error::config("Operation timeout must be > 0"));
        }
        if !(1..=MAX_CONCURRENCY).contains(&self.max_concurrency) {
            return Err(Error::config(format!(
                "Max concurrency must be between 1 and {}. Got: {}",
                MAX_CONCURRENCY, self.max_concurrency
            )));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn reconciler_options(&self) -> ReconcilerOptions {
        ReconcilerOptions {
            delete_unwanted: self.delete_unwanted,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            operation_timeout_ms: default_operation_timeout_ms(),
            max_concurrency: default_max_concurrency(),
            dry_run: false,
            delete_unwanted: default_delete_unwanted(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Upper bound for [`EngineConfig::max_concurrency`]
pub const MAX_CONCURRENCY: usize = 32;

fn default_operation_timeout_ms() -> u64 {
    30_000
}

fn default_max_concurrency() -> usize {
    4
}

fn default_delete_unwanted() -> bool {
    true
}

fn default_event_channel_capacity() -> usize {
    100
}

/// One entry of the host map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Record types the host should carry
    pub types: Vec<String>,

    /// Route traffic through the provider's edge
    #[serde(default)]
    pub proxied: bool,
}

/// Parse a JSON host map into the desired state
pub fn parse_hosts(json: &str) -> Result<DesiredState> {
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
    if map.is_empty() {
        return Err(Error::config("Host map must contain at least one host"));
    }

    let mut hosts = Vec::with_capacity(map.len());
    for (name, value) in map {
        validate_host_name(&name)?;

        let entry: HostConfig = serde_json::from_value(value)
            .map_err(|e| Error::config(format!("Invalid entry for host '{}': {}", name, e)))?;
        let types = entry
            .types
            .iter()
            .map(|t| t.parse::<RecordType>())
            .collect::<Result<Vec<_>>>()?;

        hosts.push(DesiredHost::new(&name, types, entry.proxied)?);
    }

    DesiredState::new(hosts)
}

/// Read and parse a JSON host map file
pub fn load_hosts_file(path: impl AsRef<Path>) -> Result<DesiredState> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("Failed to read host map {}: {}", path.display(), e))
    })?;
    parse_hosts(&content)
}

/// Validate that a string is a usable host name
///
/// Basic RFC 1035 checks; a leading `*` label is accepted for wildcard
/// records and a single trailing root dot is tolerated.
pub fn validate_host_name(name: &str) -> Result<()> {
    let name = name.strip_suffix('.').unwrap_or(name);

    if name.is_empty() {
        return Err(Error::config("Host name cannot be empty"));
    }

    if name.len() > 253 {
        return Err(Error::config(format!(
            "Host name too long: {} chars (max 253). Got: {}",
            name.len(),
            name
        )));
    }

    for (i, label) in name.split('.').enumerate() {
        if label.is_empty() {
            return Err(Error::config(format!("Host name has empty label: '{}'", name)));
        }

        if i == 0 && label == "*" {
            continue;
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "Host label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(Error::config(format!(
                "Host label contains invalid characters. Label: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "Host label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}
