//! Data model shared by the reconciler, the engine and the collaborators
//!
//! Everything here is created fresh for each run: the desired state from
//! configuration, observed records from one listing call, and discovered
//! addresses from one discovery call.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Address record type managed by the synchronizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record
    #[serde(rename = "A")]
    A,
    /// IPv6 address record
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    /// Both managed types, IPv4 first
    pub fn all() -> [RecordType; 2] {
        [RecordType::A, RecordType::Aaaa]
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("A") {
            Ok(RecordType::A)
        } else if s.eq_ignore_ascii_case("AAAA") {
            Ok(RecordType::Aaaa)
        } else {
            Err(Error::config(format!(
                "Unsupported record type '{}' (expected A or AAAA)",
                s
            )))
        }
    }
}

/// Normalize a host name for comparison with provider-returned names
///
/// Providers report names in lowercase and without the root dot.
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// One configured host name and the address records it should carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredHost {
    name: String,
    wanted_types: Vec<RecordType>,
    proxied: bool,
}

impl DesiredHost {
    /// Create a desired host
    ///
    /// `wanted_types` keeps its declared order; duplicates are dropped.
    /// Fails if no type is wanted.
    pub fn new(
        name: impl AsRef<str>,
        wanted_types: impl IntoIterator<Item = RecordType>,
        proxied: bool,
    ) -> Result<Self> {
        let name = normalize_name(name.as_ref());
        let mut types = Vec::new();
        for record_type in wanted_types {
            if !types.contains(&record_type) {
                types.push(record_type);
            }
        }

        if types.is_empty() {
            return Err(Error::config(format!(
                "Host '{}' must want at least one record type",
                name
            )));
        }

        Ok(Self {
            name,
            wanted_types: types,
            proxied,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wanted_types(&self) -> &[RecordType] {
        &self.wanted_types
    }

    pub fn proxied(&self) -> bool {
        self.proxied
    }

    /// Whether this host should carry a record of `record_type`
    pub fn wants(&self, record_type: RecordType) -> bool {
        self.wanted_types.contains(&record_type)
    }
}

/// The full desired configuration, in configuration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    hosts: Vec<DesiredHost>,
    index: HashMap<String, usize>,
}

impl DesiredState {
    /// Build the desired state, rejecting duplicate host names
    pub fn new(hosts: impl IntoIterator<Item = DesiredHost>) -> Result<Self> {
        let mut state = Self::default();
        for host in hosts {
            if state.index.contains_key(host.name()) {
                return Err(Error::config(format!(
                    "Host '{}' is configured more than once",
                    host.name()
                )));
            }
            state.index.insert(host.name().to_string(), state.hosts.len());
            state.hosts.push(host);
        }
        Ok(state)
    }

    /// Hosts in configuration order
    pub fn hosts(&self) -> &[DesiredHost] {
        &self.hosts
    }

    /// Look up a host by its (normalized) name
    pub fn get(&self, name: &str) -> Option<&DesiredHost> {
        self.index.get(name).map(|&i| &self.hosts[i])
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// A record as reported by the provider for the zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedRecord {
    /// Provider-assigned identifier, required for update and delete
    pub id: String,
    pub name: String,
    /// Raw record type; may be outside A/AAAA
    #[serde(rename = "type")]
    pub record_type: String,
    pub content: String,
    #[serde(default)]
    pub proxied: bool,
}

impl ObservedRecord {
    /// The record's type if it is an address type
    pub fn address_type(&self) -> Option<RecordType> {
        self.record_type.parse().ok()
    }
}

/// Freshly resolved public addresses for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredAddresses {
    pub a: Option<String>,
    pub aaaa: Option<String>,
}

impl DiscoveredAddresses {
    pub fn new(a: Option<String>, aaaa: Option<String>) -> Self {
        Self { a, aaaa }
    }

    /// Address for the given record type, if discovered
    pub fn get(&self, record_type: RecordType) -> Option<&str> {
        match record_type {
            RecordType::A => self.a.as_deref(),
            RecordType::Aaaa => self.aaaa.as_deref(),
        }
    }

    /// `true` when neither family was discovered
    pub fn is_empty(&self) -> bool {
        self.a.is_none() && self.aaaa.is_none()
    }
}

impl fmt::Display for DiscoveredAddresses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A={} AAAA={}",
            self.a.as_deref().unwrap_or("-"),
            self.aaaa.as_deref().unwrap_or("-")
        )
    }
}

/// Body of a create or update call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub content: String,
    pub proxied: bool,
}
