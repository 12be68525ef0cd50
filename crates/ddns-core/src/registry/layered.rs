//! Address source that combines several sources
//!
//! Sources are asked in order. Each family is taken from the first source
//! that reports it, and later sources are skipped once both families are
//! known. A source that fails is logged and passed over; the call only
//! fails when every consulted source failed.

use crate::error::{Error, Result};
use crate::model::DiscoveredAddresses;
use crate::traits::AddressSource;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Ordered combination of address sources
pub struct LayeredAddressSource {
    sources: Vec<Box<dyn AddressSource>>,
}

impl LayeredAddressSource {
    pub fn new(sources: Vec<Box<dyn AddressSource>>) -> Result<Self> {
        if sources.is_empty() {
            return Err(Error::config("Layered address source needs at least one source"));
        }
        Ok(Self { sources })
    }
}

#[async_trait]
impl AddressSource for LayeredAddressSource {
    async fn discover(&self) -> Result<DiscoveredAddresses> {
        let mut merged = DiscoveredAddresses::default();
        let mut last_error = None;
        let mut answered = false;

        for source in &self.sources {
            if merged.a.is_some() && merged.aaaa.is_some() {
                break;
            }

            match source.discover().await {
                Ok(found) => {
                    debug!("{} reported {}", source.name(), found);
                    answered = true;
                    merged.a = merged.a.or(found.a);
                    merged.aaaa = merged.aaaa.or(found.aaaa);
                }
                Err(e) => {
                    warn!("Address source {} failed: {}", source.name(), e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !answered => Err(e),
            _ => Ok(merged),
        }
    }

    fn name(&self) -> &'static str {
        "layered"
    }
}
