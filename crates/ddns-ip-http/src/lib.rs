// # HTTP Address Source
//
// This crate provides an HTTP-based address source for the DDNS record
// synchronizer.
//
// ## Architecture
//
// Fetches the current public IPv4 and IPv6 addresses from plain-text echo
// services (e.g., ipinfo.io, api.ipify.org). Each family has an ordered
// list of services; the first one that answers with an address of that
// family wins. The two families are resolved concurrently.
//
// A family for which no service answers is left absent; the engine then
// skips the hosts' records of that type instead of failing the run.

use ddns_core::ProviderRegistry;
use ddns_core::config::AddressSourceConfig;
use ddns_core::model::{DiscoveredAddresses, RecordType};
use ddns_core::traits::{AddressSource, AddressSourceFactory};
use ddns_core::{Error, Result};

use anyhow::{Context, anyhow};
use std::net::IpAddr;
use std::time::Duration;

/// Default IPv4 echo services, tried in order
pub const DEFAULT_IPV4_URLS: &[&str] = &[
    "https://ipinfo.io/ip",
    "https://api.ipify.org",
    "https://ifconfig.me/ip",
];

/// Default IPv6 echo services, tried in order
pub const DEFAULT_IPV6_URLS: &[&str] = &["https://api6.ipify.org", "https://v6.ident.me"];

/// Request timeout per echo service
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP echo-service address source
#[derive(Debug, Clone)]
pub struct HttpAddressSource {
    /// IPv4 services; empty disables the family
    ipv4_urls: Vec<String>,

    /// IPv6 services; empty disables the family
    ipv6_urls: Vec<String>,

    client: reqwest::Client,
}

impl HttpAddressSource {
    /// Create a source with explicit service lists
    pub fn new(ipv4_urls: Vec<String>, ipv6_urls: Vec<String>) -> Result<Self> {
        Self::with_timeout(ipv4_urls, ipv6_urls, REQUEST_TIMEOUT)
    }

    /// Create a source with a custom per-request timeout
    pub fn with_timeout(
        ipv4_urls: Vec<String>,
        ipv6_urls: Vec<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            ipv4_urls,
            ipv6_urls,
            client,
        })
    }

    /// Create a source using the built-in service lists
    pub fn with_defaults() -> Result<Self> {
        Self::new(to_strings(DEFAULT_IPV4_URLS), to_strings(DEFAULT_IPV6_URLS))
    }

    /// Resolve one family, trying each service until one succeeds
    async fn resolve(&self, record_type: RecordType) -> Option<String> {
        let urls = match record_type {
            RecordType::A => &self.ipv4_urls,
            RecordType::Aaaa => &self.ipv6_urls,
        };

        if urls.is_empty() {
            tracing::debug!("{} discovery disabled", record_type);
            return None;
        }

        for url in urls {
            match self.fetch(url, record_type).await {
                Ok(ip) => {
                    tracing::debug!("{} address {} from {}", record_type, ip, url);
                    return Some(ip.to_string());
                }
                Err(e) => {
                    tracing::debug!("Failed to get {} address from {}: {:#}", record_type, url, e);
                }
            }
        }

        tracing::warn!(
            "No {} address could be determined from {} service(s)",
            record_type,
            urls.len()
        );
        None
    }

    /// Fetch and parse one service's answer
    async fn fetch(&self, url: &str, record_type: RecordType) -> anyhow::Result<IpAddr> {
        let text = self
            .client
            .get(url)
            .send()
            .await
            .context("Request failed")?
            .error_for_status()
            .context("HTTP error")?
            .text()
            .await
            .context("Failed to read response")?;

        let text = text.trim();
        let ip: IpAddr = text
            .parse()
            .with_context(|| format!("Invalid IP address: {}", text))?;

        let matches = match record_type {
            RecordType::A => ip.is_ipv4(),
            RecordType::Aaaa => ip.is_ipv6(),
        };
        if !matches {
            return Err(anyhow!("Expected {} address, got: {}", record_type, ip));
        }

        Ok(ip)
    }
}

#[async_trait::async_trait]
impl AddressSource for HttpAddressSource {
    async fn discover(&self) -> Result<DiscoveredAddresses> {
        let (a, aaaa) = tokio::join!(self.resolve(RecordType::A), self.resolve(RecordType::Aaaa));
        Ok(DiscoveredAddresses::new(a, aaaa))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn to_strings(urls: &[&str]) -> Vec<String> {
    urls.iter().map(|u| u.to_string()).collect()
}

/// Factory for creating HTTP address sources
pub struct HttpFactory;

impl AddressSourceFactory for HttpFactory {
    fn create(&self, config: &AddressSourceConfig) -> Result<Box<dyn AddressSource>> {
        match config {
            AddressSourceConfig::Http {
                ipv4_urls,
                ipv6_urls,
            } => {
                let ipv4 = ipv4_urls
                    .clone()
                    .unwrap_or_else(|| to_strings(DEFAULT_IPV4_URLS));
                let ipv6 = ipv6_urls
                    .clone()
                    .unwrap_or_else(|| to_strings(DEFAULT_IPV6_URLS));

                Ok(Box::new(HttpAddressSource::new(ipv4, ipv6)?))
            }
            _ => Err(Error::config("Invalid config for HTTP address source")),
        }
    }
}

/// Register the HTTP address source with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_address_source("http", Box::new(HttpFactory));
}
