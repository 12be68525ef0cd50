// # Local Interface Address Source
//
// This crate provides an address source that reads the addresses assigned
// to the host's own network interfaces.
//
// ## When to use
//
// A host behind NAT only sees private IPv4 addresses locally, so IPv4 is
// normally resolved through echo services (`ddns-ip-http`). IPv6 hosts
// usually carry their global address on the interface itself; this source
// reports it without any network round trip.
//
// ## Selection rules
//
// - Only globally routable unicast addresses are reported
// - IPv4: private, loopback, link-local, shared (100.64.0.0/10),
//   documentation, broadcast and multicast ranges are ignored
// - IPv6: only 2000::/3 qualifies, minus the documentation prefix
// - With an interface name configured, other interfaces are ignored
// - The first qualifying address of each family in enumeration order wins

use ddns_core::ProviderRegistry;
use ddns_core::config::AddressSourceConfig;
use ddns_core::model::DiscoveredAddresses;
use ddns_core::traits::{AddressSource, AddressSourceFactory};
use ddns_core::{Error, Result};

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Address source over local interface addresses
#[derive(Debug, Clone, Default)]
pub struct LocalAddressSource {
    /// Restrict to one interface
    interface: Option<String>,
}

impl LocalAddressSource {
    pub fn new(interface: Option<String>) -> Self {
        Self { interface }
    }
}

#[async_trait::async_trait]
impl AddressSource for LocalAddressSource {
    async fn discover(&self) -> Result<DiscoveredAddresses> {
        let interfaces = local_ip_address::list_afinet_netifas()
            .map_err(|e| Error::discovery(format!("Failed to list interface addresses: {}", e)))?;

        tracing::debug!("Found {} interface address(es)", interfaces.len());

        let addresses = select_addresses(&interfaces, self.interface.as_deref());
        if addresses.is_empty() {
            tracing::warn!(
                "No global address on {}",
                self.interface.as_deref().unwrap_or("any interface")
            );
        }

        Ok(addresses)
    }

    fn name(&self) -> &'static str {
        "interface"
    }
}

/// Pick the first global address of each family
pub fn select_addresses(
    interfaces: &[(String, IpAddr)],
    interface: Option<&str>,
) -> DiscoveredAddresses {
    let candidates = interfaces
        .iter()
        .filter(|(name, _)| interface.is_none_or(|wanted| wanted == name))
        .map(|(_, ip)| *ip);

    let mut a = None;
    let mut aaaa = None;
    for ip in candidates {
        match ip {
            IpAddr::V4(v4) if a.is_none() && is_global_v4(&v4) => a = Some(v4.to_string()),
            IpAddr::V6(v6) if aaaa.is_none() && is_global_v6(&v6) => aaaa = Some(v6.to_string()),
            _ => {}
        }
    }

    DiscoveredAddresses::new(a, aaaa)
}

fn is_global_v4(ip: &Ipv4Addr) -> bool {
    let [first, second, ..] = ip.octets();
    let shared = first == 100 && (second & 0xc0) == 64;

    !(ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_multicast()
        || shared)
}

fn is_global_v6(ip: &Ipv6Addr) -> bool {
    let segments = ip.segments();
    let global_unicast = (segments[0] & 0xe000) == 0x2000;
    let documentation = segments[0] == 0x2001 && segments[1] == 0x0db8;

    global_unicast && !documentation
}

/// Factory for creating interface address sources
pub struct LocalFactory;

impl AddressSourceFactory for LocalFactory {
    fn create(&self, config: &AddressSourceConfig) -> Result<Box<dyn AddressSource>> {
        match config {
            AddressSourceConfig::Interface { interface } => {
                Ok(Box::new(LocalAddressSource::new(interface.clone())))
            }
            _ => Err(Error::config("Invalid config for interface address source")),
        }
    }
}

/// Register the interface address source with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_address_source("interface", Box::new(LocalFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn netifas(entries: &[(&str, &str)]) -> Vec<(String, IpAddr)> {
        entries
            .iter()
            .map(|(name, ip)| (name.to_string(), ip.parse().unwrap()))
            .collect()
    }

    #[test]
    fn test_global_addresses_selected() {
        let interfaces = netifas(&[
            ("lo", "127.0.0.1"),
            ("lo", "::1"),
            ("eth0", "192.168.1.20"),
            ("eth0", "fe80::1c2d:3eff:fe4f:5a6b"),
            ("eth0", "fd12:3456:789a::1"),
            ("eth0", "2a01:4f8:c0c:1234::1"),
            ("eth0", "2a01:4f8:c0c:1234::2"),
        ]);

        let addresses = select_addresses(&interfaces, None);

        assert_eq!(addresses.a, None);
        assert_eq!(addresses.aaaa.as_deref(), Some("2a01:4f8:c0c:1234::1"));
    }

    #[test]
    fn test_public_ipv4_on_interface_is_reported() {
        let interfaces = netifas(&[
            ("wan", "100.64.3.9"),
            ("wan", "81.2.69.142"),
        ]);

        let addresses = select_addresses(&interfaces, None);

        assert_eq!(addresses.a.as_deref(), Some("81.2.69.142"));
        assert_eq!(addresses.aaaa, None);
    }

    #[test]
    fn test_interface_filter() {
        let interfaces = netifas(&[
            ("wg0", "2a0c:5bc0:40::1"),
            ("eth0", "2a01:4f8:c0c:1234::1"),
        ]);

        let addresses = select_addresses(&interfaces, Some("eth0"));
        assert_eq!(addresses.aaaa.as_deref(), Some("2a01:4f8:c0c:1234::1"));

        let none = select_addresses(&interfaces, Some("eth1"));
        assert!(none.is_empty());
    }

    #[test]
    fn test_documentation_ranges_ignored() {
        let interfaces = netifas(&[("eth0", "203.0.113.7"), ("eth0", "2001:db8::7")]);

        assert!(select_addresses(&interfaces, None).is_empty());
    }

    #[test]
    fn test_factory_creation() {
        let config = AddressSourceConfig::Interface {
            interface: Some("eth0".to_string()),
        };
        let source = LocalFactory.create(&config).unwrap();
        assert_eq!(source.name(), "interface");

        assert!(LocalFactory.create(&AddressSourceConfig::default()).is_err());
    }

    #[test]
    fn test_register() {
        let registry = ProviderRegistry::new();
        register(&registry);
        assert!(registry.has_address_source("interface"));
    }

    #[tokio::test]
    async fn test_discover_on_this_host() {
        // Hosts without a global address still succeed with absent families
        let source = LocalAddressSource::new(Some("no-such-interface0".to_string()));

        let addresses = source.discover().await.unwrap();

        assert!(addresses.is_empty());
    }
}
