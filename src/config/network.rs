//! Static IP override configuration.

use std::net::Ipv4Addr;

/// Static IP configuration applied instead of DHCP when `use_static_ip`
/// is set.
///
/// Addresses are stored u32-encoded (network byte order when viewed as
/// octets); an all-zero value means "unset".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkConfig {
    /// Use the static addresses below instead of DHCP.
    pub use_static_ip: bool,
    /// Device address.
    pub static_ip: u32,
    /// Gateway address.
    pub gateway: u32,
    /// Subnet mask.
    pub subnet: u32,
    /// Primary DNS server.
    pub primary_dns: u32,
    /// Secondary DNS server.
    pub secondary_dns: u32,
}

impl NetworkConfig {
    /// True when a static IP override is both requested and usable.
    pub fn is_configured(&self) -> bool {
        self.use_static_ip && self.static_ip != 0
    }

    /// Decode a stored address; zero means unset.
    pub fn addr(value: u32) -> Option<Ipv4Addr> {
        if value == 0 {
            None
        } else {
            Some(Ipv4Addr::from(value))
        }
    }

    /// Device address, if set.
    pub fn static_ip_addr(&self) -> Option<Ipv4Addr> {
        Self::addr(self.static_ip)
    }

    /// Gateway address, if set.
    pub fn gateway_addr(&self) -> Option<Ipv4Addr> {
        Self::addr(self.gateway)
    }

    /// Subnet mask, if set.
    pub fn subnet_addr(&self) -> Option<Ipv4Addr> {
        Self::addr(self.subnet)
    }

    /// Primary DNS server, if set.
    pub fn primary_dns_addr(&self) -> Option<Ipv4Addr> {
        Self::addr(self.primary_dns)
    }

    /// Secondary DNS server, if set.
    pub fn secondary_dns_addr(&self) -> Option<Ipv4Addr> {
        Self::addr(self.secondary_dns)
    }
}
