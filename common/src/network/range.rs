//! Usable-host enumeration for a CIDR block.
//!
//! IPv4 networks lose their network and broadcast addresses, IPv6 networks
//! lose the subnet-router anycast (network) address. Host bits in the input
//! are ignored, so `10.0.0.5/30` describes the same block as `10.0.0.0/30`.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use pnet::ipnetwork::IpNetwork;

use crate::error::ScanError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostRange {
    network: IpNetwork,
    first: u128,
    count: u128,
}

impl HostRange {
    pub fn parse(cidr: &str) -> Result<Self, ScanError> {
        let parsed: IpNetwork = cidr.trim().parse().map_err(|e| ScanError::InvalidCidr {
            cidr: cidr.to_string(),
            reason: format!("{e}"),
        })?;

        let (base, host_bits) = match parsed {
            IpNetwork::V4(net) => (u128::from(u32::from(net.network())), 32 - u32::from(net.prefix())),
            IpNetwork::V6(net) => (u128::from(net.network()), 128 - u32::from(net.prefix())),
        };
        let network = IpNetwork::new(to_ip(parsed, base), parsed.prefix()).map_err(|e| {
            ScanError::InvalidCidr {
                cidr: cidr.to_string(),
                reason: format!("{e}"),
            }
        })?;

        // 2^host_bits, or None when the block is the whole IPv6 space
        let size = 1u128.checked_shl(host_bits);
        let (first, count) = match (network, size) {
            (IpNetwork::V4(_), Some(size)) if size > 2 => (base + 1, size - 2),
            (IpNetwork::V6(_), Some(size)) if size > 1 => (base + 1, size - 1),
            (IpNetwork::V6(_), None) => (base + 1, u128::MAX),
            _ => (base, 0),
        };

        Ok(Self {
            network,
            first,
            count,
        })
    }

    /// Like [`HostRange::parse`], refusing blocks with more than `limit` hosts.
    pub fn parse_bounded(cidr: &str, limit: u128) -> Result<Self, ScanError> {
        let range = Self::parse(cidr)?;
        if range.count > limit {
            return Err(ScanError::NetworkTooLarge {
                cidr: cidr.to_string(),
                hosts: range.count,
                limit,
            });
        }
        Ok(range)
    }

    pub fn network(&self) -> IpNetwork {
        self.network
    }

    pub fn len(&self) -> u128 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The `n`th usable host, counting from zero.
    pub fn nth_host(&self, n: u128) -> Option<IpAddr> {
        (n < self.count).then(|| to_ip(self.network, self.first + n))
    }

    pub fn to_iter(&self) -> impl Iterator<Item = IpAddr> + use<> {
        let network = self.network;
        let first = self.first;
        (0..self.count).map(move |n| to_ip(network, first + n))
    }
}

fn to_ip(family: IpNetwork, value: u128) -> IpAddr {
    match family {
        IpNetwork::V4(_) => IpAddr::V4(Ipv4Addr::from(value as u32)),
        IpNetwork::V6(_) => IpAddr::V6(Ipv6Addr::from(value)),
    }
}

impl fmt::Display for HostRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.network)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
