//! SNMP client over UDP.
//!
//! Remote trouble (timeouts, community rejection, error statuses, exception
//! values) is reported as absence: `Ok(None)` from [`SnmpClient::get`] and a
//! short or empty table from [`SnmpClient::walk`]. `Err` is reserved for
//! local failures such as an unresolvable host name or a socket that cannot
//! be opened.

use std::collections::BTreeMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use autodisco_common::config::ScanConfig;
use autodisco_protocols::oid::Oid;
use autodisco_protocols::snmp::{self, Message, PduKind, SnmpValue};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, trace};

const MAX_DATAGRAM: usize = 65_535;

/// Trailing sub-identifier of a table row.
///
/// Only meaningful for joining columns fetched from the same device within
/// one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowIndex(u32);

impl RowIndex {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RowIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One table column keyed by row index.
pub type Table = BTreeMap<RowIndex, SnmpValue>;

#[async_trait]
pub trait SnmpClient: Send + Sync {
    async fn get(&self, host: &str, community: &str, oid: &Oid) -> anyhow::Result<Option<SnmpValue>>;

    /// Collects every row below `prefix`, stopping at the first error or at
    /// the end of the subtree. Rows gathered before a stop are kept.
    async fn walk(&self, host: &str, community: &str, prefix: &Oid) -> anyhow::Result<Table>;
}

pub struct UdpSnmpClient {
    port: u16,
    timeout: Duration,
    retries: u32,
}

impl UdpSnmpClient {
    pub fn new(port: u16, timeout: Duration, retries: u32) -> Self {
        Self {
            port,
            timeout,
            retries,
        }
    }

    pub fn from_config(cfg: &ScanConfig) -> Self {
        Self::new(cfg.snmp_port, cfg.snmp_timeout, cfg.snmp_retries)
    }

    async fn connect(&self, host: &str) -> anyhow::Result<UdpSocket> {
        let remote: SocketAddr = tokio::net::lookup_host((host, self.port))
            .await
            .with_context(|| format!("resolving {host}"))?
            .next()
            .with_context(|| format!("no address found for {host}"))?;

        let local: SocketAddr = if remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await.context("binding SNMP socket")?;
        socket
            .connect(remote)
            .await
            .with_context(|| format!("connecting SNMP socket to {remote}"))?;
        Ok(socket)
    }

    /// One request with the retry budget applied. `None` when no usable
    /// answer arrived.
    async fn request(
        &self,
        socket: &UdpSocket,
        community: &str,
        kind: PduKind,
        oid: &Oid,
    ) -> anyhow::Result<Option<Message>> {
        let request_id = snmp::next_request_id();
        let packet = snmp::encode_request(community, request_id, kind, oid)
            .with_context(|| format!("encoding request for {oid}"))?;
        let mut buf = vec![0u8; MAX_DATAGRAM];

        for attempt in 0..=self.retries {
            if let Err(e) = socket.send(&packet).await {
                debug!("SNMP send for {oid} failed: {e}");
                return Ok(None);
            }
            match timeout(self.timeout, receive(socket, request_id, &mut buf)).await {
                Ok(reply) => return Ok(reply),
                Err(_elapsed) => trace!("SNMP request for {oid} timed out (attempt {})", attempt + 1),
            }
        }
        Ok(None)
    }
}

async fn receive(socket: &UdpSocket, request_id: i32, buf: &mut [u8]) -> Option<Message> {
    loop {
        let len = match socket.recv(buf).await {
            Ok(len) => len,
            Err(e) => {
                debug!("SNMP receive failed: {e}");
                return None;
            }
        };
        match snmp::decode_response(&buf[..len]) {
            Ok(message) if message.request_id == request_id => return Some(message),
            // late answer to an earlier attempt
            Ok(_) => continue,
            Err(e) => {
                debug!("discarding malformed SNMP response: {e}");
                continue;
            }
        }
    }
}

#[async_trait]
impl SnmpClient for UdpSnmpClient {
    async fn get(&self, host: &str, community: &str, oid: &Oid) -> anyhow::Result<Option<SnmpValue>> {
        let socket = self.connect(host).await?;
        let Some(message) = self.request(&socket, community, PduKind::Get, oid).await? else {
            return Ok(None);
        };
        if message.is_error() {
            debug!("{host} answered {oid} with error status {}", message.error_status);
            return Ok(None);
        }
        Ok(message
            .varbinds
            .into_iter()
            .next()
            .map(|varbind| varbind.value)
            .filter(|value| !value.is_exception()))
    }

    async fn walk(&self, host: &str, community: &str, prefix: &Oid) -> anyhow::Result<Table> {
        let socket = self.connect(host).await?;
        let mut table = Table::new();
        let mut cursor = prefix.clone();

        loop {
            let Some(message) = self
                .request(&socket, community, PduKind::GetNext, &cursor)
                .await?
            else {
                break;
            };
            if message.is_error() {
                break;
            }
            let Some(varbind) = message.varbinds.into_iter().next() else {
                break;
            };
            // stop at the end of the subtree, and on agents that do not advance
            if varbind.value.is_exception()
                || !varbind.oid.starts_with(prefix)
                || varbind.oid <= cursor
            {
                break;
            }
            if let Some(index) = varbind.oid.last() {
                table.insert(RowIndex::new(index), varbind.value);
            }
            cursor = varbind.oid;
        }

        debug!("walked {prefix} on {host}: {} rows", table.len());
        Ok(table)
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
