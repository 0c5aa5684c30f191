use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use tokio::time::timeout;
use tracing::trace;

/// Echo payload, the same size the system `ping` sends.
const PAYLOAD: [u8; 56] = [0; 56];

/// Liveness probe for one address.
#[async_trait]
pub trait Pinger: Send + Sync {
    /// `true` only when a reply arrived inside the probe timeout.
    async fn is_alive(&self, addr: IpAddr) -> bool;
}

/// Single ICMP echo with a bounded wait.
pub struct IcmpPinger {
    timeout: Duration,
}

impl IcmpPinger {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Pinger for IcmpPinger {
    async fn is_alive(&self, addr: IpAddr) -> bool {
        match timeout(self.timeout, surge_ping::ping(addr, &PAYLOAD)).await {
            Ok(Ok((_packet, rtt))) => {
                trace!("{addr} answered in {rtt:?}");
                true
            }
            Ok(Err(e)) => {
                trace!("ping {addr}: {e}");
                false
            }
            Err(_elapsed) => false,
        }
    }
}

/// Probes `addrs` with at most `concurrency` pings in flight, yielding each
/// verdict as soon as it is known.
pub fn probe_stream<'a, I>(
    pinger: &'a dyn Pinger,
    addrs: I,
    concurrency: usize,
) -> impl Stream<Item = (IpAddr, bool)> + Send + 'a
where
    I: Iterator<Item = IpAddr> + Send + 'a,
{
    stream::iter(addrs)
        .map(move |addr| async move { (addr, pinger.is_alive(addr).await) })
        .buffer_unordered(concurrency.max(1))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
