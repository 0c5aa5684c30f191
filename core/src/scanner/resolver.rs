use std::collections::HashMap;
use std::net::IpAddr;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{debug, trace};

#[async_trait]
pub trait NameResolver: Send + Sync {
    /// PTR name for `addr`, `None` when the lookup fails or yields nothing.
    async fn reverse(&self, addr: IpAddr) -> Option<String>;
}

/// Reverse lookups through the system resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReverseDnsResolver;

#[async_trait]
impl NameResolver for ReverseDnsResolver {
    async fn reverse(&self, addr: IpAddr) -> Option<String> {
        let lookup = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&addr)).await;
        match lookup {
            // getnameinfo hands back the numeric form when there is no PTR record
            Ok(Ok(name)) if name.parse::<IpAddr>().is_err() && !name.is_empty() => {
                trace!("{addr} -> {name}");
                Some(name)
            }
            Ok(Ok(_)) => None,
            Ok(Err(e)) => {
                trace!("reverse lookup for {addr} failed: {e}");
                None
            }
            Err(e) => {
                debug!("reverse lookup task for {addr} aborted: {e}");
                None
            }
        }
    }
}

/// Resolves every address with at most `concurrency` lookups in flight.
/// Each input address appears in the result exactly once.
pub async fn resolve_all(
    resolver: &dyn NameResolver,
    addrs: &[IpAddr],
    concurrency: usize,
) -> HashMap<IpAddr, Option<String>> {
    stream::iter(addrs.iter().copied())
        .map(|addr| async move { (addr, resolver.reverse(addr).await) })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
