use std::net::IpAddr;
use std::pin::pin;

use autodisco_common::config::ScanConfig;
use autodisco_common::finding::{Finding, FindingKind, FindingSink};
use autodisco_common::inventory::{AddressRecord, Inventory};
use autodisco_common::network::range::HostRange;
use autodisco_common::run::RunHandle;
use autodisco_common::stats::RangeStats;
use futures::StreamExt;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;
use tracing::{debug, info};

use crate::scanner::prober::{self, Pinger};
use crate::scanner::resolver::{self, NameResolver};

pub const DESCRIPTION: &str = "Discovered by AutoDiscovery";
pub const SIMULATED_DESCRIPTION: &str = "Discovered (simulated) by AutoDiscovery";

/// Sweeps a CIDR block for live hosts.
///
/// Live hosts are gathered into batches of `batch_size`; each batch is
/// resolved, reconciled and reported before the next one starts, so the
/// run log grows monotonically while the sweep is in flight.
pub struct RangeScan<'a> {
    pinger: &'a dyn Pinger,
    resolver: &'a dyn NameResolver,
    inventory: &'a dyn Inventory,
    findings: &'a dyn FindingSink,
    config: &'a ScanConfig,
}

impl<'a> RangeScan<'a> {
    pub fn new(
        pinger: &'a dyn Pinger,
        resolver: &'a dyn NameResolver,
        inventory: &'a dyn Inventory,
        findings: &'a dyn FindingSink,
        config: &'a ScanConfig,
    ) -> Self {
        Self {
            pinger,
            resolver,
            inventory,
            findings,
            config,
        }
    }

    pub async fn run(
        &self,
        cidr: &str,
        simulate: bool,
        handle: &mut RunHandle<'_>,
    ) -> anyhow::Result<RangeStats> {
        let range = HostRange::parse_bounded(cidr, self.config.max_hosts)?;
        let mut stats = RangeStats::new(cidr.trim());
        info!("Sweeping {range} ({} usable hosts)", range.len());

        if simulate {
            self.simulate(range, &mut stats, handle)?;
        } else {
            self.sweep(range, &mut stats, handle).await?;
        }

        handle.append_and_persist(format!(
            "Done. Alive={}, Created={}, Existing={}, Resolved={}",
            stats.alive, stats.created, stats.existing, stats.resolved
        ))?;
        info!(
            "Sweep of {range} done: {} alive, {} new, {} resolved",
            stats.alive, stats.created, stats.resolved
        );
        Ok(stats)
    }

    async fn sweep(
        &self,
        range: HostRange,
        stats: &mut RangeStats,
        handle: &mut RunHandle<'_>,
    ) -> anyhow::Result<()> {
        let total = range.len();
        let batch_size = self.config.batch_size.max(1);
        let mut probes = pin!(prober::probe_stream(
            self.pinger,
            range.to_iter(),
            self.config.probe_concurrency,
        ));

        let mut checked: u128 = 0;
        let mut batch: Vec<IpAddr> = Vec::with_capacity(batch_size);
        while let Some((addr, alive)) = probes.next().await {
            checked += 1;
            if alive {
                debug!("{addr} is alive");
                batch.push(addr);
            }
            if batch.len() >= batch_size || checked == total {
                self.reconcile_batch(&mut batch, stats, handle.run_id()).await?;
                handle.append_and_persist(format!(
                    "Scanned {checked}/{total} hosts, found {} alive...",
                    stats.alive
                ))?;
            }
        }
        Ok(())
    }

    async fn reconcile_batch(
        &self,
        batch: &mut Vec<IpAddr>,
        stats: &mut RangeStats,
        run_id: u64,
    ) -> anyhow::Result<()> {
        batch.sort();
        let mut names =
            resolver::resolve_all(self.resolver, batch, self.config.resolve_concurrency).await;
        for addr in batch.drain(..) {
            let name = names.remove(&addr).flatten();
            self.reconcile(addr, name, false, stats, run_id)?;
        }
        Ok(())
    }

    /// No network I/O: a random sample of the range stands in for the live
    /// hosts, each with a synthesized name.
    fn simulate(
        &self,
        range: HostRange,
        stats: &mut RangeStats,
        handle: &mut RunHandle<'_>,
    ) -> anyhow::Result<()> {
        let population = usize::try_from(range.len())?;
        let amount = self.config.simulate_sample.min(population);
        let mut rng = match self.config.simulate_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut picked: Vec<IpAddr> = rand::seq::index::sample(&mut rng, population, amount)
            .into_iter()
            .filter_map(|n| range.nth_host(n as u128))
            .collect();
        picked.sort();

        for addr in picked {
            let name = synthesized_name(addr);
            self.reconcile(addr, Some(name), true, stats, handle.run_id())?;
        }
        handle.append_and_persist("Simulated scan complete.")?;
        Ok(())
    }

    fn reconcile(
        &self,
        addr: IpAddr,
        name: Option<String>,
        simulated: bool,
        stats: &mut RangeStats,
        run_id: u64,
    ) -> anyhow::Result<()> {
        let mut defaults = AddressRecord::new(addr);
        let description = if simulated { SIMULATED_DESCRIPTION } else { DESCRIPTION };
        defaults.description = description.to_string();

        let (mut record, created) = self.inventory.get_or_create_address(defaults)?;
        stats.alive += 1;
        let (kind, summary) = match (created, simulated) {
            (true, false) => (FindingKind::NewHost, "New IP discovered"),
            (true, true) => (FindingKind::NewHost, "New IP discovered (simulated)"),
            (false, false) => (FindingKind::ExistingHost, "Existing IP seen"),
            (false, true) => (FindingKind::ExistingHost, "Existing IP seen (simulated)"),
        };
        if created {
            stats.created += 1;
        } else {
            stats.existing += 1;
        }

        if let Some(name) = &name {
            record.dns_name = Some(name.clone());
            stats.resolved += 1;
        }
        self.inventory.save_address(&record)?;

        self.findings.record(Finding::new(
            run_id,
            kind,
            summary,
            json!({ "ip": addr.to_string(), "dns_name": name }),
        ))
    }
}

/// `10.0.0.7` becomes `host-10-0-0-7.local`.
pub fn synthesized_name(addr: IpAddr) -> String {
    format!("host-{}.local", addr.to_string().replace(['.', ':'], "-"))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
