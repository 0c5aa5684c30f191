use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use async_trait::async_trait;
use autodisco_common::config::ScanConfig;
use autodisco_common::network::target::ScannerDefinition;
use autodisco_common::run::{RunStatus, ScanRun};
use autodisco_core::controller::RunController;
use autodisco_core::network::snmp::{RowIndex, SnmpClient, Table};
use autodisco_core::scanner::prober::Pinger;
use autodisco_core::scanner::resolver::NameResolver;
use autodisco_core::store::{MemoryFindings, MemoryInventory, MemoryRunStore};
use autodisco_protocols::oid::Oid;
use autodisco_protocols::snmp::SnmpValue;

pub fn ip(text: &str) -> IpAddr {
    text.parse().unwrap()
}

/// Answers for a fixed set of live addresses and counts every probe.
#[derive(Default)]
pub struct FakePinger {
    alive: HashSet<IpAddr>,
    probes: AtomicUsize,
}

impl FakePinger {
    pub fn alive(addrs: &[&str]) -> Self {
        Self {
            alive: addrs.iter().map(|a| ip(a)).collect(),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Pinger for FakePinger {
    async fn is_alive(&self, addr: IpAddr) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.alive.contains(&addr)
    }
}

#[derive(Default)]
pub struct FakeResolver {
    names: HashMap<IpAddr, String>,
}

impl FakeResolver {
    pub fn with(names: &[(&str, &str)]) -> Self {
        Self {
            names: names
                .iter()
                .map(|(addr, name)| (ip(addr), name.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl NameResolver for FakeResolver {
    async fn reverse(&self, addr: IpAddr) -> Option<String> {
        self.names.get(&addr).cloned()
    }
}

pub fn text(s: &str) -> SnmpValue {
    SnmpValue::OctetString(s.as_bytes().to_vec())
}

/// A switch agent served from maps keyed by OID text. OIDs listed as
/// failing return an error, as a dead or unresolvable host would.
#[derive(Default)]
pub struct FakeSnmpClient {
    scalars: HashMap<String, SnmpValue>,
    columns: HashMap<String, Table>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeSnmpClient {
    pub fn scalar(mut self, oid: &str, value: SnmpValue) -> Self {
        self.scalars.insert(oid.to_string(), value);
        self
    }

    pub fn column(mut self, oid: &str, rows: Vec<(u32, SnmpValue)>) -> Self {
        let table = rows
            .into_iter()
            .map(|(index, value)| (RowIndex::new(index), value))
            .collect();
        self.columns.insert(oid.to_string(), table);
        self
    }

    pub fn failing(mut self, oid: &str) -> Self {
        self.failing.insert(oid.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn walks(&self) -> usize {
        self.calls().iter().filter(|c| c.starts_with("walk")).count()
    }

    fn record(&self, op: &str, oid: &Oid) -> anyhow::Result<String> {
        let key = oid.to_string();
        self.calls.lock().unwrap().push(format!("{op} {key}"));
        if self.failing.contains(&key) {
            bail!("request for {key} timed out");
        }
        Ok(key)
    }
}

#[async_trait]
impl SnmpClient for FakeSnmpClient {
    async fn get(&self, _host: &str, _community: &str, oid: &Oid) -> anyhow::Result<Option<SnmpValue>> {
        let key = self.record("get", oid)?;
        Ok(self.scalars.get(&key).cloned())
    }

    async fn walk(&self, _host: &str, _community: &str, prefix: &Oid) -> anyhow::Result<Table> {
        let key = self.record("walk", prefix)?;
        Ok(self.columns.get(&key).cloned().unwrap_or_default())
    }
}

/// A controller plus the collaborators it writes to.
pub struct Harness {
    pub inventory: Arc<MemoryInventory>,
    pub findings: Arc<MemoryFindings>,
    pub store: Arc<MemoryRunStore>,
    pub pinger: Arc<FakePinger>,
    pub snmp: Arc<FakeSnmpClient>,
    controller: RunController,
}

impl Harness {
    pub fn new(pinger: FakePinger, resolver: FakeResolver, snmp: FakeSnmpClient) -> Self {
        Self::with_config(ScanConfig::default(), pinger, resolver, snmp)
    }

    pub fn with_config(
        config: ScanConfig,
        pinger: FakePinger,
        resolver: FakeResolver,
        snmp: FakeSnmpClient,
    ) -> Self {
        let inventory = Arc::new(MemoryInventory::default());
        let findings = Arc::new(MemoryFindings::default());
        let store = Arc::new(MemoryRunStore::default());
        let pinger = Arc::new(pinger);
        let snmp = Arc::new(snmp);
        let controller = RunController::new(config, inventory.clone(), findings.clone(), store.clone())
            .with_pinger(pinger.clone())
            .with_resolver(Arc::new(resolver))
            .with_snmp_client(snmp.clone());
        Self {
            inventory,
            findings,
            store,
            pinger,
            snmp,
            controller,
        }
    }

    pub fn pinging(pinger: FakePinger, resolver: FakeResolver) -> Self {
        Self::new(pinger, resolver, FakeSnmpClient::default())
    }

    pub fn switch(snmp: FakeSnmpClient) -> Self {
        Self::new(FakePinger::default(), FakeResolver::default(), snmp)
    }

    pub async fn run(&self, id: u64, definition: &ScannerDefinition) -> ScanRun {
        let mut run = ScanRun::new(id, definition.name.clone());
        self.execute(definition, &mut run).await;
        run
    }

    pub async fn execute(&self, definition: &ScannerDefinition, run: &mut ScanRun) -> RunStatus {
        self.controller.execute(definition, run).await
    }
}
