//! # Run Controller
//!
//! Owns the run state machine:
//!
//! ```text
//! Pending ──▶ Running ──▶ Success
//!                    └──▶ Failed
//! ```
//!
//! Whatever happens inside an orchestrator (an error, an invalid definition
//! or a panic) the run leaves [`execute`](RunController::execute) in a
//! terminal state with a finish timestamp, and that final state is persisted.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::anyhow;
use autodisco_common::config::ScanConfig;
use autodisco_common::error::ScanError;
use autodisco_common::finding::FindingSink;
use autodisco_common::inventory::Inventory;
use autodisco_common::network::target::{ScanRequest, ScanTarget, ScannerDefinition};
use autodisco_common::run::{RunHandle, RunStatus, RunStore, ScanRun};
use autodisco_common::stats::ScanStats;
use chrono::Utc;
use futures::FutureExt;
use tracing::{error, info, warn};

use crate::discovery::range::RangeScan;
use crate::discovery::switch::CiscoScan;
use crate::network::snmp::{SnmpClient, UdpSnmpClient};
use crate::scanner::prober::{IcmpPinger, Pinger};
use crate::scanner::resolver::{NameResolver, ReverseDnsResolver};

pub struct RunController {
    config: ScanConfig,
    inventory: Arc<dyn Inventory>,
    findings: Arc<dyn FindingSink>,
    store: Arc<dyn RunStore>,
    pinger: Arc<dyn Pinger>,
    resolver: Arc<dyn NameResolver>,
    snmp: Arc<dyn SnmpClient>,
}

impl RunController {
    /// A controller wired to the real network: ICMP, system resolver and
    /// SNMP over UDP, all tuned from `config`.
    pub fn new(
        config: ScanConfig,
        inventory: Arc<dyn Inventory>,
        findings: Arc<dyn FindingSink>,
        store: Arc<dyn RunStore>,
    ) -> Self {
        Self {
            pinger: Arc::new(IcmpPinger::new(config.probe_timeout)),
            resolver: Arc::new(ReverseDnsResolver),
            snmp: Arc::new(UdpSnmpClient::from_config(&config)),
            config,
            inventory,
            findings,
            store,
        }
    }

    pub fn with_pinger(mut self, pinger: Arc<dyn Pinger>) -> Self {
        self.pinger = pinger;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_snmp_client(mut self, snmp: Arc<dyn SnmpClient>) -> Self {
        self.snmp = snmp;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Runs `definition` against `run` and returns the terminal status.
    ///
    /// Only a `Pending` run is started; any other run is left untouched.
    pub async fn execute(&self, definition: &ScannerDefinition, run: &mut ScanRun) -> RunStatus {
        if run.status != RunStatus::Pending {
            warn!("Run {} is {}, not starting it again", run.id, run.status);
            return run.status;
        }

        run.status = RunStatus::Running;
        run.started = Some(Utc::now());
        self.persist(run);
        info!("Run {} ({}) started", run.id, definition.name);

        let outcome = match ScanRequest::from_definition(definition) {
            Ok(request) => self.guarded(&request, run).await,
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(stats) => {
                run.stats = Some(stats);
                run.status = RunStatus::Success;
            }
            Err(e) => {
                let line = match e.downcast_ref::<ScanError>() {
                    Some(unsupported @ ScanError::UnsupportedScanner(_)) => unsupported.to_string(),
                    _ => format!("Error: {e:#}"),
                };
                error!("Run {} failed: {e:#}", run.id);
                run.append_log(&line);
                run.status = RunStatus::Failed;
            }
        }

        run.finished = Some(Utc::now());
        self.persist(run);
        info!("Run {} finished: {}", run.id, run.status);
        run.status
    }

    /// Runs the orchestrator, turning a panic into an ordinary error.
    async fn guarded(&self, request: &ScanRequest, run: &mut ScanRun) -> anyhow::Result<ScanStats> {
        let mut handle = RunHandle::new(run, self.store.as_ref());
        AssertUnwindSafe(self.dispatch(request, &mut handle))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(anyhow!("scan aborted: {}", panic_message(payload.as_ref()))))
    }

    async fn dispatch(
        &self,
        request: &ScanRequest,
        handle: &mut RunHandle<'_>,
    ) -> anyhow::Result<ScanStats> {
        match &request.target {
            ScanTarget::Range { cidr } => {
                let scan = RangeScan::new(
                    self.pinger.as_ref(),
                    self.resolver.as_ref(),
                    self.inventory.as_ref(),
                    self.findings.as_ref(),
                    &self.config,
                );
                Ok(scan.run(cidr, request.simulate, handle).await?.into())
            }
            ScanTarget::Device { host, credential } => {
                let scan = CiscoScan::new(
                    self.snmp.as_ref(),
                    self.inventory.as_ref(),
                    self.findings.as_ref(),
                );
                Ok(scan.run(host, credential, request.simulate, handle).await?.into())
            }
        }
    }

    fn persist(&self, run: &ScanRun) {
        if let Err(e) = self.store.persist(run) {
            error!("Could not persist run {}: {e:#}", run.id);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("panic")
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
