use std::collections::BTreeSet;
use std::fmt;

use autodisco_common::finding::{Finding, FindingKind, FindingSink};
use autodisco_common::inventory::{DeviceRecord, Inventory, InterfaceRecord, VlanRecord};
use autodisco_common::run::RunHandle;
use autodisco_common::stats::SwitchStats;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::network::snmp::{SnmpClient, Table};
use crate::topology::{self, Identity, oids};

pub const SIMULATED_MODEL: &str = "Cisco 2960";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Identity,
    Interfaces,
    Vlans,
    Assignments,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Identity => "system info",
            Stage::Interfaces => "interface",
            Stage::Vlans => "VLAN",
            Stage::Assignments => "VLAN assignment",
        };
        f.write_str(label)
    }
}

/// A switch-scan stage that gave up. Only [`Stage::Identity`] ends the scan.
#[derive(Debug, Error)]
#[error("Failed {stage} discovery: {cause:#}")]
pub struct StageError {
    pub stage: Stage,
    cause: anyhow::Error,
}

impl StageError {
    pub fn new(stage: Stage, cause: anyhow::Error) -> Self {
        Self { stage, cause }
    }
}

trait InStage<T> {
    fn in_stage(self, stage: Stage) -> Result<T, StageError>;
}

impl<T> InStage<T> for anyhow::Result<T> {
    fn in_stage(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|cause| StageError::new(stage, cause))
    }
}

/// Walks one Cisco switch: identity, interfaces, VLANs, then VLAN
/// assignments, in that order.
pub struct CiscoScan<'a> {
    snmp: &'a dyn SnmpClient,
    inventory: &'a dyn Inventory,
    findings: &'a dyn FindingSink,
}

impl<'a> CiscoScan<'a> {
    pub fn new(
        snmp: &'a dyn SnmpClient,
        inventory: &'a dyn Inventory,
        findings: &'a dyn FindingSink,
    ) -> Self {
        Self {
            snmp,
            inventory,
            findings,
        }
    }

    pub async fn run(
        &self,
        host: &str,
        community: &str,
        simulate: bool,
        handle: &mut RunHandle<'_>,
    ) -> anyhow::Result<SwitchStats> {
        handle.append_and_persist(format!("Connecting to {host} via SNMP"))?;
        if simulate {
            return self.simulate(host, handle);
        }

        let mut stats = SwitchStats::default();
        let run_id = handle.run_id();

        let (identity, device) = match self.identify(host, community, run_id).await {
            Ok(found) => found,
            Err(e) => {
                warn!("{host}: {e}");
                handle.append_and_persist(e.to_string())?;
                return Ok(stats);
            }
        };
        handle.append_and_persist(format!("System name: {}", device.name))?;
        if let Some(description) = &identity.description {
            handle.append_and_persist(format!("System description: {description}"))?;
        }
        if let Some(serial) = &identity.serial {
            handle.append_and_persist(format!("Serial: {serial}"))?;
        }

        handle.append_and_persist("Walking SNMP for interfaces...")?;
        let mut if_names = Table::new();
        match self.interfaces(host, community, &device.name, &mut if_names, run_id).await {
            Ok(count) => {
                stats.interfaces = count;
                handle.append_and_persist(format!("Discovered {count} interfaces."))?;
            }
            Err(e) => self.report(handle, host, &e)?,
        }

        handle.append_and_persist("Walking SNMP for VLANs...")?;
        match self.vlans(host, community, run_id).await {
            Ok(count) => {
                stats.vlans = count;
                handle.append_and_persist(format!("Discovered {count} VLANs."))?;
            }
            Err(e) => self.report(handle, host, &e)?,
        }

        handle.append_and_persist("Walking SNMP for VLAN assignments...")?;
        match self.assignments(host, community, &device.name, if_names).await {
            Ok(count) => {
                stats.assignments = count;
                handle.append_and_persist(format!("Assigned VLANs on {count} interfaces."))?;
            }
            Err(e) => self.report(handle, host, &e)?,
        }

        info!(
            "{}: {} interfaces, {} VLANs, {} assignments",
            device.name, stats.interfaces, stats.vlans, stats.assignments
        );
        Ok(stats)
    }

    fn report(&self, handle: &mut RunHandle<'_>, host: &str, e: &StageError) -> anyhow::Result<()> {
        warn!("{host}: {e}");
        handle.append_and_persist(e.to_string())
    }

    async fn identify(
        &self,
        host: &str,
        community: &str,
        run_id: u64,
    ) -> Result<(Identity, DeviceRecord), StageError> {
        let stage = Stage::Identity;
        let name = self
            .snmp
            .get(host, community, &topology::oid(oids::SYS_NAME).in_stage(stage)?)
            .await
            .in_stage(stage)?;
        let description = self
            .snmp
            .get(host, community, &topology::oid(oids::SYS_DESCR).in_stage(stage)?)
            .await
            .in_stage(stage)?;
        let serial = self
            .snmp
            .get(host, community, &topology::oid(oids::CHASSIS_SERIAL).in_stage(stage)?)
            .await
            .in_stage(stage)?;

        let identity = Identity::from_values(name, description, serial);
        let device = topology::apply_identity(self.inventory, self.findings, run_id, host, &identity)
            .in_stage(stage)?;
        Ok((identity, device))
    }

    async fn walk(&self, host: &str, community: &str, column: &str) -> anyhow::Result<Table> {
        self.snmp.walk(host, community, &topology::oid(column)?).await
    }

    /// Fills `if_names` as soon as the name column is in, so later stages
    /// can join on it even if the rest of this stage fails.
    async fn interfaces(
        &self,
        host: &str,
        community: &str,
        device: &str,
        if_names: &mut Table,
        run_id: u64,
    ) -> Result<usize, StageError> {
        let stage = Stage::Interfaces;
        *if_names = self.walk(host, community, oids::IF_NAME).await.in_stage(stage)?;
        let types = self.walk(host, community, oids::IF_TYPE).await.in_stage(stage)?;
        let admin = self.walk(host, community, oids::IF_ADMIN_STATUS).await.in_stage(stage)?;

        let applied =
            topology::apply_interfaces(self.inventory, device, if_names, &types, &admin).in_stage(stage)?;
        let count = applied.len();
        if count > 0 {
            self.findings
                .record(Finding::new(
                    run_id,
                    FindingKind::InterfacesDiscovered,
                    "Interfaces discovered",
                    json!({ "device": device, "interfaces": applied }),
                ))
                .in_stage(stage)?;
        }
        Ok(count)
    }

    async fn vlans(&self, host: &str, community: &str, run_id: u64) -> Result<usize, StageError> {
        let stage = Stage::Vlans;
        let ids = self.walk(host, community, oids::VTP_VLAN_ID).await.in_stage(stage)?;
        let names = self.walk(host, community, oids::VTP_VLAN_NAME).await.in_stage(stage)?;

        let applied = topology::apply_vlans(self.inventory, self.findings, run_id, &ids, &names)
            .in_stage(stage)?;
        Ok(applied.len())
    }

    async fn assignments(
        &self,
        host: &str,
        community: &str,
        device: &str,
        mut if_names: Table,
    ) -> Result<usize, StageError> {
        let stage = Stage::Assignments;
        if if_names.is_empty() {
            if_names = self.walk(host, community, oids::IF_NAME).await.in_stage(stage)?;
        }
        let access = self.walk(host, community, oids::ACCESS_VLAN).await.in_stage(stage)?;
        let trunks = self.walk(host, community, oids::TRUNK_VLANS).await.in_stage(stage)?;

        let access_ports =
            topology::apply_access_ports(self.inventory, device, &if_names, &access).in_stage(stage)?;
        let trunk_ports =
            topology::apply_trunk_ports(self.inventory, device, &if_names, &trunks).in_stage(stage)?;
        Ok(access_ports + trunk_ports)
    }

    /// Canned topology: two ports, VLAN 10 and 20, one access and one trunk
    /// assignment. Touches no network.
    fn simulate(&self, host: &str, handle: &mut RunHandle<'_>) -> anyhow::Result<SwitchStats> {
        let run_id = handle.run_id();
        let (device, created) = self.inventory.get_or_create_device(DeviceRecord::new(
            host,
            topology::MANUFACTURER,
            SIMULATED_MODEL,
            topology::ROLE,
        ))?;

        let mut ports = Vec::with_capacity(2);
        for name in ["Gig0/1", "Gig0/2"] {
            let (iface, _) = self
                .inventory
                .get_or_create_interface(InterfaceRecord::new(&device.name, name))?;
            ports.push(iface);
        }
        let mut vlans = Vec::with_capacity(2);
        for (vid, name) in [(10, "Users"), (20, "Servers")] {
            let (vlan, _) = self.inventory.get_or_create_vlan(VlanRecord::new(vid, name))?;
            vlans.push(vlan.vid);
        }

        if let [access, trunk] = ports.as_mut_slice() {
            access.set_access(10);
            self.inventory.save_interface(access)?;
            trunk.set_tagged(BTreeSet::from([10, 20]));
            self.inventory.save_interface(trunk)?;
        }

        let kind = if created {
            FindingKind::NewDevice
        } else {
            FindingKind::UpdatedDevice
        };
        self.findings.record(Finding::new(
            run_id,
            kind,
            "Simulated Cisco device discovered",
            json!({ "device": device.name }),
        ))?;
        let names: Vec<&str> = ports.iter().map(|iface| iface.name.as_str()).collect();
        self.findings.record(Finding::new(
            run_id,
            FindingKind::InterfacesDiscovered,
            "Interfaces discovered",
            json!({ "device": device.name, "interfaces": names }),
        ))?;
        self.findings.record(Finding::new(
            run_id,
            FindingKind::VlansDiscovered,
            "VLANs discovered",
            json!({ "vlans": vlans }),
        ))?;

        handle.append_and_persist(
            "Simulated Cisco scan complete. Created device, interfaces, VLANs, and assignments.",
        )?;
        Ok(SwitchStats {
            interfaces: ports.len(),
            vlans: vlans.len(),
            assignments: 2,
        })
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
