//! In-memory collaborators: inventory, finding sink and run store.
//!
//! Used by the CLI (optionally round-tripped through a JSON snapshot) and by
//! tests. Every operation takes the lock for its whole duration, so repeated
//! upserts of the same key never produce duplicates.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use autodisco_common::finding::{Finding, FindingKind, FindingSink};
use autodisco_common::inventory::{AddressRecord, DeviceRecord, Inventory, InterfaceRecord, VlanRecord};
use autodisco_common::run::{RunStore, ScanRun};
use serde::{Deserialize, Serialize};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serialisable form of the whole inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default)]
    pub addresses: Vec<AddressRecord>,
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceRecord>,
    #[serde(default)]
    pub vlans: Vec<VlanRecord>,
}

#[derive(Debug, Default)]
struct InventoryState {
    addresses: BTreeMap<IpAddr, AddressRecord>,
    devices: BTreeMap<String, DeviceRecord>,
    interfaces: BTreeMap<(String, String), InterfaceRecord>,
    vlans: BTreeMap<u16, VlanRecord>,
}

fn interface_key(device: &str, name: &str) -> (String, String) {
    (device.to_string(), name.to_string())
}

#[derive(Debug, Default)]
pub struct MemoryInventory {
    state: Mutex<InventoryState>,
}

impl MemoryInventory {
    pub fn from_snapshot(snapshot: InventorySnapshot) -> Self {
        let state = InventoryState {
            addresses: snapshot
                .addresses
                .into_iter()
                .map(|record| (record.address, record))
                .collect(),
            devices: snapshot
                .devices
                .into_iter()
                .map(|record| (record.name.clone(), record))
                .collect(),
            interfaces: snapshot
                .interfaces
                .into_iter()
                .map(|record| (interface_key(&record.device, &record.name), record))
                .collect(),
            vlans: snapshot
                .vlans
                .into_iter()
                .map(|record| (record.vid, record))
                .collect(),
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn snapshot(&self) -> InventorySnapshot {
        let state = lock(&self.state);
        InventorySnapshot {
            addresses: state.addresses.values().cloned().collect(),
            devices: state.devices.values().cloned().collect(),
            interfaces: state.interfaces.values().cloned().collect(),
            vlans: state.vlans.values().cloned().collect(),
        }
    }

    pub fn address(&self, address: IpAddr) -> Option<AddressRecord> {
        lock(&self.state).addresses.get(&address).cloned()
    }

    pub fn addresses(&self) -> Vec<AddressRecord> {
        lock(&self.state).addresses.values().cloned().collect()
    }

    pub fn devices(&self) -> Vec<DeviceRecord> {
        lock(&self.state).devices.values().cloned().collect()
    }

    pub fn interfaces(&self) -> Vec<InterfaceRecord> {
        lock(&self.state).interfaces.values().cloned().collect()
    }

    pub fn vlans(&self) -> Vec<VlanRecord> {
        lock(&self.state).vlans.values().cloned().collect()
    }
}

impl Inventory for MemoryInventory {
    fn get_or_create_address(&self, defaults: AddressRecord) -> anyhow::Result<(AddressRecord, bool)> {
        let mut state = lock(&self.state);
        if let Some(existing) = state.addresses.get(&defaults.address) {
            return Ok((existing.clone(), false));
        }
        state.addresses.insert(defaults.address, defaults.clone());
        Ok((defaults, true))
    }

    fn save_address(&self, record: &AddressRecord) -> anyhow::Result<()> {
        lock(&self.state).addresses.insert(record.address, record.clone());
        Ok(())
    }

    fn get_or_create_device(&self, defaults: DeviceRecord) -> anyhow::Result<(DeviceRecord, bool)> {
        let mut state = lock(&self.state);
        if let Some(existing) = state.devices.get(&defaults.name) {
            return Ok((existing.clone(), false));
        }
        state.devices.insert(defaults.name.clone(), defaults.clone());
        Ok((defaults, true))
    }

    fn save_device(&self, record: &DeviceRecord) -> anyhow::Result<()> {
        lock(&self.state).devices.insert(record.name.clone(), record.clone());
        Ok(())
    }

    fn get_or_create_interface(
        &self,
        defaults: InterfaceRecord,
    ) -> anyhow::Result<(InterfaceRecord, bool)> {
        let key = interface_key(&defaults.device, &defaults.name);
        let mut state = lock(&self.state);
        if let Some(existing) = state.interfaces.get(&key) {
            return Ok((existing.clone(), false));
        }
        state.interfaces.insert(key, defaults.clone());
        Ok((defaults, true))
    }

    fn interface(&self, device: &str, name: &str) -> anyhow::Result<Option<InterfaceRecord>> {
        Ok(lock(&self.state)
            .interfaces
            .get(&interface_key(device, name))
            .cloned())
    }

    fn save_interface(&self, record: &InterfaceRecord) -> anyhow::Result<()> {
        lock(&self.state)
            .interfaces
            .insert(interface_key(&record.device, &record.name), record.clone());
        Ok(())
    }

    fn get_or_create_vlan(&self, defaults: VlanRecord) -> anyhow::Result<(VlanRecord, bool)> {
        let mut state = lock(&self.state);
        if let Some(existing) = state.vlans.get(&defaults.vid) {
            return Ok((existing.clone(), false));
        }
        state.vlans.insert(defaults.vid, defaults.clone());
        Ok((defaults, true))
    }

    fn vlan(&self, vid: u16) -> anyhow::Result<Option<VlanRecord>> {
        Ok(lock(&self.state).vlans.get(&vid).cloned())
    }

    fn vlan_ids(&self) -> anyhow::Result<BTreeSet<u16>> {
        Ok(lock(&self.state).vlans.keys().copied().collect())
    }

    fn save_vlan(&self, record: &VlanRecord) -> anyhow::Result<()> {
        lock(&self.state).vlans.insert(record.vid, record.clone());
        Ok(())
    }
}

/// Keeps findings in arrival order.
#[derive(Debug, Default)]
pub struct MemoryFindings {
    findings: Mutex<Vec<Finding>>,
}

impl MemoryFindings {
    pub fn all(&self) -> Vec<Finding> {
        lock(&self.findings).clone()
    }

    pub fn for_run(&self, run_id: u64) -> Vec<Finding> {
        lock(&self.findings)
            .iter()
            .filter(|finding| finding.run_id == run_id)
            .cloned()
            .collect()
    }

    pub fn count(&self, kind: FindingKind) -> usize {
        lock(&self.findings)
            .iter()
            .filter(|finding| finding.kind == kind)
            .count()
    }

    pub fn len(&self) -> usize {
        lock(&self.findings).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.findings).is_empty()
    }
}

impl FindingSink for MemoryFindings {
    fn record(&self, finding: Finding) -> anyhow::Result<()> {
        lock(&self.findings).push(finding);
        Ok(())
    }
}

/// Records every persisted snapshot, which makes progressive writes
/// observable.
#[derive(Debug, Default)]
pub struct MemoryRunStore {
    snapshots: Mutex<Vec<ScanRun>>,
}

impl MemoryRunStore {
    pub fn snapshots(&self) -> Vec<ScanRun> {
        lock(&self.snapshots).clone()
    }

    pub fn latest(&self) -> Option<ScanRun> {
        lock(&self.snapshots).last().cloned()
    }
}

impl RunStore for MemoryRunStore {
    fn persist(&self, run: &ScanRun) -> anyhow::Result<()> {
        lock(&self.snapshots).push(run.clone());
        Ok(())
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
