//! Inventory records and the upsert-by-natural-key contract the engine
//! reconciles against.
//!
//! Keys:
//! * address record: the host address
//! * device: its name
//! * interface: device name + interface name
//! * VLAN: numeric id
//!
//! `get_or_create_*` looks a record up by the key carried in `defaults` and
//! inserts `defaults` when absent, reporting whether it did. `save_*` writes a
//! record back by key, replacing mutable fields (last writer wins).

use std::collections::BTreeSet;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub address: IpAddr,
    pub dns_name: Option<String>,
    pub description: String,
}

impl AddressRecord {
    pub fn new(address: IpAddr) -> Self {
        Self {
            address,
            dns_name: None,
            description: String::new(),
        }
    }

    /// The address with its host prefix, e.g. `10.0.0.1/32`.
    pub fn cidr(&self) -> String {
        let prefix = if self.address.is_ipv4() { 32 } else { 128 };
        format!("{}/{prefix}", self.address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub role: String,
    pub serial: Option<String>,
    pub comments: String,
}

impl DeviceRecord {
    pub fn new(
        name: impl Into<String>,
        manufacturer: impl Into<String>,
        model: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            manufacturer: manufacturer.into(),
            model: model.into(),
            role: role.into(),
            serial: None,
            comments: String::new(),
        }
    }

    /// Adds a comment line unless an identical one is already present.
    pub fn note(&mut self, line: &str) {
        if self.comments.lines().any(|existing| existing == line) {
            return;
        }
        if !self.comments.is_empty() {
            self.comments.push('\n');
        }
        self.comments.push_str(line);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterfaceType {
    #[serde(rename = "1000base-t")]
    Base1000T,
    #[default]
    #[serde(rename = "other")]
    Other,
}

impl InterfaceType {
    pub fn label(self) -> &'static str {
        match self {
            InterfaceType::Base1000T => "1000base-t",
            InterfaceType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceMode {
    /// One untagged VLAN.
    Access,
    /// A set of tagged VLANs.
    Tagged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    pub device: String,
    pub name: String,
    pub kind: InterfaceType,
    pub enabled: bool,
    pub mode: Option<InterfaceMode>,
    pub untagged_vlan: Option<u16>,
    pub tagged_vlans: BTreeSet<u16>,
}

impl InterfaceRecord {
    pub fn new(device: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            name: name.into(),
            kind: InterfaceType::Other,
            enabled: true,
            mode: None,
            untagged_vlan: None,
            tagged_vlans: BTreeSet::new(),
        }
    }

    pub fn set_access(&mut self, vid: u16) {
        self.mode = Some(InterfaceMode::Access);
        self.untagged_vlan = Some(vid);
    }

    pub fn set_tagged(&mut self, vids: BTreeSet<u16>) {
        self.mode = Some(InterfaceMode::Tagged);
        self.tagged_vlans = vids;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanRecord {
    pub vid: u16,
    pub name: String,
}

impl VlanRecord {
    pub fn new(vid: u16, name: impl Into<String>) -> Self {
        Self {
            vid,
            name: name.into(),
        }
    }
}

pub trait Inventory: Send + Sync {
    fn get_or_create_address(&self, defaults: AddressRecord) -> anyhow::Result<(AddressRecord, bool)>;
    fn save_address(&self, record: &AddressRecord) -> anyhow::Result<()>;

    fn get_or_create_device(&self, defaults: DeviceRecord) -> anyhow::Result<(DeviceRecord, bool)>;
    fn save_device(&self, record: &DeviceRecord) -> anyhow::Result<()>;

    fn get_or_create_interface(
        &self,
        defaults: InterfaceRecord,
    ) -> anyhow::Result<(InterfaceRecord, bool)>;
    fn interface(&self, device: &str, name: &str) -> anyhow::Result<Option<InterfaceRecord>>;
    fn save_interface(&self, record: &InterfaceRecord) -> anyhow::Result<()>;

    fn get_or_create_vlan(&self, defaults: VlanRecord) -> anyhow::Result<(VlanRecord, bool)>;
    fn vlan(&self, vid: u16) -> anyhow::Result<Option<VlanRecord>>;
    /// Ids of every VLAN currently known.
    fn vlan_ids(&self) -> anyhow::Result<BTreeSet<u16>>;
    fn save_vlan(&self, record: &VlanRecord) -> anyhow::Result<()>;
}
