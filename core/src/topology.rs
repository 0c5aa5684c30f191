//! # Switch Topology Decoder
//!
//! Turns raw SNMP columns from a Cisco switch into inventory facts. Columns
//! are joined purely by [`RowIndex`]: a row missing from one column simply
//! contributes nothing for that attribute.
//!
//! Trunk membership is read from a 32-bit mask where bit `n` stands for every
//! VLAN id `v` with `v % 32 == n`. The aliasing is how the device reports
//! membership and is kept as-is: a mask with bit 2 set matches VLAN 2, 34,
//! 66 and so on, as long as the VLAN is known to the inventory.

use std::collections::BTreeSet;

use anyhow::Context;
use autodisco_common::finding::{Finding, FindingKind, FindingSink};
use autodisco_common::inventory::{DeviceRecord, Inventory, InterfaceRecord, InterfaceType, VlanRecord};
use autodisco_protocols::oid::Oid;
use autodisco_protocols::snmp::SnmpValue;
use serde_json::json;
use tracing::debug;

use crate::network::snmp::{RowIndex, Table};

pub mod oids {
    pub const SYS_DESCR: &str = "1.3.6.1.2.1.1.1.0";
    pub const SYS_NAME: &str = "1.3.6.1.2.1.1.5.0";
    /// `chassisId` in the old Cisco chassis MIB.
    pub const CHASSIS_SERIAL: &str = "1.3.6.1.4.1.9.3.6.3";

    pub const IF_NAME: &str = "1.3.6.1.2.1.31.1.1.1.1";
    pub const IF_TYPE: &str = "1.3.6.1.2.1.2.2.1.3";
    pub const IF_ADMIN_STATUS: &str = "1.3.6.1.2.1.2.2.1.7";

    /// vtpVlanState, walked for its values as VLAN ids.
    pub const VTP_VLAN_ID: &str = "1.3.6.1.4.1.9.9.46.1.3.1.1.1";
    pub const VTP_VLAN_NAME: &str = "1.3.6.1.4.1.9.9.46.1.3.1.1.4";

    /// vmVlan: access VLAN per port.
    pub const ACCESS_VLAN: &str = "1.3.6.1.4.1.9.9.68.1.2.2.1.2";
    /// vlanTrunkPortVlansEnabled.
    pub const TRUNK_VLANS: &str = "1.3.6.1.4.1.9.9.46.1.6.1.1.4";
}

pub const MANUFACTURER: &str = "Cisco";
pub const GENERIC_MODEL: &str = "Generic Cisco Switch";
pub const ROLE: &str = "Switch";

/// ifType `ethernetCsmacd`.
pub const ETHERNET_CSMACD: u64 = 6;
/// ifAdminStatus `up`.
pub const ADMIN_UP: u64 = 1;

const VLAN_ID_MAX: u16 = 4094;

pub fn oid(text: &str) -> anyhow::Result<Oid> {
    text.parse().with_context(|| format!("bad OID {text}"))
}

pub fn interface_type(value: Option<&SnmpValue>) -> InterfaceType {
    match value.and_then(SnmpValue::as_u64) {
        Some(ETHERNET_CSMACD) => InterfaceType::Base1000T,
        _ => InterfaceType::Other,
    }
}

pub fn is_admin_up(value: Option<&SnmpValue>) -> bool {
    value.and_then(SnmpValue::as_u64) == Some(ADMIN_UP)
}

/// A usable VLAN id (1..=4094), `None` for anything else.
pub fn parse_vlan_id(value: &SnmpValue) -> Option<u16> {
    let id = u16::try_from(value.as_u64()?).ok()?;
    (1..=VLAN_ID_MAX).contains(&id).then_some(id)
}

/// Low 32 bits of a trunk membership value.
pub fn trunk_mask(value: &SnmpValue) -> Option<u32> {
    value.as_u64().map(|mask| (mask & u64::from(u32::MAX)) as u32)
}

/// VLANs in `known` whose id aliases onto a bit set in `mask`.
pub fn trunk_members(mask: u32, known: &BTreeSet<u16>) -> BTreeSet<u16> {
    (1..=VLAN_ID_MAX)
        .filter(|vid| mask & (1 << (vid % 32)) != 0)
        .filter(|vid| known.contains(vid))
        .collect()
}

fn text(value: &SnmpValue) -> Option<String> {
    let rendered = value.to_string();
    let trimmed = rendered.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// What the identity queries returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub name: Option<String>,
    pub description: Option<String>,
    pub serial: Option<String>,
}

impl Identity {
    pub fn from_values(
        name: Option<SnmpValue>,
        description: Option<SnmpValue>,
        serial: Option<SnmpValue>,
    ) -> Self {
        Self {
            name: name.as_ref().and_then(text),
            description: description.as_ref().and_then(text),
            serial: serial.as_ref().and_then(text),
        }
    }
}

/// Upserts the device, named by `sysName` or else the queried host.
pub fn apply_identity(
    inventory: &dyn Inventory,
    findings: &dyn FindingSink,
    run_id: u64,
    host: &str,
    identity: &Identity,
) -> anyhow::Result<DeviceRecord> {
    let name = identity.name.as_deref().unwrap_or(host);
    let (mut device, created) =
        inventory.get_or_create_device(DeviceRecord::new(name, MANUFACTURER, GENERIC_MODEL, ROLE))?;

    if let Some(description) = &identity.description {
        device.note(&format!("Discovered: {description}"));
    }
    if let Some(serial) = &identity.serial {
        device.serial = Some(serial.clone());
    }
    inventory.save_device(&device)?;

    let (kind, summary) = if created {
        (FindingKind::NewDevice, "New Cisco device discovered")
    } else {
        (FindingKind::UpdatedDevice, "Cisco device updated")
    };
    findings.record(Finding::new(
        run_id,
        kind,
        summary,
        json!({ "hostname": device.name, "serial": device.serial }),
    ))?;

    Ok(device)
}

/// Upserts one interface per `ifName` row. Returns the names applied, in
/// row order.
pub fn apply_interfaces(
    inventory: &dyn Inventory,
    device: &str,
    names: &Table,
    types: &Table,
    admin: &Table,
) -> anyhow::Result<Vec<String>> {
    let mut applied = Vec::with_capacity(names.len());
    for (index, value) in names {
        let Some(name) = text(value) else {
            debug!("{device}: interface row {index} has no name");
            continue;
        };
        let (mut iface, _) = inventory.get_or_create_interface(InterfaceRecord::new(device, &name))?;
        iface.kind = interface_type(types.get(index));
        iface.enabled = is_admin_up(admin.get(index));
        inventory.save_interface(&iface)?;
        applied.push(name);
    }
    Ok(applied)
}

/// Upserts every VLAN with a readable id. Returns the VLANs applied.
pub fn apply_vlans(
    inventory: &dyn Inventory,
    findings: &dyn FindingSink,
    run_id: u64,
    ids: &Table,
    names: &Table,
) -> anyhow::Result<Vec<VlanRecord>> {
    let mut applied = Vec::with_capacity(ids.len());
    for (index, value) in ids {
        let Some(vid) = parse_vlan_id(value) else {
            debug!("skipping VLAN row {index}: {value} is not a VLAN id");
            continue;
        };
        let name = names
            .get(index)
            .and_then(text)
            .unwrap_or_else(|| format!("VLAN{vid}"));

        let (mut vlan, _) = inventory.get_or_create_vlan(VlanRecord::new(vid, &name))?;
        if vlan.name != name {
            vlan.name = name;
            inventory.save_vlan(&vlan)?;
        }
        findings.record(Finding::new(
            run_id,
            FindingKind::VlanDiscovered,
            "VLAN discovered",
            json!({ "vid": vlan.vid, "name": vlan.name }),
        ))?;
        applied.push(vlan);
    }
    Ok(applied)
}

fn port_interface(
    inventory: &dyn Inventory,
    device: &str,
    if_names: &Table,
    index: &RowIndex,
) -> anyhow::Result<Option<InterfaceRecord>> {
    match if_names.get(index).and_then(text) {
        Some(name) => inventory.interface(device, &name),
        None => Ok(None),
    }
}

/// Access ports: one untagged VLAN each. Returns the number of interfaces
/// changed.
pub fn apply_access_ports(
    inventory: &dyn Inventory,
    device: &str,
    if_names: &Table,
    access: &Table,
) -> anyhow::Result<usize> {
    let mut assigned = 0;
    for (index, value) in access {
        let Some(vid) = parse_vlan_id(value) else {
            continue;
        };
        if inventory.vlan(vid)?.is_none() {
            continue;
        }
        let Some(mut iface) = port_interface(inventory, device, if_names, index)? else {
            continue;
        };
        iface.set_access(vid);
        inventory.save_interface(&iface)?;
        assigned += 1;
    }
    Ok(assigned)
}

/// Trunk ports: every known VLAN aliasing onto the port's mask. Ports whose
/// mask is unreadable or matches nothing are left alone.
pub fn apply_trunk_ports(
    inventory: &dyn Inventory,
    device: &str,
    if_names: &Table,
    trunks: &Table,
) -> anyhow::Result<usize> {
    let known = inventory.vlan_ids()?;
    let mut assigned = 0;
    for (index, value) in trunks {
        let Some(mut iface) = port_interface(inventory, device, if_names, index)? else {
            continue;
        };
        let Some(mask) = trunk_mask(value) else {
            debug!("{device}: unreadable trunk mask on {}", iface.name);
            continue;
        };
        let members = trunk_members(mask, &known);
        if members.is_empty() {
            continue;
        }
        iface.set_tagged(members);
        inventory.save_interface(&iface)?;
        assigned += 1;
    }
    Ok(assigned)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryFindings, MemoryInventory};
    use autodisco_common::inventory::InterfaceMode;

    fn text_value(s: &str) -> SnmpValue {
        SnmpValue::OctetString(s.as_bytes().to_vec())
    }

    fn table(rows: &[(u32, SnmpValue)]) -> Table {
        rows.iter()
            .map(|(index, value)| (RowIndex::new(*index), value.clone()))
            .collect()
    }

    #[test]
    fn trunk_bits_alias_modulo_32() {
        let known = BTreeSet::from([1, 2, 3, 32, 34]);
        let members = trunk_members(0b101, &known);
        assert_eq!(members, BTreeSet::from([2, 32, 34]));
    }

    #[test]
    fn trunk_mask_reads_numbers_and_decimal_text() {
        assert_eq!(trunk_mask(&SnmpValue::Integer(5)), Some(5));
        assert_eq!(trunk_mask(&text_value(" 5 ")), Some(5));
        assert_eq!(trunk_mask(&SnmpValue::Counter64(0x1_0000_0004)), Some(4));
        assert_eq!(trunk_mask(&SnmpValue::OctetString(vec![0xff, 0x00])), None);
    }

    #[test]
    fn vlan_ids_must_be_in_range() {
        assert_eq!(parse_vlan_id(&SnmpValue::Integer(10)), Some(10));
        assert_eq!(parse_vlan_id(&text_value("20")), Some(20));
        assert_eq!(parse_vlan_id(&SnmpValue::Integer(0)), None);
        assert_eq!(parse_vlan_id(&SnmpValue::Integer(4095)), None);
        assert_eq!(parse_vlan_id(&text_value("abc")), None);
    }

    #[test]
    fn interface_attributes() {
        assert_eq!(interface_type(Some(&SnmpValue::Integer(6))), InterfaceType::Base1000T);
        assert_eq!(interface_type(Some(&SnmpValue::Integer(24))), InterfaceType::Other);
        assert_eq!(interface_type(None), InterfaceType::Other);
        assert!(is_admin_up(Some(&SnmpValue::Integer(1))));
        assert!(!is_admin_up(Some(&SnmpValue::Integer(2))));
        assert!(!is_admin_up(None));
    }

    #[test]
    fn interfaces_join_by_row_index() {
        let inventory = MemoryInventory::default();
        let names = table(&[(1, text_value("Gi0/1")), (2, text_value("Gi0/2"))]);
        let types = table(&[(1, SnmpValue::Integer(6))]);
        let admin = table(&[(2, SnmpValue::Integer(1))]);

        let applied = apply_interfaces(&inventory, "sw1", &names, &types, &admin).unwrap();
        assert_eq!(applied, vec!["Gi0/1", "Gi0/2"]);

        let first = inventory.interface("sw1", "Gi0/1").unwrap().unwrap();
        assert_eq!(first.kind, InterfaceType::Base1000T);
        assert!(!first.enabled);
        let second = inventory.interface("sw1", "Gi0/2").unwrap().unwrap();
        assert_eq!(second.kind, InterfaceType::Other);
        assert!(second.enabled);
    }

    #[test]
    fn vlans_skip_bad_ids_and_default_names() {
        let inventory = MemoryInventory::default();
        let findings = MemoryFindings::default();
        let ids = table(&[
            (1, SnmpValue::Integer(10)),
            (2, text_value("bogus")),
            (3, SnmpValue::Integer(20)),
        ]);
        let names = table(&[(1, text_value("Users"))]);

        let applied = apply_vlans(&inventory, &findings, 7, &ids, &names).unwrap();
        assert_eq!(applied.len(), 2);
        assert_eq!(inventory.vlan(20).unwrap().unwrap().name, "VLAN20");
        assert_eq!(findings.count(FindingKind::VlanDiscovered), 2);
    }

    #[test]
    fn vlan_names_follow_the_device() {
        let inventory = MemoryInventory::default();
        let findings = MemoryFindings::default();
        inventory.get_or_create_vlan(VlanRecord::new(10, "Old")).unwrap();

        let ids = table(&[(1, SnmpValue::Integer(10))]);
        let names = table(&[(1, text_value("Users"))]);
        apply_vlans(&inventory, &findings, 1, &ids, &names).unwrap();

        assert_eq!(inventory.vlan(10).unwrap().unwrap().name, "Users");
        assert_eq!(inventory.vlan_ids().unwrap().len(), 1);
    }

    #[test]
    fn access_and_trunk_assignment() {
        let inventory = MemoryInventory::default();
        for name in ["Gi0/1", "Gi0/2", "Gi0/3"] {
            inventory.get_or_create_interface(InterfaceRecord::new("sw1", name)).unwrap();
        }
        for vid in [1, 2, 3, 32, 34] {
            inventory.get_or_create_vlan(VlanRecord::new(vid, format!("VLAN{vid}"))).unwrap();
        }
        let if_names = table(&[
            (1, text_value("Gi0/1")),
            (2, text_value("Gi0/2")),
            (3, text_value("Gi0/3")),
        ]);

        // row 9 has no interface, VLAN 99 does not exist
        let access = table(&[
            (1, SnmpValue::Integer(3)),
            (2, SnmpValue::Integer(99)),
            (9, SnmpValue::Integer(1)),
        ]);
        assert_eq!(apply_access_ports(&inventory, "sw1", &if_names, &access).unwrap(), 1);
        let access_port = inventory.interface("sw1", "Gi0/1").unwrap().unwrap();
        assert_eq!(access_port.mode, Some(InterfaceMode::Access));
        assert_eq!(access_port.untagged_vlan, Some(3));

        let trunks = table(&[
            (2, SnmpValue::Integer(0b101)),
            (3, SnmpValue::OctetString(vec![0xff, 0xfe])),
        ]);
        assert_eq!(apply_trunk_ports(&inventory, "sw1", &if_names, &trunks).unwrap(), 1);
        let trunk = inventory.interface("sw1", "Gi0/2").unwrap().unwrap();
        assert_eq!(trunk.mode, Some(InterfaceMode::Tagged));
        assert_eq!(trunk.tagged_vlans, BTreeSet::from([2, 32, 34]));
        assert_eq!(inventory.interface("sw1", "Gi0/3").unwrap().unwrap().mode, None);
    }

    #[test]
    fn identity_prefers_sys_name_and_notes_once() {
        let inventory = MemoryInventory::default();
        let findings = MemoryFindings::default();
        let identity = Identity::from_values(
            Some(text_value("core-sw")),
            Some(text_value("Cisco IOS 15.2")),
            Some(text_value("FOC1234")),
        );

        let device = apply_identity(&inventory, &findings, 1, "10.0.0.2", &identity).unwrap();
        assert_eq!(device.name, "core-sw");
        assert_eq!(device.serial.as_deref(), Some("FOC1234"));
        apply_identity(&inventory, &findings, 2, "10.0.0.2", &identity).unwrap();

        let stored = inventory.devices();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].comments, "Discovered: Cisco IOS 15.2");
        assert_eq!(findings.count(FindingKind::NewDevice), 1);
        assert_eq!(findings.count(FindingKind::UpdatedDevice), 1);
    }

    #[test]
    fn identity_falls_back_to_host() {
        let inventory = MemoryInventory::default();
        let findings = MemoryFindings::default();
        let device =
            apply_identity(&inventory, &findings, 1, "10.0.0.2", &Identity::default()).unwrap();
        assert_eq!(device.name, "10.0.0.2");
        assert_eq!(device.model, GENERIC_MODEL);
    }
}
