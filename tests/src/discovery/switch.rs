#![cfg(test)]
use std::collections::BTreeSet;

use autodisco_common::finding::FindingKind;
use autodisco_common::inventory::{Inventory, InterfaceMode, InterfaceRecord, InterfaceType};
use autodisco_common::network::target::ScannerDefinition;
use autodisco_common::run::{RunStatus, ScanRun};
use autodisco_common::stats::{ScanStats, SwitchStats};
use autodisco_core::topology::oids;
use autodisco_protocols::snmp::SnmpValue;

use crate::support::{FakeSnmpClient, Harness, text};

const HOST: &str = "10.20.0.2";

fn switch_stats(run: &ScanRun) -> SwitchStats {
    match &run.stats {
        Some(ScanStats::Switch(stats)) => *stats,
        other => panic!("expected switch statistics, got {other:?}"),
    }
}

fn definition() -> ScannerDefinition {
    ScannerDefinition::cisco("access-sw", HOST, "s3cret", false)
}

/// Two gigabit ports, VLAN 10 and 20, port 1 in access VLAN 10 and port 2
/// trunking both.
fn agent() -> FakeSnmpClient {
    FakeSnmpClient::default()
        .scalar(oids::SYS_NAME, text("core-sw"))
        .scalar(oids::SYS_DESCR, text("Cisco IOS Software, C2960"))
        .scalar(oids::CHASSIS_SERIAL, text("FOC1234X0AB"))
        .column(oids::IF_NAME, vec![(1, text("Gi0/1")), (2, text("Gi0/2"))])
        .column(oids::IF_TYPE, vec![(1, SnmpValue::Integer(6)), (2, SnmpValue::Integer(6))])
        .column(oids::IF_ADMIN_STATUS, vec![(1, SnmpValue::Integer(1)), (2, SnmpValue::Integer(2))])
        .column(
            oids::VTP_VLAN_ID,
            vec![(1, SnmpValue::Integer(10)), (2, SnmpValue::Integer(20)), (3, text("n/a"))],
        )
        .column(oids::VTP_VLAN_NAME, vec![(1, text("Users"))])
        .column(oids::ACCESS_VLAN, vec![(1, SnmpValue::Integer(10))])
        .column(
            oids::TRUNK_VLANS,
            vec![(2, SnmpValue::Integer((1 << 10) | (1 << 20)))],
        )
}

#[tokio::test]
async fn full_walk_populates_the_inventory() {
    let harness = Harness::switch(agent());
    let run = harness.run(1, &definition()).await;

    assert_eq!(run.status, RunStatus::Success);
    assert_eq!(
        switch_stats(&run),
        SwitchStats {
            interfaces: 2,
            vlans: 2,
            assignments: 2
        }
    );

    let devices = harness.inventory.devices();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "core-sw");
    assert_eq!(devices[0].serial.as_deref(), Some("FOC1234X0AB"));
    assert_eq!(devices[0].comments, "Discovered: Cisco IOS Software, C2960");

    let access = harness.inventory.interface("core-sw", "Gi0/1").unwrap().unwrap();
    assert_eq!(access.kind, InterfaceType::Base1000T);
    assert!(access.enabled);
    assert_eq!(access.mode, Some(InterfaceMode::Access));
    assert_eq!(access.untagged_vlan, Some(10));

    let trunk = harness.inventory.interface("core-sw", "Gi0/2").unwrap().unwrap();
    assert!(!trunk.enabled);
    assert_eq!(trunk.mode, Some(InterfaceMode::Tagged));
    assert_eq!(trunk.tagged_vlans, BTreeSet::from([10, 20]));

    assert_eq!(harness.inventory.vlan(20).unwrap().unwrap().name, "VLAN20");
    assert_eq!(harness.findings.count(FindingKind::NewDevice), 1);
    assert_eq!(harness.findings.count(FindingKind::InterfacesDiscovered), 1);
    assert_eq!(harness.findings.count(FindingKind::VlanDiscovered), 2);

    let lines: Vec<&str> = run.log_lines().collect();
    assert!(lines.contains(&"System name: core-sw"));
    assert!(lines.contains(&"Discovered 2 interfaces."));
    assert!(lines.contains(&"Discovered 2 VLANs."));
    assert!(lines.contains(&"Assigned VLANs on 2 interfaces."));
    assert!(!run.log.contains("s3cret"));
}

#[tokio::test]
async fn rescanning_updates_in_place() {
    let harness = Harness::switch(agent());
    harness.run(1, &definition()).await;
    let run = harness.run(2, &definition()).await;

    assert_eq!(run.status, RunStatus::Success);
    assert_eq!(harness.inventory.devices().len(), 1);
    assert_eq!(harness.inventory.interfaces().len(), 2);
    assert_eq!(harness.inventory.vlans().len(), 2);
    assert_eq!(harness.findings.count(FindingKind::UpdatedDevice), 1);
    assert_eq!(
        harness.inventory.devices()[0].comments,
        "Discovered: Cisco IOS Software, C2960"
    );
}

#[tokio::test]
async fn interface_failure_does_not_stop_later_stages() {
    let harness = Harness::switch(agent().failing(oids::IF_TYPE));
    for name in ["Gi0/1", "Gi0/2"] {
        harness
            .inventory
            .get_or_create_interface(InterfaceRecord::new("core-sw", name))
            .unwrap();
    }
    let run = harness.run(1, &definition()).await;

    assert_eq!(run.status, RunStatus::Success);
    let stats = switch_stats(&run);
    assert_eq!(stats.interfaces, 0);
    assert_eq!(stats.vlans, 2);
    assert_eq!(stats.assignments, 2);
    assert!(run.log.contains("Failed interface discovery: request for"));
    assert_eq!(harness.findings.count(FindingKind::InterfacesDiscovered), 0);
}

#[tokio::test]
async fn vlan_failure_still_assigns_known_vlans() {
    let harness = Harness::switch(agent().failing(oids::VTP_VLAN_NAME));
    let run = harness.run(1, &definition()).await;

    let stats = switch_stats(&run);
    assert_eq!(stats.interfaces, 2);
    assert_eq!(stats.vlans, 0);
    // no VLAN exists yet, so nothing can be attached
    assert_eq!(stats.assignments, 0);
    assert!(run.log.contains("Failed VLAN discovery"));
}

#[tokio::test]
async fn identity_failure_skips_every_other_stage() {
    let harness = Harness::switch(agent().failing(oids::SYS_NAME));
    let run = harness.run(1, &definition()).await;

    assert_eq!(run.status, RunStatus::Success);
    assert_eq!(switch_stats(&run), SwitchStats::default());
    assert_eq!(harness.snmp.walks(), 0);
    assert!(harness.inventory.devices().is_empty());
    assert!(harness.findings.is_empty());
    assert!(run.log.contains("Failed system info discovery"));
}

#[tokio::test]
async fn missing_sys_name_falls_back_to_the_host() {
    let snmp = FakeSnmpClient::default().column(oids::IF_NAME, vec![(1, text("Fa0/1"))]);
    let harness = Harness::switch(snmp);
    let run = harness.run(1, &definition()).await;

    assert_eq!(switch_stats(&run).interfaces, 1);
    assert_eq!(harness.inventory.devices()[0].name, HOST);
    assert!(harness.inventory.interface(HOST, "Fa0/1").unwrap().is_some());
}

#[tokio::test]
async fn trunk_masks_alias_onto_known_vlans() {
    let snmp = FakeSnmpClient::default()
        .scalar(oids::SYS_NAME, text("dist-sw"))
        .column(oids::IF_NAME, vec![(5, text("Gi1/0/5"))])
        .column(
            oids::VTP_VLAN_ID,
            [1, 2, 3, 32, 34]
                .into_iter()
                .map(|vid| (vid, SnmpValue::Integer(i64::from(vid))))
                .collect(),
        )
        .column(oids::TRUNK_VLANS, vec![(5, text("5"))]);
    let harness = Harness::switch(snmp);
    let run = harness.run(1, &definition()).await;

    assert_eq!(switch_stats(&run).assignments, 1);
    let port = harness.inventory.interface("dist-sw", "Gi1/0/5").unwrap().unwrap();
    assert_eq!(port.tagged_vlans, BTreeSet::from([2, 32, 34]));
}

#[tokio::test]
async fn simulated_switch_uses_the_canned_topology() {
    let harness = Harness::switch(FakeSnmpClient::default());
    let run = harness
        .run(1, &ScannerDefinition::cisco("lab", "lab-sw", "public", true))
        .await;

    assert_eq!(
        switch_stats(&run),
        SwitchStats {
            interfaces: 2,
            vlans: 2,
            assignments: 2
        }
    );
    assert!(harness.snmp.calls().is_empty());
    let vids: Vec<u16> = harness.inventory.vlans().iter().map(|v| v.vid).collect();
    assert_eq!(vids, vec![10, 20]);
    assert_eq!(harness.findings.count(FindingKind::VlansDiscovered), 1);
}

#[tokio::test]
async fn missing_hostname_is_rejected() {
    let harness = Harness::switch(agent());
    let definition = ScannerDefinition::new("nameless", "cisco").with_param("community", "public");
    let run = harness.run(1, &definition).await;

    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.log, "Error: No hostname provided for Cisco scan");
    assert!(harness.snmp.calls().is_empty());
}
