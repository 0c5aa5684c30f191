#![cfg(test)]
use autodisco_common::network::target::ScannerDefinition;
use autodisco_common::run::{RunStatus, ScanRun};

use crate::support::{FakePinger, FakeResolver, FakeSnmpClient, Harness};

#[tokio::test]
async fn every_run_ends_finalized() {
    let definitions = [
        ScannerDefinition::range("ok", "10.0.0.0/30", true),
        ScannerDefinition::range("bad", "not-a-cidr", false),
        ScannerDefinition::cisco("sim", "lab-sw", "public", true),
        ScannerDefinition::new("nameless", "cisco"),
        ScannerDefinition::new("odd", "netflow"),
    ];
    let harness = Harness::new(FakePinger::default(), FakeResolver::default(), FakeSnmpClient::default());

    for (id, definition) in definitions.iter().enumerate() {
        let run = harness.run(id as u64, definition).await;
        assert!(run.status.is_terminal(), "{}", definition.name);
        assert!(run.started.is_some(), "{}", definition.name);
        assert!(run.finished.is_some(), "{}", definition.name);
        assert!(run.finished >= run.started);
        assert!(!run.log.is_empty(), "{}", definition.name);

        let persisted = harness.store.latest().unwrap();
        assert_eq!(persisted.id, id as u64);
        assert_eq!(persisted.status, run.status);
    }
}

#[tokio::test]
async fn unsupported_type_invokes_no_scanner() {
    let harness = Harness::new(FakePinger::default(), FakeResolver::default(), FakeSnmpClient::default());
    let run = harness
        .run(1, &ScannerDefinition::new("odd", "netflow").with_param("cidr", "10.0.0.0/24"))
        .await;

    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.log, "Unsupported scanner type: netflow");
    assert_eq!(harness.pinger.probes(), 0);
    assert!(harness.snmp.calls().is_empty());
    assert!(harness.findings.is_empty());
}

#[tokio::test]
async fn kind_matching_ignores_case() {
    let harness = Harness::new(FakePinger::default(), FakeResolver::default(), FakeSnmpClient::default());
    let definition = ScannerDefinition::new("loud", "RANGE")
        .with_param("cidr", "10.0.0.0/30")
        .with_param("fake_mode", true);
    let run = harness.run(1, &definition).await;
    assert_eq!(run.status, RunStatus::Success);
}

#[tokio::test]
async fn running_runs_are_left_alone() {
    let harness = Harness::new(FakePinger::default(), FakeResolver::default(), FakeSnmpClient::default());
    let mut run = ScanRun::new(1, "busy");
    run.status = RunStatus::Running;

    let status = harness
        .execute(&ScannerDefinition::range("busy", "10.0.0.0/30", false), &mut run)
        .await;

    assert_eq!(status, RunStatus::Running);
    assert!(run.log.is_empty());
    assert!(run.finished.is_none());
    assert_eq!(harness.pinger.probes(), 0);
    assert!(harness.store.snapshots().is_empty());
}
