#![cfg(test)]
use autodisco_common::config::ScanConfig;
use autodisco_common::finding::FindingKind;
use autodisco_common::network::target::ScannerDefinition;
use autodisco_common::run::RunStatus;
use autodisco_common::stats::{RangeStats, ScanStats};
use serde_json::json;

use crate::support::{FakePinger, FakeResolver, FakeSnmpClient, Harness, ip};

fn range_stats(run: &autodisco_common::run::ScanRun) -> RangeStats {
    match &run.stats {
        Some(ScanStats::Range(stats)) => stats.clone(),
        other => panic!("expected range statistics, got {other:?}"),
    }
}

#[tokio::test]
async fn slash_30_with_two_live_hosts() {
    let harness = Harness::pinging(
        FakePinger::alive(&["10.0.0.1", "10.0.0.2"]),
        FakeResolver::with(&[("10.0.0.1", "gw.lan")]),
    );
    let run = harness
        .run(1, &ScannerDefinition::range("office", "10.0.0.0/30", false))
        .await;

    assert_eq!(run.status, RunStatus::Success);
    assert_eq!(
        serde_json::to_value(run.stats.as_ref().unwrap()).unwrap(),
        json!({"cidr": "10.0.0.0/30", "alive": 2, "created": 2, "existing": 0, "resolved": 1})
    );
    assert_eq!(harness.findings.count(FindingKind::NewHost), 2);
    assert_eq!(harness.findings.len(), 2);

    let gateway = harness.inventory.address(ip("10.0.0.1")).unwrap();
    assert_eq!(gateway.dns_name.as_deref(), Some("gw.lan"));
    assert_eq!(gateway.description, "Discovered by AutoDiscovery");
    assert_eq!(gateway.cidr(), "10.0.0.1/32");
    assert_eq!(harness.inventory.address(ip("10.0.0.2")).unwrap().dns_name, None);
}

#[tokio::test]
async fn second_sweep_creates_nothing_new() {
    let harness = Harness::pinging(
        FakePinger::alive(&["10.0.0.1", "10.0.0.2"]),
        FakeResolver::default(),
    );
    let definition = ScannerDefinition::range("office", "10.0.0.0/30", false);

    let first = harness.run(1, &definition).await;
    let second = harness.run(2, &definition).await;

    assert_eq!(range_stats(&first).created, 2);
    let again = range_stats(&second);
    assert_eq!(again.created, 0);
    assert_eq!(again.existing, again.alive);
    assert_eq!(again.existing, 2);
    assert_eq!(harness.inventory.addresses().len(), 2);
    assert_eq!(harness.findings.count(FindingKind::ExistingHost), 2);
}

#[tokio::test]
async fn every_usable_host_is_probed_once() {
    for (cidr, usable) in [("10.0.0.0/29", 6), ("192.168.7.0/24", 254), ("10.9.9.9/32", 0), ("10.0.0.0/31", 0)] {
        let harness = Harness::pinging(FakePinger::default(), FakeResolver::default());
        let run = harness.run(1, &ScannerDefinition::range("sweep", cidr, false)).await;

        assert_eq!(run.status, RunStatus::Success, "{cidr}");
        assert_eq!(harness.pinger.probes(), usable, "{cidr}");
        assert_eq!(range_stats(&run), RangeStats::new(cidr));
    }
}

#[tokio::test]
async fn progress_is_visible_while_running() {
    let live: Vec<String> = (1..=12).map(|i| format!("10.0.0.{i}")).collect();
    let live: Vec<&str> = live.iter().map(String::as_str).collect();
    let config = ScanConfig {
        batch_size: 5,
        ..ScanConfig::default()
    };
    let harness = Harness::with_config(
        config,
        FakePinger::alive(&live),
        FakeResolver::default(),
        FakeSnmpClient::default(),
    );
    let run = harness.run(9, &ScannerDefinition::range("lan", "10.0.0.0/28", false)).await;

    let snapshots = harness.store.snapshots();
    assert_eq!(snapshots.first().unwrap().status, RunStatus::Running);
    let in_flight: Vec<_> = snapshots
        .iter()
        .filter(|s| s.status == RunStatus::Running)
        .filter(|s| s.log.lines().last().is_some_and(|line| line.starts_with("Scanned")))
        .collect();
    // 12 live hosts in batches of five, the last flushed at the end of the sweep
    assert_eq!(in_flight.len(), 3);
    assert!(in_flight[0].log.len() < in_flight[2].log.len());

    let last = harness.store.latest().unwrap();
    assert_eq!(last.status, RunStatus::Success);
    assert!(last.finished.is_some());
    assert!(run.log.ends_with("Done. Alive=12, Created=12, Existing=0, Resolved=0"));
}

#[tokio::test]
async fn simulation_picks_a_small_sample_offline() {
    let harness = Harness::pinging(FakePinger::default(), FakeResolver::default());
    let run = harness
        .run(1, &ScannerDefinition::range("lab", "172.16.0.0/28", true))
        .await;

    let stats = range_stats(&run);
    assert_eq!(stats.alive, 5);
    assert_eq!(stats.created + stats.existing, 5);
    assert_eq!(stats.resolved, 5);
    assert_eq!(harness.pinger.probes(), 0);

    for record in harness.inventory.addresses() {
        let expected = format!("host-{}.local", record.address.to_string().replace('.', "-"));
        assert_eq!(record.dns_name.as_deref(), Some(expected.as_str()));
        assert_eq!(record.description, "Discovered (simulated) by AutoDiscovery");
    }
}

#[tokio::test]
async fn simulation_never_samples_more_than_exists() {
    let harness = Harness::pinging(FakePinger::default(), FakeResolver::default());
    let run = harness
        .run(1, &ScannerDefinition::range("tiny", "10.0.0.0/30", true))
        .await;
    assert_eq!(range_stats(&run).alive, 2);
}

#[tokio::test]
async fn bad_input_fails_before_any_probe() {
    let cases = [
        (ScannerDefinition::range("bad", "10.0.0.300/24", false), "Error: "),
        (ScannerDefinition::new("none", "range"), "Error: No cidr provided in scanner params"),
        (ScannerDefinition::range("huge", "10.0.0.0/8", false), "above the limit"),
    ];
    for (definition, expected) in cases {
        let harness = Harness::pinging(FakePinger::default(), FakeResolver::default());
        let run = harness.run(1, &definition).await;

        assert_eq!(run.status, RunStatus::Failed, "{}", definition.name);
        assert!(run.log.contains(expected), "{}: {}", definition.name, run.log);
        assert!(run.finished.is_some());
        assert!(run.stats.is_none());
        assert_eq!(harness.pinger.probes(), 0);
    }
}
