use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use autodisco_common::config::ScanConfig;
use autodisco_common::finding::Finding;
use autodisco_common::network::target::ScannerDefinition;
use autodisco_common::run::{RunStatus, ScanRun};
use autodisco_common::stats::ScanStats;
use autodisco_core::controller::RunController;
use autodisco_core::store::{InventorySnapshot, MemoryFindings, MemoryInventory};
use colored::*;
use serde_json::Value;
use tracing::info;

use crate::terminal::{colors, print, spinner};

const RUN_ID: u64 = 1;

pub async fn range(
    cidr: &str,
    simulate: bool,
    cfg: ScanConfig,
    inventory: Option<&Path>,
) -> anyhow::Result<RunStatus> {
    let definition = ScannerDefinition::range(format!("range {cidr}"), cidr, simulate);
    execute(definition, cfg, inventory).await
}

pub async fn cisco(
    host: &str,
    community: &str,
    simulate: bool,
    cfg: ScanConfig,
    inventory: Option<&Path>,
) -> anyhow::Result<RunStatus> {
    let definition = ScannerDefinition::cisco(format!("cisco {host}"), host, community, simulate);
    execute(definition, cfg, inventory).await
}

async fn execute(
    definition: ScannerDefinition,
    cfg: ScanConfig,
    inventory_path: Option<&Path>,
) -> anyhow::Result<RunStatus> {
    let inventory = Arc::new(load_inventory(inventory_path)?);
    let findings = Arc::new(MemoryFindings::default());
    let controller = RunController::new(
        cfg,
        inventory.clone(),
        findings.clone(),
        Arc::new(spinner::SpinnerRunStore),
    );

    let mut run = ScanRun::new(RUN_ID, definition.name.clone());
    spinner::start(&format!("Running {}...", definition.name));
    let status = controller.execute(&definition, &mut run).await;
    spinner::stop();

    if let Some(path) = inventory_path {
        save_inventory(path, &inventory.snapshot())?;
        info!("Inventory written to {}", path.display());
    }

    print_run(&run);
    print_findings(&findings.all());
    Ok(status)
}

fn load_inventory(path: Option<&Path>) -> anyhow::Result<MemoryInventory> {
    let Some(path) = path.filter(|p| p.exists()) else {
        return Ok(MemoryInventory::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let snapshot: InventorySnapshot =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    info!(
        "Loaded {} addresses, {} devices from {}",
        snapshot.addresses.len(),
        snapshot.devices.len(),
        path.display()
    );
    Ok(MemoryInventory::from_snapshot(snapshot))
}

fn save_inventory(path: &Path, snapshot: &InventorySnapshot) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

fn print_run(run: &ScanRun) {
    print::header(&format!("run #{}", run.id));
    let status = match run.status {
        RunStatus::Success => run.status.to_string().color(colors::SUCCESS).bold(),
        RunStatus::Failed => run.status.to_string().color(colors::FAILURE).bold(),
        _ => run.status.to_string().normal(),
    };
    print::aligned_line("Scanner", run.scanner.normal(), 8);
    print::aligned_line("Status", status, 8);
    if let (Some(started), Some(finished)) = (run.started, run.finished) {
        let elapsed = (finished - started).num_milliseconds() as f64 / 1000.0;
        print::aligned_line("Elapsed", format!("{elapsed:.2}s").yellow(), 8);
    }

    print::header("log");
    for line in run.log_lines() {
        print::print(&format!(" {}", line.color(colors::TEXT_DEFAULT)));
    }

    if let Some(stats) = &run.stats {
        print::header("statistics");
        print::as_tree_one_level(&stats_details(stats));
    }
}

fn stats_details(stats: &ScanStats) -> Vec<(String, ColoredString)> {
    let count = |n: usize| n.to_string().green().bold();
    match stats {
        ScanStats::Range(range) => vec![
            ("CIDR".to_string(), range.cidr.as_str().normal()),
            ("Alive".to_string(), count(range.alive)),
            ("Created".to_string(), count(range.created)),
            ("Existing".to_string(), count(range.existing)),
            ("Resolved".to_string(), count(range.resolved)),
        ],
        ScanStats::Switch(switch) => vec![
            ("Interfaces".to_string(), count(switch.interfaces)),
            ("VLANs".to_string(), count(switch.vlans)),
            ("Assignments".to_string(), count(switch.assignments)),
        ],
    }
}

fn print_findings(findings: &[Finding]) {
    if findings.is_empty() {
        return;
    }
    print::header("findings");
    for (idx, finding) in findings.iter().enumerate() {
        print::tree_head(idx, &finding.summary);
        print::as_tree_one_level(&detail_pairs(&finding.details));
    }
    print::fat_separator();
    let total = format!("{} findings", findings.len()).bold().green();
    print::centerln(&format!("Discovery complete: {total}"));
}

fn detail_pairs(details: &Value) -> Vec<(String, ColoredString)> {
    let Value::Object(map) = details else {
        return vec![("Details".to_string(), details.to_string().normal())];
    };
    map.iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), rendered.color(colors::ACCENT))
        })
        .collect()
}
