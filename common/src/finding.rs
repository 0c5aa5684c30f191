use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    NewHost,
    ExistingHost,
    NewDevice,
    UpdatedDevice,
    InterfacesDiscovered,
    VlanDiscovered,
    VlansDiscovered,
}

impl FindingKind {
    pub fn label(self) -> &'static str {
        match self {
            FindingKind::NewHost => "new host",
            FindingKind::ExistingHost => "existing host",
            FindingKind::NewDevice => "new device",
            FindingKind::UpdatedDevice => "updated device",
            FindingKind::InterfacesDiscovered => "interfaces discovered",
            FindingKind::VlanDiscovered => "vlan discovered",
            FindingKind::VlansDiscovered => "vlans discovered",
        }
    }
}

/// One discrete discovery fact. Written once, never read back by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub run_id: u64,
    pub kind: FindingKind,
    pub summary: String,
    pub details: Value,
}

impl Finding {
    pub fn new(run_id: u64, kind: FindingKind, summary: impl Into<String>, details: Value) -> Self {
        Self {
            run_id,
            kind,
            summary: summary.into(),
            details,
        }
    }
}

pub trait FindingSink: Send + Sync {
    fn record(&self, finding: Finding) -> anyhow::Result<()>;
}
