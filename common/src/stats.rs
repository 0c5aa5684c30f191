use serde::{Deserialize, Serialize};

/// Outcome of a subnet sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeStats {
    pub cidr: String,
    pub alive: usize,
    pub created: usize,
    pub existing: usize,
    pub resolved: usize,
}

impl RangeStats {
    pub fn new(cidr: impl Into<String>) -> Self {
        Self {
            cidr: cidr.into(),
            ..Self::default()
        }
    }
}

/// Outcome of a switch walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchStats {
    pub interfaces: usize,
    pub vlans: usize,
    pub assignments: usize,
}

/// Statistics stored on a finished run; serialised flat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScanStats {
    Range(RangeStats),
    Switch(SwitchStats),
}

impl From<RangeStats> for ScanStats {
    fn from(stats: RangeStats) -> Self {
        ScanStats::Range(stats)
    }
}

impl From<SwitchStats> for ScanStats {
    fn from(stats: SwitchStats) -> Self {
        ScanStats::Switch(stats)
    }
}
