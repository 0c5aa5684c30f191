//! # Scan Target Model
//!
//! Defines what a scan is pointed at and how persisted scanner definitions
//! turn into one. A target is either:
//! * A CIDR block to sweep for live hosts (`range` scanners).
//! * A single managed switch to walk over SNMP (`cisco` scanners).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ScanError;

pub const DEFAULT_COMMUNITY: &str = "public";

/// The declared type of a scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerKind {
    Range,
    Cisco,
}

impl FromStr for ScannerKind {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "range" => Ok(ScannerKind::Range),
            "cisco" => Ok(ScannerKind::Cisco),
            _ => Err(ScanError::UnsupportedScanner(s.to_string())),
        }
    }
}

impl fmt::Display for ScannerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScannerKind::Range => f.write_str("range"),
            ScannerKind::Cisco => f.write_str("cisco"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanTarget {
    /// Sweep every usable address of a network.
    Range { cidr: String },
    /// Walk one device's management agent. `credential` is the read community.
    Device { host: String, credential: String },
}

/// A validated, immutable request handed to an orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub target: ScanTarget,
    /// Synthesize results instead of touching the network.
    pub simulate: bool,
}

impl ScanRequest {
    pub fn kind(&self) -> ScannerKind {
        match self.target {
            ScanTarget::Range { .. } => ScannerKind::Range,
            ScanTarget::Device { .. } => ScannerKind::Cisco,
        }
    }

    /// Validates a persisted definition.
    ///
    /// Params understood:
    /// * `cidr` (range, required)
    /// * `hostname` (cisco, required) and `community` (cisco, defaults to `public`)
    /// * `fake_mode` (both, defaults to `false`)
    pub fn from_definition(definition: &ScannerDefinition) -> Result<Self, ScanError> {
        let kind: ScannerKind = definition.kind.parse()?;
        let params = &definition.params;
        let simulate = params
            .get("fake_mode")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let target = match kind {
            ScannerKind::Range => ScanTarget::Range {
                cidr: param_str(params, "cidr").ok_or(ScanError::MissingCidr)?,
            },
            ScannerKind::Cisco => ScanTarget::Device {
                host: param_str(params, "hostname").ok_or(ScanError::MissingHost)?,
                credential: param_str(params, "community")
                    .unwrap_or_else(|| DEFAULT_COMMUNITY.to_string()),
            },
        };

        Ok(Self { target, simulate })
    }
}

fn param_str(params: &Map<String, Value>, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A stored scanner: a name, a declared type and free-form params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerDefinition {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl ScannerDefinition {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            params: Map::new(),
        }
    }

    pub fn range(name: impl Into<String>, cidr: &str, simulate: bool) -> Self {
        Self::new(name, "range")
            .with_param("cidr", cidr)
            .with_param("fake_mode", simulate)
    }

    pub fn cisco(name: impl Into<String>, host: &str, community: &str, simulate: bool) -> Self {
        Self::new(name, "cisco")
            .with_param("hostname", host)
            .with_param("community", community)
            .with_param("fake_mode", simulate)
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
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
