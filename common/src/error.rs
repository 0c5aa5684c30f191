use thiserror::Error;

/// Input problems detected before any network I/O takes place.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("No cidr provided in scanner params")]
    MissingCidr,

    #[error("Invalid CIDR '{cidr}': {reason}")]
    InvalidCidr { cidr: String, reason: String },

    #[error("{cidr} has {hosts} usable hosts, above the limit of {limit}")]
    NetworkTooLarge {
        cidr: String,
        hosts: u128,
        limit: u128,
    },

    #[error("No hostname provided for Cisco scan")]
    MissingHost,

    #[error("Unsupported scanner type: {0}")]
    UnsupportedScanner(String),
}
