use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::ber::{self, BerError};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid object identifier '{0}'")]
pub struct OidParseError(String);

/// An SNMP object identifier such as `1.3.6.1.2.1.1.5.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid(Vec<u32>);

impl Oid {
    pub fn new(components: Vec<u32>) -> Self {
        Self(components)
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &Oid) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// The trailing sub-identifier, which is the row index for table columns.
    pub fn last(&self) -> Option<u32> {
        self.0.last().copied()
    }

    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), BerError> {
        let [first, second, rest @ ..] = self.0.as_slice() else {
            return Err(BerError::BadOid);
        };
        if *first > 2 || (*first < 2 && *second >= 40) {
            return Err(BerError::BadOid);
        }
        let head = first
            .checked_mul(40)
            .and_then(|v| v.checked_add(*second))
            .ok_or(BerError::BadOid)?;

        let mut body = Vec::with_capacity(self.0.len() + 4);
        push_base128(head, &mut body);
        for component in rest {
            push_base128(*component, &mut body);
        }
        ber::encode_tlv(ber::tag::OBJECT_IDENTIFIER, &body, out);
        Ok(())
    }

    pub fn decode(body: &[u8]) -> Result<Self, BerError> {
        let mut components = Vec::with_capacity(body.len() + 1);
        let mut acc: u32 = 0;
        let mut pending = false;

        for byte in body {
            if acc > (u32::MAX >> 7) {
                return Err(BerError::BadOid);
            }
            acc = (acc << 7) | u32::from(byte & 0x7F);
            pending = byte & 0x80 != 0;
            if pending {
                continue;
            }

            if components.is_empty() {
                let (first, second) = match acc {
                    0..40 => (0, acc),
                    40..80 => (1, acc - 40),
                    _ => (2, acc - 80),
                };
                components.push(first);
                components.push(second);
            } else {
                components.push(acc);
            }
            acc = 0;
        }

        if pending || components.is_empty() {
            return Err(BerError::BadOid);
        }
        Ok(Self(components))
    }
}

fn push_base128(mut value: u32, out: &mut Vec<u8>) {
    let mut buf = [0u8; 5];
    let mut start = buf.len() - 1;
    buf[start] = (value & 0x7F) as u8;
    value >>= 7;
    while value > 0 {
        start -= 1;
        buf[start] = (value & 0x7F) as u8 | 0x80;
        value >>= 7;
    }
    out.extend_from_slice(&buf[start..]);
}

impl FromStr for Oid {
    type Err = OidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('.');
        let components = trimmed
            .split('.')
            .map(str::parse::<u32>)
            .collect::<Result<Vec<u32>, _>>()
            .map_err(|_| OidParseError(s.to_string()))?;

        if components.len() < 2 {
            return Err(OidParseError(s.to_string()));
        }
        Ok(Self(components))
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{component}")?;
            first = false;
        }
        Ok(())
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
