//! Minimal BER (X.690) primitives: just enough to speak SNMPv1.

use thiserror::Error;

pub mod tag {
    pub const INTEGER: u8 = 0x02;
    pub const OCTET_STRING: u8 = 0x04;
    pub const NULL: u8 = 0x05;
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    pub const SEQUENCE: u8 = 0x30;

    // SMI application types
    pub const IP_ADDRESS: u8 = 0x40;
    pub const COUNTER32: u8 = 0x41;
    pub const GAUGE32: u8 = 0x42;
    pub const TIMETICKS: u8 = 0x43;
    pub const OPAQUE: u8 = 0x44;
    pub const COUNTER64: u8 = 0x46;

    // varbind exceptions
    pub const NO_SUCH_OBJECT: u8 = 0x80;
    pub const NO_SUCH_INSTANCE: u8 = 0x81;
    pub const END_OF_MIB_VIEW: u8 = 0x82;

    // PDUs
    pub const GET_REQUEST: u8 = 0xA0;
    pub const GET_NEXT_REQUEST: u8 = 0xA1;
    pub const GET_RESPONSE: u8 = 0xA2;
}

/// Longest definite length we accept, in length octets.
const MAX_LENGTH_OCTETS: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BerError {
    #[error("input truncated at offset {0}")]
    Truncated(usize),
    #[error("expected tag {expected:#04x}, found {found:#04x}")]
    UnexpectedTag { expected: u8, found: u8 },
    #[error("unsupported length encoding ({0} length octets)")]
    BadLength(usize),
    #[error("{0}-byte integer does not fit in 64 bits")]
    IntegerOverflow(usize),
    #[error("malformed object identifier")]
    BadOid,
}

pub fn encode_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let significant = &bytes[skip..];
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
}

pub fn encode_tlv(tag: u8, body: &[u8], out: &mut Vec<u8>) {
    out.push(tag);
    encode_length(body.len(), out);
    out.extend_from_slice(body);
}

/// Two's complement, shortest form.
pub fn encode_integer(value: i64, out: &mut Vec<u8>) {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant_zero = bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0;
        let redundant_ones = bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0;
        if !(redundant_zero || redundant_ones) {
            break;
        }
        start += 1;
    }
    encode_tlv(tag::INTEGER, &bytes[start..], out);
}

pub fn decode_integer(body: &[u8]) -> Result<i64, BerError> {
    if body.len() > 8 {
        return Err(BerError::IntegerOverflow(body.len()));
    }
    let Some(first) = body.first() else {
        return Ok(0);
    };
    let init: i64 = if first & 0x80 != 0 { -1 } else { 0 };
    Ok(body.iter().fold(init, |acc, b| (acc << 8) | i64::from(*b)))
}

/// Counters and gauges are unsigned but may carry a leading zero pad byte.
pub fn decode_unsigned(body: &[u8]) -> Result<u64, BerError> {
    let skip = body.iter().take_while(|b| **b == 0).count();
    let significant = &body[skip..];
    if significant.len() > 8 {
        return Err(BerError::IntegerOverflow(body.len()));
    }
    Ok(significant
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Cursor over a buffer of concatenated TLVs.
pub struct BerReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BerReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn read_tlv(&mut self) -> Result<(u8, &'a [u8]), BerError> {
        let tag = *self.data.get(self.pos).ok_or(BerError::Truncated(self.pos))?;
        self.pos += 1;
        let len = self.read_length()?;
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(BerError::Truncated(self.pos))?;
        let body = &self.data[self.pos..end];
        self.pos = end;
        Ok((tag, body))
    }

    pub fn expect(&mut self, expected: u8) -> Result<&'a [u8], BerError> {
        let (found, body) = self.read_tlv()?;
        if found != expected {
            return Err(BerError::UnexpectedTag { expected, found });
        }
        Ok(body)
    }

    pub fn read_integer(&mut self) -> Result<i64, BerError> {
        decode_integer(self.expect(tag::INTEGER)?)
    }

    fn read_length(&mut self) -> Result<usize, BerError> {
        let first = *self.data.get(self.pos).ok_or(BerError::Truncated(self.pos))?;
        self.pos += 1;
        if first & 0x80 == 0 {
            return Ok(usize::from(first));
        }

        let count = usize::from(first & 0x7F);
        if count == 0 || count > MAX_LENGTH_OCTETS {
            return Err(BerError::BadLength(count));
        }
        let bytes = self
            .data
            .get(self.pos..self.pos + count)
            .ok_or(BerError::Truncated(self.pos))?;
        self.pos += count;
        Ok(bytes.iter().fold(0usize, |acc, b| (acc << 8) | usize::from(*b)))
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
