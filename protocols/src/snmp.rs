//! SNMPv1 message encoding (GetRequest / GetNextRequest) and response decoding.
//!
//! Only community-based read access is modelled. Messages are built and parsed
//! by hand on top of [`crate::ber`], the same way the other packet builders in
//! this crate lay out their headers byte by byte.

use std::fmt;
use std::net::Ipv4Addr;

use thiserror::Error;

use crate::ber::{self, BerError, BerReader, tag};
use crate::oid::Oid;

pub const SNMP_PORT: u16 = 161;

/// `version-1` in the message header.
pub const VERSION_1: i64 = 0;

#[derive(Debug, Error)]
pub enum SnmpError {
    #[error(transparent)]
    Ber(#[from] BerError),
    #[error("unexpected PDU type {0:#04x}")]
    UnexpectedPdu(u8),
    #[error("request id {0} does not fit in 32 bits")]
    BadRequestId(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduKind {
    Get,
    GetNext,
}

impl PduKind {
    fn tag(self) -> u8 {
        match self {
            PduKind::Get => tag::GET_REQUEST,
            PduKind::GetNext => tag::GET_NEXT_REQUEST,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnmpValue {
    Integer(i64),
    OctetString(Vec<u8>),
    Null,
    ObjectId(Oid),
    IpAddress(Ipv4Addr),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Opaque(Vec<u8>),
    Counter64(u64),
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

impl SnmpValue {
    pub fn decode(value_tag: u8, body: &[u8]) -> Result<Self, BerError> {
        let value = match value_tag {
            tag::INTEGER => SnmpValue::Integer(ber::decode_integer(body)?),
            tag::OCTET_STRING => SnmpValue::OctetString(body.to_vec()),
            tag::NULL => SnmpValue::Null,
            tag::OBJECT_IDENTIFIER => SnmpValue::ObjectId(Oid::decode(body)?),
            tag::IP_ADDRESS => {
                let octets: [u8; 4] = body.try_into().map_err(|_| BerError::Truncated(0))?;
                SnmpValue::IpAddress(Ipv4Addr::from(octets))
            }
            tag::COUNTER32 => SnmpValue::Counter32(decode_u32(body)?),
            tag::GAUGE32 => SnmpValue::Gauge32(decode_u32(body)?),
            tag::TIMETICKS => SnmpValue::TimeTicks(decode_u32(body)?),
            tag::OPAQUE => SnmpValue::Opaque(body.to_vec()),
            tag::COUNTER64 => SnmpValue::Counter64(ber::decode_unsigned(body)?),
            tag::NO_SUCH_OBJECT => SnmpValue::NoSuchObject,
            tag::NO_SUCH_INSTANCE => SnmpValue::NoSuchInstance,
            tag::END_OF_MIB_VIEW => SnmpValue::EndOfMibView,
            other => {
                return Err(BerError::UnexpectedTag {
                    expected: tag::OCTET_STRING,
                    found: other,
                });
            }
        };
        Ok(value)
    }

    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), BerError> {
        match self {
            SnmpValue::Integer(v) => ber::encode_integer(*v, out),
            SnmpValue::OctetString(bytes) => ber::encode_tlv(tag::OCTET_STRING, bytes, out),
            SnmpValue::Null => ber::encode_tlv(tag::NULL, &[], out),
            SnmpValue::ObjectId(oid) => oid.encode(out)?,
            SnmpValue::IpAddress(ip) => ber::encode_tlv(tag::IP_ADDRESS, &ip.octets(), out),
            SnmpValue::Counter32(v) => encode_unsigned(tag::COUNTER32, u64::from(*v), out),
            SnmpValue::Gauge32(v) => encode_unsigned(tag::GAUGE32, u64::from(*v), out),
            SnmpValue::TimeTicks(v) => encode_unsigned(tag::TIMETICKS, u64::from(*v), out),
            SnmpValue::Opaque(bytes) => ber::encode_tlv(tag::OPAQUE, bytes, out),
            SnmpValue::Counter64(v) => encode_unsigned(tag::COUNTER64, *v, out),
            SnmpValue::NoSuchObject => ber::encode_tlv(tag::NO_SUCH_OBJECT, &[], out),
            SnmpValue::NoSuchInstance => ber::encode_tlv(tag::NO_SUCH_INSTANCE, &[], out),
            SnmpValue::EndOfMibView => ber::encode_tlv(tag::END_OF_MIB_VIEW, &[], out),
        }
        Ok(())
    }

    /// `noSuchObject`, `noSuchInstance` and `endOfMibView` carry no data.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            SnmpValue::NoSuchObject | SnmpValue::NoSuchInstance | SnmpValue::EndOfMibView
        )
    }

    /// Numeric reading of the value. Octet strings qualify when they hold
    /// decimal text, which is how some agents report bitmaps and ids.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            SnmpValue::Integer(v) => u64::try_from(*v).ok(),
            SnmpValue::Counter32(v) | SnmpValue::Gauge32(v) | SnmpValue::TimeTicks(v) => {
                Some(u64::from(*v))
            }
            SnmpValue::Counter64(v) => Some(*v),
            SnmpValue::OctetString(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok(),
            _ => None,
        }
    }
}

fn encode_unsigned(value_tag: u8, value: u64, out: &mut Vec<u8>) {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count().min(bytes.len() - 1);
    let mut body = Vec::with_capacity(9);
    if bytes[skip] & 0x80 != 0 {
        body.push(0);
    }
    body.extend_from_slice(&bytes[skip..]);
    ber::encode_tlv(value_tag, &body, out);
}

fn decode_u32(body: &[u8]) -> Result<u32, BerError> {
    let value = ber::decode_unsigned(body)?;
    u32::try_from(value).map_err(|_| BerError::IntegerOverflow(body.len()))
}

impl fmt::Display for SnmpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnmpValue::Integer(v) => write!(f, "{v}"),
            SnmpValue::OctetString(bytes) | SnmpValue::Opaque(bytes) => match printable(bytes) {
                Some(text) => f.write_str(text),
                None => {
                    f.write_str("0x")?;
                    for b in bytes {
                        write!(f, "{b:02x}")?;
                    }
                    Ok(())
                }
            },
            SnmpValue::Null => Ok(()),
            SnmpValue::ObjectId(oid) => write!(f, "{oid}"),
            SnmpValue::IpAddress(ip) => write!(f, "{ip}"),
            SnmpValue::Counter32(v) | SnmpValue::Gauge32(v) | SnmpValue::TimeTicks(v) => {
                write!(f, "{v}")
            }
            SnmpValue::Counter64(v) => write!(f, "{v}"),
            SnmpValue::NoSuchObject => f.write_str("noSuchObject"),
            SnmpValue::NoSuchInstance => f.write_str("noSuchInstance"),
            SnmpValue::EndOfMibView => f.write_str("endOfMibView"),
        }
    }
}

fn printable(bytes: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(bytes).ok()?;
    let clean = text
        .chars()
        .all(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'));
    clean.then_some(text)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarBind {
    pub oid: Oid,
    pub value: SnmpValue,
}

/// A decoded SNMP message: header plus the single PDU it carries.
#[derive(Debug, Clone)]
pub struct Message {
    pub community: Vec<u8>,
    pub pdu_tag: u8,
    pub request_id: i32,
    pub error_status: i64,
    pub error_index: i64,
    pub varbinds: Vec<VarBind>,
}

impl Message {
    pub fn is_error(&self) -> bool {
        self.error_status != 0
    }
}

pub fn next_request_id() -> i32 {
    rand::random_range(1..i32::MAX)
}

/// Builds a single-varbind request message.
pub fn encode_request(
    community: &str,
    request_id: i32,
    kind: PduKind,
    oid: &Oid,
) -> Result<Vec<u8>, SnmpError> {
    let varbind = VarBind {
        oid: oid.clone(),
        value: SnmpValue::Null,
    };
    encode_message(community.as_bytes(), kind.tag(), request_id, 0, &[varbind])
}

/// Builds a GetResponse; used by agents and test doubles.
pub fn encode_response(
    community: &str,
    request_id: i32,
    error_status: i64,
    varbinds: &[VarBind],
) -> Result<Vec<u8>, SnmpError> {
    encode_message(
        community.as_bytes(),
        tag::GET_RESPONSE,
        request_id,
        error_status,
        varbinds,
    )
}

fn encode_message(
    community: &[u8],
    pdu_tag: u8,
    request_id: i32,
    error_status: i64,
    varbinds: &[VarBind],
) -> Result<Vec<u8>, SnmpError> {
    let mut list = Vec::new();
    for varbind in varbinds {
        let mut body = Vec::new();
        varbind.oid.encode(&mut body)?;
        varbind.value.encode(&mut body)?;
        ber::encode_tlv(tag::SEQUENCE, &body, &mut list);
    }

    let mut pdu = Vec::new();
    ber::encode_integer(i64::from(request_id), &mut pdu);
    ber::encode_integer(error_status, &mut pdu);
    ber::encode_integer(0, &mut pdu); // error-index
    ber::encode_tlv(tag::SEQUENCE, &list, &mut pdu);

    let mut message = Vec::new();
    ber::encode_integer(VERSION_1, &mut message);
    ber::encode_tlv(tag::OCTET_STRING, community, &mut message);
    ber::encode_tlv(pdu_tag, &pdu, &mut message);

    let mut packet = Vec::with_capacity(message.len() + 4);
    ber::encode_tlv(tag::SEQUENCE, &message, &mut packet);
    Ok(packet)
}

pub fn decode_message(bytes: &[u8]) -> Result<Message, SnmpError> {
    let mut outer = BerReader::new(bytes);
    let body = outer.expect(tag::SEQUENCE)?;

    let mut reader = BerReader::new(body);
    let _version = reader.read_integer()?;
    let community = reader.expect(tag::OCTET_STRING)?.to_vec();
    let (pdu_tag, pdu) = reader.read_tlv()?;

    let mut pdu = BerReader::new(pdu);
    let raw_id = pdu.read_integer()?;
    let request_id = i32::try_from(raw_id).map_err(|_| SnmpError::BadRequestId(raw_id))?;
    let error_status = pdu.read_integer()?;
    let error_index = pdu.read_integer()?;

    let mut list = BerReader::new(pdu.expect(tag::SEQUENCE)?);
    let mut varbinds = Vec::new();
    while !list.is_empty() {
        let mut varbind = BerReader::new(list.expect(tag::SEQUENCE)?);
        let oid = Oid::decode(varbind.expect(tag::OBJECT_IDENTIFIER)?)?;
        let (value_tag, value) = varbind.read_tlv()?;
        let value = SnmpValue::decode(value_tag, value)?;
        varbinds.push(VarBind { oid, value });
    }

    Ok(Message {
        community,
        pdu_tag,
        request_id,
        error_status,
        error_index,
        varbinds,
    })
}

pub fn decode_response(bytes: &[u8]) -> Result<Message, SnmpError> {
    let message = decode_message(bytes)?;
    if message.pdu_tag != tag::GET_RESPONSE {
        return Err(SnmpError::UnexpectedPdu(message.pdu_tag));
    }
    Ok(message)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
