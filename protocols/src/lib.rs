//! Wire codecs used by the discovery engine.
//!
//! Everything here is pure: bytes in, typed values out (and back). Sockets,
//! timeouts and retries belong to `autodisco-core`.

pub mod ber;
pub mod oid;
pub mod snmp;
