//! Ethernet II header layout
//!
//! Fields are extracted from byte offsets with explicit length checks; the
//! header is never overlaid on the raw buffer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

pub const ETH_ADDR_LEN: usize = 6;
pub const ETH_HDR_LEN: usize = 14;

/// Largest 802.3 length field; type values above this are EtherTypes.
pub const ETHERNET_MAX_LEN_ENCAP: u16 = 1500;

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;
pub const ETHERTYPE_8021Q: u16 = 0x8100;

pub const fn hdr_len() -> usize {
    ETH_HDR_LEN
}

pub const fn min_ethertype() -> u16 {
    ETHERNET_MAX_LEN_ENCAP
}

/// 48-bit hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddr(pub [u8; ETH_ADDR_LEN]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xff; ETH_ADDR_LEN]);

    pub fn new(bytes: [u8; ETH_ADDR_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ETH_ADDR_LEN] {
        &self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    fn from_slice(raw: &[u8]) -> Option<Self> {
        let bytes: [u8; ETH_ADDR_LEN] = raw.get(..ETH_ADDR_LEN)?.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = CodecError;

    /// Accepts `aa:bb:cc:dd:ee:ff` or `aa-bb-cc-dd-ee-ff`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CodecError::InvalidMac(s.to_string());

        let mut bytes = [0u8; ETH_ADDR_LEN];
        let mut parts = s.trim().split([':', '-']);
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || part.len() > 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for MacAddr {
    type Error = CodecError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MacAddr> for String {
    fn from(mac: MacAddr) -> Self {
        mac.to_string()
    }
}

/// Decoded Ethernet II header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EtherHdr {
    pub ether_dst: MacAddr,
    pub ether_src: MacAddr,
    pub ether_type: u16,
}

impl EtherHdr {
    /// Read the fixed header from the front of `raw`, `None` if it is short
    pub fn parse(raw: &[u8]) -> Option<Self> {
        if raw.len() < ETH_HDR_LEN {
            return None;
        }

        Some(Self {
            ether_dst: MacAddr::from_slice(&raw[0..6])?,
            ether_src: MacAddr::from_slice(&raw[6..12])?,
            ether_type: u16::from_be_bytes([raw[12], raw[13]]),
        })
    }

    /// Wire representation, type in network order
    pub fn to_bytes(&self) -> [u8; ETH_HDR_LEN] {
        let mut out = [0u8; ETH_HDR_LEN];
        out[0..6].copy_from_slice(&self.ether_dst.0);
        out[6..12].copy_from_slice(&self.ether_src.0);
        out[12..14].copy_from_slice(&self.ether_type.to_be_bytes());
        out
    }

    /// Type field holds an 802.3 length rather than an EtherType
    pub fn is_length_field(&self) -> bool {
        self.ether_type <= min_ethertype()
    }
}
