//! Decoder anomaly events
//!
//! Events are recorded on the packet that triggered them and travel with it
//! to the detection engine; raising one never changes decode control flow.

use serde::{Deserialize, Serialize};

/// Generator id shared by all builtin decoder rules
pub const GID_DECODE: u32 = 116;

/// Kinds of decode anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecEvent {
    /// Frame shorter than the fixed Ethernet header
    EthHdrTrunc,
    /// No root codec for the capture link type
    UnknownLinkType,
    /// Encapsulation deeper than the configured layer limit
    TooManyLayers,
    /// Codec claimed more bytes than the frame holds
    LayerOverrun,
}

impl CodecEvent {
    /// Rule id under [`GID_DECODE`]
    pub fn sid(self) -> u32 {
        match self {
            CodecEvent::EthHdrTrunc => 424,
            CodecEvent::UnknownLinkType => 450,
            CodecEvent::TooManyLayers => 461,
            CodecEvent::LayerOverrun => 462,
        }
    }

    pub fn msg(self) -> &'static str {
        match self {
            CodecEvent::EthHdrTrunc => "truncated eth header",
            CodecEvent::UnknownLinkType => "unknown datalink type",
            CodecEvent::TooManyLayers => "too many protocols present",
            CodecEvent::LayerOverrun => "layer length exceeds captured data",
        }
    }
}

impl std::fmt::Display for CodecEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}:{}) {}", GID_DECODE, self.sid(), self.msg())
    }
}

/// One recorded anomaly and where in the packet it was raised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeEvent {
    pub kind: CodecEvent,
    /// Number of layers already decoded when the event fired
    pub layer: u8,
    /// Raw offset of the header being decoded
    pub offset: usize,
}

impl DecodeEvent {
    pub fn gid(&self) -> u32 {
        GID_DECODE
    }

    pub fn sid(&self) -> u32 {
        self.kind.sid()
    }
}
