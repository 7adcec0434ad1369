//! Codec plugin contract
//!
//! A codec owns the protocol-specific logic for exactly one header type.
//! The packet manager drives every codec through the same four entry
//! points:
//!
//! - `decode`: validate and measure one header, name the next protocol
//! - `encode`: synthesize the header in front of an output buffer
//! - `update`: patch length fields once everything inside is written
//! - `format`: fix up a cloned packet against its original
//!
//! Codecs are registered through a static [`CodecApi`] table and are
//! immutable once the registry is built.

use serde::{Deserialize, Serialize};

use crate::core::{Buffer, CodecEvent, Packet, ProtoBits};
use crate::error::Result;
use crate::protocols::MacAddr;

pub mod codec_events;
pub mod root;

/// Inner-layer identifier (EtherType, IP protocol number, ...)
pub type ProtocolId = u16;

/// Version of the contract below; registrations must match it
pub const CODEC_API_VERSION: u32 = 0;

/// Index of a codec inside one registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CodecId(u8);

impl CodecId {
    pub(crate) fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// What follows a successfully decoded header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextProtocol {
    Id(ProtocolId),
    /// No further header, the rest is payload
    Payload,
}

/// Result of a successful `decode`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    /// Header bytes consumed
    pub length: u16,
    pub next: NextProtocol,
}

impl Decoded {
    pub fn new(length: u16, next: ProtocolId) -> Self {
        Self {
            length,
            next: NextProtocol::Id(next),
        }
    }

    pub fn payload(length: u16) -> Self {
        Self {
            length,
            next: NextProtocol::Payload,
        }
    }
}

/// Why a codec refused a header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodeFailure {
    /// Fewer bytes than the minimum header
    Truncated { needed: usize, available: usize },
    /// Ethernet type field carries an 802.3 length; not decoded further
    LegacyLength(u16),
    /// Header present but unusable
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodeDirection {
    /// Same direction as the template packet
    #[default]
    Forward,
    /// Reply to the template packet
    Reverse,
}

/// Encode policy for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EncodeFlags {
    pub direction: EncodeDirection,
    /// Skip link-layer synthesis
    pub raw: bool,
}

impl EncodeFlags {
    pub fn forward() -> Self {
        Self {
            direction: EncodeDirection::Forward,
            raw: false,
        }
    }

    pub fn reverse() -> Self {
        Self {
            direction: EncodeDirection::Reverse,
            raw: false,
        }
    }

    pub fn with_raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    pub fn is_forward(&self) -> bool {
        self.direction == EncodeDirection::Forward
    }

    pub fn is_reverse(&self) -> bool {
        self.direction == EncodeDirection::Reverse
    }
}

/// Context handed to each codec's `encode`
#[derive(Debug, Clone, Copy)]
pub struct EncState<'p> {
    pub flags: EncodeFlags,
    packet: &'p Packet<'p>,
    layer: usize,
    dst_mac: Option<&'p MacAddr>,
}

impl<'p> EncState<'p> {
    pub fn new(
        flags: EncodeFlags,
        packet: &'p Packet<'p>,
        layer: usize,
        dst_mac: Option<&'p MacAddr>,
    ) -> Self {
        Self {
            flags,
            packet,
            layer,
            dst_mac,
        }
    }

    pub fn forward(&self) -> bool {
        self.flags.is_forward()
    }

    pub fn reverse(&self) -> bool {
        self.flags.is_reverse()
    }

    pub fn raw(&self) -> bool {
        self.flags.raw
    }

    /// Template packet being encoded
    pub fn packet(&self) -> &'p Packet<'p> {
        self.packet
    }

    /// Stack index of the layer being encoded
    pub fn layer_index(&self) -> usize {
        self.layer
    }

    /// Encoding the link (root) layer
    pub fn is_outermost(&self) -> bool {
        self.layer == 0
    }

    /// Configured destination override for active response
    pub fn dst_mac(&self) -> Option<&'p MacAddr> {
        self.dst_mac
    }
}

/// One protocol layer's decoder/encoder
pub trait Codec: Send + Sync {
    fn name(&self) -> &'static str;

    /// Presence flag set when this codec decodes a layer
    fn proto_bits(&self) -> ProtoBits {
        ProtoBits::OTHER
    }

    /// Capture link types this codec roots; empty for inner codecs
    fn data_link_types(&self) -> &'static [i32] {
        &[]
    }

    /// Protocol ids this codec is dispatched by; empty for root-only codecs
    fn protocol_ids(&self) -> &'static [ProtocolId] {
        &[]
    }

    /// Decode the header at the front of `raw`.
    ///
    /// Must check `raw.len()` before every read. On failure no layer is
    /// recorded; the codec reports any anomaly itself through
    /// [`codec_events::decoder_event`].
    fn decode(&self, raw: &[u8], p: &mut Packet<'_>) -> std::result::Result<Decoded, DecodeFailure>;

    /// Write this layer's header in front of `out`, using `raw_in` (the
    /// template header) as the source of field values.
    fn encode(&self, raw_in: &[u8], _enc: &EncState<'_>, out: &mut Buffer) -> Result<()> {
        out.prepend(raw_in)
    }

    /// Patch length fields in `hdr` and return the running total including
    /// this header. Called innermost first.
    fn update(&self, hdr: &mut [u8], len: u32) -> u32 {
        len + hdr.len() as u32
    }

    /// Fix `clone` (a layer of a copied packet) against `orig`, the layer
    /// at the same index in the packet it was copied from.
    fn format(&self, _flags: EncodeFlags, _orig: &[u8], _clone: &mut [u8]) {}
}

/// Optional per-codec configuration and rule metadata
pub trait CodecModule: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn help(&self) -> &'static str;

    /// Decoder rules this codec can raise
    fn events(&self) -> &'static [CodecEvent] {
        &[]
    }
}

/// Static registration entry for one codec
pub struct CodecApi {
    pub name: &'static str,
    pub api_version: u32,
    pub mod_ctor: Option<fn() -> Box<dyn CodecModule>>,
    pub ctor: fn(Option<&dyn CodecModule>) -> Box<dyn Codec>,
}

impl std::fmt::Debug for CodecApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecApi")
            .field("name", &self.name)
            .field("api_version", &self.api_version)
            .field("has_module", &self.mod_ctor.is_some())
            .finish()
    }
}

/// Builtin codec table
pub static DEFAULT_CODECS: [CodecApi; 1] = [root::eth::ETH_API];
