//! Decoded packet record
//!
//! A `Packet` borrows the captured frame and records where each decoded
//! header sits inside it. Layers are appended only by the packet manager,
//! in wire order, and never overlap.

use std::borrow::Cow;
use std::ops::Range;

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::event::DecodeEvent;
use crate::codecs::{CodecId, DecodeFailure, ProtocolId};

/// Default bound on decoded layers per packet
pub const DEFAULT_MAX_LAYERS: u8 = 40;

/// Link type for Ethernet captures (pcap `DLT_EN10MB`)
pub const DLT_EN10MB: i32 = 1;

bitflags! {
    /// Protocol families seen in the current packet
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ProtoBits: u32 {
        const ETH = 1 << 0;
        const VLAN = 1 << 1;
        const ARP = 1 << 2;
        const PPPOE = 1 << 3;
        const MPLS = 1 << 4;
        const IP4 = 1 << 5;
        const IP6 = 1 << 6;
        const IP6_EXT = 1 << 7;
        const GRE = 1 << 8;
        const TCP = 1 << 9;
        const UDP = 1 << 10;
        const ICMP4 = 1 << 11;
        const ICMP6 = 1 << 12;
        const TEREDO = 1 << 13;
        const OTHER = 1 << 31;
    }
}

/// Capture metadata supplied with the raw frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureInfo {
    /// Link-layer type tag from the capture source
    pub dlt: i32,
    pub timestamp: DateTime<Utc>,
    /// Length on the wire, may exceed the captured bytes
    pub pktlen: u32,
}

impl CaptureInfo {
    pub fn new(dlt: i32, pktlen: u32) -> Self {
        Self {
            dlt,
            timestamp: Utc::now(),
            pktlen,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Position of one decoded header inside the raw frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// Codec that decoded the header
    pub codec: CodecId,
    /// Id this layer was dispatched by; `None` for the root layer
    pub proto_id: Option<ProtocolId>,
    /// Offset into the raw frame
    pub start: usize,
    pub length: u16,
}

impl Layer {
    pub fn end(&self) -> usize {
        self.start + usize::from(self.length)
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// Why decoding of a packet stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodeStop {
    /// Packet has not been through the decoder
    NotDecoded,
    /// Last codec reported no further header
    Payload,
    /// No root codec for this link type; whole frame is payload
    UnknownLinkType(i32),
    /// No codec for the next protocol; remaining bytes are payload
    UnknownProtocol(ProtocolId),
    /// A codec rejected its header
    Failed(DecodeFailure),
    /// Layer limit reached
    DepthExceeded,
    /// No bytes left to decode
    Exhausted,
}

/// Per-packet decode state
#[derive(Debug, Clone)]
pub struct Packet<'a> {
    raw: Cow<'a, [u8]>,
    layers: SmallVec<[Layer; 8]>,
    /// Families present in `layers`
    pub proto_bits: ProtoBits,
    pub pkth: CaptureInfo,
    events: SmallVec<[DecodeEvent; 2]>,
    next_prot_id: Option<ProtocolId>,
    stop: DecodeStop,
}

impl<'a> Packet<'a> {
    pub fn new(raw: &'a [u8], pkth: CaptureInfo) -> Self {
        Self {
            raw: Cow::Borrowed(raw),
            layers: SmallVec::new(),
            proto_bits: ProtoBits::empty(),
            pkth,
            events: SmallVec::new(),
            next_prot_id: None,
            stop: DecodeStop::NotDecoded,
        }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Captured length
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    /// Header bytes of one layer
    pub fn layer_bytes(&self, index: usize) -> Option<&[u8]> {
        let range = self.layers.get(index)?.range();
        self.raw.get(range)
    }

    /// Mutable header bytes; copies a borrowed frame on first use
    pub fn layer_bytes_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        let range = self.layers.get(index)?.range();
        self.raw.to_mut().get_mut(range)
    }

    /// Bytes covered by decoded layers
    pub fn decoded_len(&self) -> usize {
        self.layers.last().map_or(0, Layer::end)
    }

    /// Bytes following the last decoded header
    pub fn payload(&self) -> &[u8] {
        self.raw.get(self.decoded_len()..).unwrap_or_default()
    }

    pub fn has(&self, bits: ProtoBits) -> bool {
        self.proto_bits.contains(bits)
    }

    pub fn is_eth(&self) -> bool {
        self.has(ProtoBits::ETH)
    }

    pub fn events(&self) -> &[DecodeEvent] {
        &self.events
    }

    /// Next protocol announced by the innermost decoded layer
    pub fn next_protocol(&self) -> Option<ProtocolId> {
        self.next_prot_id
    }

    pub fn stop_reason(&self) -> DecodeStop {
        self.stop
    }

    /// Copy of this packet that owns its bytes, for use as a response template
    pub fn clone_owned(&self) -> Packet<'static> {
        Packet {
            raw: Cow::Owned(self.raw.to_vec()),
            layers: self.layers.clone(),
            proto_bits: self.proto_bits,
            pkth: self.pkth,
            events: self.events.clone(),
            next_prot_id: self.next_prot_id,
            stop: self.stop,
        }
    }

    pub fn into_owned(self) -> Packet<'static> {
        Packet {
            raw: Cow::Owned(self.raw.into_owned()),
            layers: self.layers,
            proto_bits: self.proto_bits,
            pkth: self.pkth,
            events: self.events,
            next_prot_id: self.next_prot_id,
            stop: self.stop,
        }
    }

    pub(crate) fn push_layer(&mut self, layer: Layer, bits: ProtoBits) {
        debug_assert_eq!(layer.start, self.decoded_len());
        debug_assert!(layer.end() <= self.raw.len());
        self.layers.push(layer);
        self.proto_bits |= bits;
    }

    pub(crate) fn push_event(&mut self, event: DecodeEvent) {
        self.events.push(event);
    }

    pub(crate) fn set_next_protocol(&mut self, id: Option<ProtocolId>) {
        self.next_prot_id = id;
    }

    pub(crate) fn set_stop(&mut self, stop: DecodeStop) {
        self.stop = stop;
    }
}
