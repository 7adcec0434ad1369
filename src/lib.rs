//! Packet decode/encode pipeline for the crmonban NIDS
//!
//! Raw link-layer frames are decoded into a stack of typed layers by a chain
//! of pluggable codecs, and decoded packets can be re-encoded (optionally as
//! a reply) for active response.
//!
//! ## Flow
//!
//! ```text
//! capture ─→ PacketManager::decode ─→ Packet ─→ detection
//!                                        │
//!                                        └─→ PacketManager::encode ─→ Buffer ─→ inject
//! ```
//!
//! ## Key Types
//!
//! - [`Codec`] - one protocol layer's decode/encode logic
//! - [`CodecManager`] - registry of codecs by link type and protocol id
//! - [`PacketManager`] - drives codecs over a whole packet
//! - [`Packet`] - raw frame plus decoded layer stack
//! - [`Buffer`] - front-growing encode output

pub mod codecs;
pub mod config;
pub mod core;
pub mod error;
pub mod managers;
pub mod protocols;

pub use codecs::{
    Codec, CodecApi, CodecId, CodecModule, DecodeFailure, Decoded, EncState, EncodeDirection,
    EncodeFlags, NextProtocol, ProtocolId, CODEC_API_VERSION, DEFAULT_CODECS,
};
pub use config::Config;
pub use crate::core::{
    Buffer, CaptureInfo, CodecEvent, DecodeEvent, DecodeStop, Layer, Packet, ProtoBits,
    DLT_EN10MB,
};
pub use error::{CodecError, Result};
pub use managers::{CodecManager, DecodeStatsSnapshot, PacketManager};
pub use protocols::{EtherHdr, MacAddr};
