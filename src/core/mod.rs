//! Core per-packet data structures
//!
//! - `Packet`: raw frame plus the decoded layer stack
//! - `Buffer`: front-growing output for encode
//! - `event`: decoder anomaly records

pub mod buffer;
pub mod event;
pub mod packet;

pub use buffer::{Buffer, DEFAULT_BUFFER_SIZE, SPARC_TWIDDLE};
pub use event::{CodecEvent, DecodeEvent, GID_DECODE};
pub use packet::{
    CaptureInfo, DecodeStop, Layer, Packet, ProtoBits, DEFAULT_MAX_LAYERS, DLT_EN10MB,
};
