//! Registry and dispatch
//!
//! - `CodecManager`: immutable codec registry built at startup
//! - `PacketManager`: decode/encode/format loops over a packet's layers
//! - `stats`: shared counters

pub mod codec_manager;
pub mod packet_manager;
pub mod stats;

pub use codec_manager::CodecManager;
pub use packet_manager::PacketManager;
pub use stats::{DecodeStats, DecodeStatsSnapshot};
