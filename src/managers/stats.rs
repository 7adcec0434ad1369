//! Decode/encode counters
//!
//! Lock-free so a single `PacketManager` can be shared by every packet
//! thread.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::codec_manager::CodecManager;
use crate::codecs::{CodecId, DecodeFailure};

#[derive(Debug, Default)]
pub struct DecodeStats {
    pub packets: AtomicU64,
    pub truncated: AtomicU64,
    pub legacy_length: AtomicU64,
    pub invalid: AtomicU64,
    pub unknown_link_type: AtomicU64,
    pub unknown_protocol: AtomicU64,
    pub depth_exceeded: AtomicU64,
    pub overrun: AtomicU64,
    pub encoded: AtomicU64,
    pub encode_failures: AtomicU64,
    /// Layers decoded, indexed by codec id
    codec_layers: Vec<AtomicU64>,
}

impl DecodeStats {
    pub fn new(num_codecs: usize) -> Self {
        Self {
            codec_layers: (0..num_codecs).map(|_| AtomicU64::new(0)).collect(),
            ..Default::default()
        }
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_layer(&self, id: CodecId) {
        if let Some(counter) = self.codec_layers.get(id.index()) {
            Self::bump(counter);
        }
    }

    pub fn record_failure(&self, failure: &DecodeFailure) {
        let counter = match failure {
            DecodeFailure::Truncated { .. } => &self.truncated,
            DecodeFailure::LegacyLength(_) => &self.legacy_length,
            DecodeFailure::Invalid => &self.invalid,
        };
        Self::bump(counter);
    }

    pub fn snapshot(&self, codecs: &CodecManager) -> DecodeStatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        let layers = codecs
            .iter()
            .filter_map(|(id, _)| {
                let name = codecs.name(id)?;
                let count = self.codec_layers.get(id.index()).map_or(0, load);
                Some((name.to_string(), count))
            })
            .collect();

        DecodeStatsSnapshot {
            packets: load(&self.packets),
            truncated: load(&self.truncated),
            legacy_length: load(&self.legacy_length),
            invalid: load(&self.invalid),
            unknown_link_type: load(&self.unknown_link_type),
            unknown_protocol: load(&self.unknown_protocol),
            depth_exceeded: load(&self.depth_exceeded),
            overrun: load(&self.overrun),
            encoded: load(&self.encoded),
            encode_failures: load(&self.encode_failures),
            layers,
        }
    }
}

/// Point-in-time copy of [`DecodeStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeStatsSnapshot {
    pub packets: u64,
    pub truncated: u64,
    pub legacy_length: u64,
    pub invalid: u64,
    pub unknown_link_type: u64,
    pub unknown_protocol: u64,
    pub depth_exceeded: u64,
    pub overrun: u64,
    pub encoded: u64,
    pub encode_failures: u64,
    /// Layers decoded per codec name
    pub layers: BTreeMap<String, u64>,
}

impl DecodeStatsSnapshot {
    /// Packets whose decode stopped on a codec failure
    pub fn failures(&self) -> u64 {
        self.truncated + self.legacy_length + self.invalid + self.overrun
    }
}
