//! Packet manager: drives codecs over whole packets
//!
//! ## Decode
//!
//! ```text
//! raw frame ─→ root codec (by link type) ─→ codec (by next id) ─→ ... ─→ payload
//!                   │                            │
//!                 Layer 0                      Layer 1
//! ```
//!
//! Decoding stops on, in priority order: a codec failure, a next protocol
//! with no registered codec, the layer limit, or the end of the frame.
//! Whatever prefix was decoded stays on the packet.
//!
//! ## Encode
//!
//! Layers are written innermost first into a front-growing [`Buffer`], so
//! the outermost header ends up first on the wire. A second pass, again
//! innermost first, lets each codec patch length fields with the size of
//! everything it encloses.

use smallvec::SmallVec;
use tracing::{debug, trace};

use super::codec_manager::CodecManager;
use super::stats::{DecodeStats, DecodeStatsSnapshot};
use crate::codecs::{
    codec_events, CodecId, DecodeFailure, EncState, EncodeFlags, NextProtocol, DEFAULT_CODECS,
};
use crate::config::Config;
use crate::core::{Buffer, CaptureInfo, CodecEvent, DecodeStop, Layer, Packet};
use crate::error::{CodecError, Result};
use crate::protocols::MacAddr;

pub struct PacketManager {
    codecs: CodecManager,
    max_layers: u8,
    buffer_size: usize,
    dst_mac: Option<MacAddr>,
    stats: DecodeStats,
}

impl PacketManager {
    pub fn new(codecs: CodecManager, config: &Config) -> Self {
        let stats = DecodeStats::new(codecs.len());
        Self {
            codecs,
            max_layers: config.decode.max_layers.max(1),
            buffer_size: config.encode.buffer_size,
            dst_mac: config.encode.dst_mac,
            stats,
        }
    }

    /// Builtin codecs with the given configuration
    pub fn with_config(config: &Config) -> Result<Self> {
        Ok(Self::new(CodecManager::new(&DEFAULT_CODECS)?, config))
    }

    pub fn codecs(&self) -> &CodecManager {
        &self.codecs
    }

    pub fn max_layers(&self) -> u8 {
        self.max_layers
    }

    /// Configured destination override for active response
    pub fn encode_get_dst_mac(&self) -> Option<&MacAddr> {
        self.dst_mac.as_ref()
    }

    pub fn stats(&self) -> DecodeStatsSnapshot {
        self.stats.snapshot(&self.codecs)
    }

    /// Decode `raw` into a layer stack.
    ///
    /// Never fails: anomalies are recorded on the returned packet and the
    /// undecoded tail is left as payload.
    pub fn decode<'a>(&self, raw: &'a [u8], pkth: CaptureInfo) -> Packet<'a> {
        DecodeStats::bump(&self.stats.packets);
        let mut p = Packet::new(raw, pkth);

        let Some(root) = self.codecs.root_for(pkth.dlt) else {
            trace!(dlt = pkth.dlt, "no codec for link type");
            codec_events::decoder_event(&mut p, CodecEvent::UnknownLinkType);
            DecodeStats::bump(&self.stats.unknown_link_type);
            p.set_stop(DecodeStop::UnknownLinkType(pkth.dlt));
            return p;
        };

        let stop = self.decode_layers(raw, root, &mut p);
        trace!(
            layers = p.num_layers(),
            payload = p.payload().len(),
            ?stop,
            "decode done"
        );
        p.set_stop(stop);
        p
    }

    fn decode_layers(&self, raw: &[u8], root: CodecId, p: &mut Packet<'_>) -> DecodeStop {
        let mut id = root;
        let mut proto_id = None;
        let mut offset = 0usize;

        loop {
            let Some(codec) = self.codecs.get(id) else {
                return DecodeStop::Failed(DecodeFailure::Invalid);
            };
            let remaining = &raw[offset..];

            let decoded = match codec.decode(remaining, p) {
                Ok(decoded) => decoded,
                Err(failure) => {
                    trace!(codec = codec.name(), ?failure, "decode failed");
                    self.stats.record_failure(&failure);
                    return DecodeStop::Failed(failure);
                }
            };

            let length = usize::from(decoded.length);
            if length > remaining.len() {
                codec_events::decoder_event(p, CodecEvent::LayerOverrun);
                DecodeStats::bump(&self.stats.overrun);
                return DecodeStop::Failed(DecodeFailure::Invalid);
            }

            p.push_layer(
                Layer {
                    codec: id,
                    proto_id,
                    start: offset,
                    length: decoded.length,
                },
                codec.proto_bits(),
            );
            self.stats.record_layer(id);
            offset += length;
            trace!(codec = codec.name(), length, next = ?decoded.next, "decoded layer");

            let next = match decoded.next {
                NextProtocol::Id(next) => next,
                NextProtocol::Payload => {
                    p.set_next_protocol(None);
                    return DecodeStop::Payload;
                }
            };
            p.set_next_protocol(Some(next));

            let Some(next_codec) = self.codecs.for_protocol(next) else {
                DecodeStats::bump(&self.stats.unknown_protocol);
                return DecodeStop::UnknownProtocol(next);
            };

            if p.num_layers() >= usize::from(self.max_layers) {
                codec_events::decoder_event(p, CodecEvent::TooManyLayers);
                DecodeStats::bump(&self.stats.depth_exceeded);
                return DecodeStop::DepthExceeded;
            }

            if offset >= raw.len() {
                return DecodeStop::Exhausted;
            }

            id = next_codec;
            proto_id = Some(next);
        }
    }

    /// Synthesize wire bytes from a decoded packet's layer stack.
    ///
    /// `payload` is placed after the innermost header. Any codec failure
    /// aborts the whole encode.
    pub fn encode(&self, p: &Packet<'_>, flags: EncodeFlags, payload: &[u8]) -> Result<Buffer> {
        match self.encode_layers(p, flags, payload) {
            Ok(out) => {
                DecodeStats::bump(&self.stats.encoded);
                Ok(out)
            }
            Err(e) => {
                debug!(error = %e, "encode failed");
                DecodeStats::bump(&self.stats.encode_failures);
                Err(e)
            }
        }
    }

    fn encode_layers(&self, p: &Packet<'_>, flags: EncodeFlags, payload: &[u8]) -> Result<Buffer> {
        let mut out = Buffer::new(self.buffer_size);
        if !payload.is_empty() {
            out.prepend(payload)?;
        }

        // (codec, buffer length before the write, header length)
        let mut written: SmallVec<[(CodecId, usize, usize); 8]> = SmallVec::new();

        for (i, lyr) in p.layers().iter().enumerate().rev() {
            let codec = self
                .codecs
                .get(lyr.codec)
                .ok_or(CodecError::UnknownCodec(lyr.codec))?;
            let raw_in = p.layer_bytes(i).ok_or(CodecError::InvalidLayer(i))?;
            let enc = EncState::new(flags, p, i, self.dst_mac.as_ref());

            let before = out.len();
            codec.encode(raw_in, &enc, &mut out)?;
            written.push((lyr.codec, before, out.len() - before));
        }

        let total = out.len();
        let mut len = payload.len() as u32;
        for &(id, before, hlen) in &written {
            if hlen == 0 {
                continue;
            }
            let codec = self.codecs.get(id).ok_or(CodecError::UnknownCodec(id))?;
            let start = total - before - hlen;
            len = codec.update(&mut out.data_mut()[start..start + hlen], len);
        }
        trace!(bytes = total, accounted = len, "encoded packet");

        Ok(out)
    }

    /// Fix up `clone`, a copy of `orig`, layer by layer
    pub fn format(&self, flags: EncodeFlags, orig: &Packet<'_>, clone: &mut Packet<'_>) {
        let layers = orig.num_layers().min(clone.num_layers());
        for i in 0..layers {
            let Some(codec) = clone.layer(i).and_then(|l| self.codecs.get(l.codec)) else {
                continue;
            };
            let (Some(ph), Some(ch)) = (orig.layer_bytes(i), clone.layer_bytes_mut(i)) else {
                continue;
            };
            codec.format(flags, ph, ch);
        }
    }
}

impl std::fmt::Debug for PacketManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketManager")
            .field("codecs", &self.codecs)
            .field("max_layers", &self.max_layers)
            .field("buffer_size", &self.buffer_size)
            .field("dst_mac", &self.dst_mac)
            .finish()
    }
}
