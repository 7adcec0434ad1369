//! Ethernet II root codec

use tracing::trace;

use super::eth_module::{EthModule, CD_ETH_NAME};
use crate::codecs::{
    codec_events, Codec, CodecApi, CodecModule, DecodeFailure, Decoded, EncState, EncodeFlags,
    CODEC_API_VERSION,
};
use crate::core::{Buffer, CodecEvent, Packet, ProtoBits, DLT_EN10MB, SPARC_TWIDDLE};
use crate::error::{CodecError, Result};
use crate::protocols::eth::{self, EtherHdr, ETH_ADDR_LEN, ETH_HDR_LEN};

static ETH_DLTS: [i32; 1] = [DLT_EN10MB];

#[derive(Debug, Default)]
pub struct EthCodec;

impl Codec for EthCodec {
    fn name(&self) -> &'static str {
        CD_ETH_NAME
    }

    fn proto_bits(&self) -> ProtoBits {
        ProtoBits::ETH
    }

    fn data_link_types(&self) -> &'static [i32] {
        &ETH_DLTS
    }

    fn decode(
        &self,
        raw: &[u8],
        p: &mut Packet<'_>,
    ) -> std::result::Result<Decoded, DecodeFailure> {
        let Some(eh) = EtherHdr::parse(raw) else {
            trace!("truncated eth header ({} bytes)", raw.len());
            codec_events::decoder_event(p, CodecEvent::EthHdrTrunc);
            return Err(DecodeFailure::Truncated {
                needed: eth::hdr_len(),
                available: raw.len(),
            });
        };

        trace!(
            "{} -> {} type:0x{:04X} len:0x{:X}",
            eh.ether_src,
            eh.ether_dst,
            eh.ether_type,
            p.pkth.pktlen
        );

        if eh.is_length_field() {
            // 802.3 frame; nothing we can dispatch on
            return Err(DecodeFailure::LegacyLength(eh.ether_type));
        }

        Ok(Decoded::new(ETH_HDR_LEN as u16, eh.ether_type))
    }

    fn encode(&self, raw_in: &[u8], enc: &EncState<'_>, out: &mut Buffer) -> Result<()> {
        // raw ip: the outermost link header is left to the transport.
        // encapsulated ethernet is always written.
        if enc.raw() && enc.is_outermost() {
            return Ok(());
        }

        let hi = EtherHdr::parse(raw_in).ok_or(CodecError::TemplateTooShort {
            codec: CD_ETH_NAME,
            needed: ETH_HDR_LEN,
            available: raw_in.len(),
        })?;

        if !enc.raw() {
            out.align(SPARC_TWIDDLE);
        }

        let (src, dst) = if enc.forward() {
            (hi.ether_src, hi.ether_dst)
        } else {
            (hi.ether_dst, hi.ether_src)
        };

        let ho = EtherHdr {
            ether_dst: enc.dst_mac().copied().unwrap_or(dst),
            ether_src: src,
            ether_type: hi.ether_type,
        };
        out.prepend(&ho.to_bytes())
    }

    fn update(&self, _hdr: &mut [u8], len: u32) -> u32 {
        len + ETH_HDR_LEN as u32
    }

    fn format(&self, flags: EncodeFlags, orig: &[u8], clone: &mut [u8]) {
        if !flags.is_reverse() || clone.len() < ETH_HDR_LEN {
            return;
        }
        let Some(ph) = EtherHdr::parse(orig) else {
            return;
        };

        clone[..ETH_ADDR_LEN].copy_from_slice(ph.ether_src.as_bytes());
        clone[ETH_ADDR_LEN..2 * ETH_ADDR_LEN].copy_from_slice(ph.ether_dst.as_bytes());
    }
}

fn mod_ctor() -> Box<dyn CodecModule> {
    Box::new(EthModule)
}

fn ctor(_module: Option<&dyn CodecModule>) -> Box<dyn Codec> {
    Box::new(EthCodec)
}

pub const ETH_API: CodecApi = CodecApi {
    name: CD_ETH_NAME,
    api_version: CODEC_API_VERSION,
    mod_ctor: Some(mod_ctor),
    ctor,
};
