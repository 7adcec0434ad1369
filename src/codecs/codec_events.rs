//! Decoder event reporting for codecs

use tracing::debug;

use crate::core::{CodecEvent, DecodeEvent, Packet};

/// Record `kind` against `p`.
///
/// Never alters control flow; the caller decides whether to abandon the
/// current layer.
pub fn decoder_event(p: &mut Packet<'_>, kind: CodecEvent) {
    let event = DecodeEvent {
        kind,
        layer: u8::try_from(p.num_layers()).unwrap_or(u8::MAX),
        offset: p.decoded_len(),
    };
    debug!(
        gid = event.gid(),
        sid = event.sid(),
        layer = event.layer,
        offset = event.offset,
        "decoder event: {}",
        kind.msg()
    );
    p.push_event(event);
}
