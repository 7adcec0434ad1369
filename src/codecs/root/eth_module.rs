//! Ethernet codec module: name, help and the decoder rules it owns

use crate::codecs::CodecModule;
use crate::core::CodecEvent;

pub const CD_ETH_NAME: &str = "eth";
pub const CD_ETH_HELP: &str = "support for ethernet II framing (DLT 1)";

static ETH_RULES: [CodecEvent; 1] = [CodecEvent::EthHdrTrunc];

#[derive(Debug, Default)]
pub struct EthModule;

impl CodecModule for EthModule {
    fn name(&self) -> &'static str {
        CD_ETH_NAME
    }

    fn help(&self) -> &'static str {
        CD_ETH_HELP
    }

    fn events(&self) -> &'static [CodecEvent] {
        &ETH_RULES
    }
}
