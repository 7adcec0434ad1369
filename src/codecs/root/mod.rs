//! Root codecs, selected by capture link type

pub mod eth;
pub mod eth_module;

pub use eth::{EthCodec, ETH_API};
pub use eth_module::EthModule;
