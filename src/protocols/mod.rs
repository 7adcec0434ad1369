//! Wire layouts for the headers the codecs read and write

pub mod eth;

pub use eth::{EtherHdr, MacAddr};
