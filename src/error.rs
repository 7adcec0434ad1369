use thiserror::Error;

use crate::codecs::{CodecId, ProtocolId};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("codec {0} registered twice")]
    DuplicateCodec(&'static str),

    #[error("link type {dlt} claimed by both {existing} and {codec}")]
    DuplicateDataLink {
        dlt: i32,
        existing: &'static str,
        codec: &'static str,
    },

    #[error("protocol id 0x{id:04X} claimed by both {existing} and {codec}")]
    DuplicateProtocolId {
        id: ProtocolId,
        existing: &'static str,
        codec: &'static str,
    },

    #[error("codec {name} built against api version {got}, expected {expected}")]
    ApiVersion {
        name: &'static str,
        expected: u32,
        got: u32,
    },

    #[error("too many codecs registered (limit {0})")]
    TooManyCodecs(usize),

    #[error("no codec with id {0:?}")]
    UnknownCodec(CodecId),

    #[error("layer {0} is not part of the packet")]
    InvalidLayer(usize),

    #[error("{codec} template too short: need {needed} bytes, have {available}")]
    TemplateTooShort {
        codec: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("encode buffer full: need {needed} bytes, {available} left")]
    BufferFull { needed: usize, available: usize },

    #[error("invalid MAC address: {0}")]
    InvalidMac(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;
