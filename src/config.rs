//! Decoder configuration
//!
//! Loaded from TOML once before the first packet and read-only afterwards.
//!
//! ```toml
//! [decode]
//! max_layers = 40
//!
//! [encode]
//! dst_mac = "02:00:00:00:00:01"
//! buffer_size = 65791
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::core::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_LAYERS, SPARC_TWIDDLE};
use crate::error::{CodecError, Result};
use crate::protocols::eth::ETH_HDR_LEN;
use crate::protocols::MacAddr;

/// Root configuration structure
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Decode loop settings
    pub decode: DecodeConfig,

    /// Active response encoding
    pub encode: EncodeConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Maximum decoded layers per packet
    pub max_layers: u8,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_layers: DEFAULT_MAX_LAYERS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// Destination MAC for injected packets instead of the original peer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_mac: Option<MacAddr>,

    /// Output buffer capacity in bytes
    pub buffer_size: usize,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            dst_mac: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| CodecError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to a TOML string
    pub fn to_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CodecError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.decode.max_layers == 0 {
            return Err(CodecError::ConfigError(
                "decode.max_layers must be at least 1".to_string(),
            ));
        }
        // room for the link header and its alignment pad
        let min_buffer = ETH_HDR_LEN + SPARC_TWIDDLE;
        if self.encode.buffer_size < min_buffer {
            return Err(CodecError::ConfigError(format!(
                "encode.buffer_size must be at least {} bytes",
                min_buffer
            )));
        }
        if let Some(mac) = &self.encode.dst_mac {
            if mac.is_multicast() {
                warn!("encode.dst_mac {} is a group address", mac);
            }
        }
        Ok(())
    }
}
