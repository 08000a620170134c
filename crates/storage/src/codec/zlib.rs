//! Zlib codec.
//!
//! Row bodies are compressed individually, so every row can be decoded
//! without reading its neighbours.

use super::traits::{CodecError, StorageCodec};
use crate::format::CompressionFormat;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Zlib (deflate) codec.
#[derive(Debug, Clone, Copy)]
pub struct ZlibCodec {
    level: u32,
}

impl Default for ZlibCodec {
    fn default() -> Self {
        ZlibCodec { level: 6 }
    }
}

impl ZlibCodec {
    /// Create a codec with an explicit compression level (0-9).
    pub fn with_level(level: u32) -> Self {
        ZlibCodec {
            level: level.min(9),
        }
    }
}

impl StorageCodec for ZlibCodec {
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(data)
            .map_err(|e| CodecError::EncodeError(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| CodecError::EncodeError(e.to_string()))
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut decoded = Vec::new();
        ZlibDecoder::new(data)
            .read_to_end(&mut decoded)
            .map_err(|e| CodecError::DecodeError(e.to_string()))?;
        Ok(decoded)
    }

    fn compression_format(&self) -> CompressionFormat {
        CompressionFormat::Zlib
    }
}
