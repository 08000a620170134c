//! Zstandard codec.

use super::traits::{CodecError, StorageCodec};
use crate::format::CompressionFormat;

/// Zstandard codec.
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    level: i32,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        ZstdCodec { level: 3 }
    }
}

impl StorageCodec for ZstdCodec {
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        ::zstd::encode_all(data, self.level).map_err(|e| CodecError::EncodeError(e.to_string()))
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        ::zstd::decode_all(data).map_err(|e| CodecError::DecodeError(e.to_string()))
    }

    fn compression_format(&self) -> CompressionFormat {
        CompressionFormat::Zstd
    }
}
