//! Storage codec trait definitions.

use crate::format::CompressionFormat;

/// Storage codec trait.
///
/// Every serialized container body passes through the store's codec before
/// it is written and after it is read.
///
/// # Thread Safety
///
/// Codecs must be `Send + Sync` so a transient space can be shared between
/// task threads.
///
/// # Codec Identity
///
/// Each codec corresponds to one [`CompressionFormat`], which is recorded in
/// the store metadata. Reopening a store always uses the codec named there.
pub trait StorageCodec: Send + Sync {
    /// Encode bytes for storage.
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Decode bytes from storage.
    ///
    /// Reverses the encode operation. Returns an error if the data
    /// cannot be decoded (e.g., truncated or corrupt compressed data).
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Compression format implemented by this codec.
    fn compression_format(&self) -> CompressionFormat;
}

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Encoding failed.
    #[error("Encode error: {0}")]
    EncodeError(String),

    /// Decoding failed (e.g., invalid compressed stream).
    #[error("Decode error: {0}")]
    DecodeError(String),
}

impl From<CodecError> for chronicle_core::Error {
    fn from(e: CodecError) -> Self {
        chronicle_core::Error::Serialization(e.to_string())
    }
}
