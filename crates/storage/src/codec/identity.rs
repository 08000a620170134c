//! Identity codec (no transformation).
//!
//! Used for stores whose compression format is `none`.

use super::traits::{CodecError, StorageCodec};
use crate::format::CompressionFormat;

/// Identity codec - no transformation.
///
/// # Example
///
/// ```
/// use chronicle_storage::codec::{StorageCodec, IdentityCodec};
///
/// let codec = IdentityCodec;
/// let data = b"hello world";
///
/// let encoded = codec.encode(data).unwrap();
/// assert_eq!(data.as_slice(), encoded.as_slice());
///
/// let decoded = codec.decode(&encoded).unwrap();
/// assert_eq!(data.as_slice(), decoded.as_slice());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl StorageCodec for IdentityCodec {
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }

    fn compression_format(&self) -> CompressionFormat {
        CompressionFormat::None
    }
}
