//! Storage codec abstraction.
//!
//! Container bodies are serialized first and then passed through the codec
//! named by the store's `compression_format` metadata value.
//!
//! # Usage
//!
//! ```ignore
//! use chronicle_storage::codec::get_codec;
//! use chronicle_storage::format::CompressionFormat;
//!
//! let codec = get_codec(CompressionFormat::Zlib);
//! let encoded = codec.encode(b"hello world")?;
//! let decoded = codec.decode(&encoded)?;
//! ```

mod identity;
mod traits;
mod zlib;
mod zstd_codec;

pub use identity::IdentityCodec;
pub use traits::{CodecError, StorageCodec};
pub use zlib::ZlibCodec;
pub use zstd_codec::ZstdCodec;

use crate::format::CompressionFormat;

/// Get the codec for a compression format.
///
/// Every [`CompressionFormat`] has a codec, so this cannot fail; unknown
/// format names are rejected earlier, when metadata or configuration is parsed.
pub fn get_codec(format: CompressionFormat) -> Box<dyn StorageCodec> {
    match format {
        CompressionFormat::None => Box::new(IdentityCodec),
        CompressionFormat::Zlib => Box::new(ZlibCodec::default()),
        CompressionFormat::Zstd => Box::new(ZstdCodec::default()),
    }
}
