//! Container body serialization
//!
//! A row body is the container serialized with the store's
//! [`SerializationFormat`] and then encoded with its codec. The container's
//! own identifier is never part of the body; it is the row key.

use crate::codec::{get_codec, StorageCodec};
use crate::format::{CompressionFormat, SerializationFormat};
use chronicle_core::containers::*;
use chronicle_core::{with_container, AttributeContainer, ContainerType, Error, Result};

/// Serializes containers to row bodies and back
pub struct ContainerSerializer {
    serialization_format: SerializationFormat,
    codec: Box<dyn StorageCodec>,
}

impl std::fmt::Debug for ContainerSerializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerSerializer")
            .field("serialization_format", &self.serialization_format)
            .field("compression_format", &self.codec.compression_format())
            .finish()
    }
}

impl ContainerSerializer {
    /// Create a serializer for a format pair
    pub fn new(
        serialization_format: SerializationFormat,
        compression_format: CompressionFormat,
    ) -> Self {
        ContainerSerializer {
            serialization_format,
            codec: get_codec(compression_format),
        }
    }

    /// Serialization format in use
    pub fn serialization_format(&self) -> SerializationFormat {
        self.serialization_format
    }

    /// Compression format in use
    pub fn compression_format(&self) -> CompressionFormat {
        self.codec.compression_format()
    }

    /// Serialize a container into a row body
    pub fn serialize(&self, container: &AttributeContainer) -> Result<Vec<u8>> {
        let format = self.serialization_format;
        let bytes = with_container!(container, c => serialize_body(format, c))?;
        Ok(self.codec.encode(&bytes)?)
    }

    /// Deserialize a row body of a given container type
    ///
    /// The returned container has no identifier; the caller back-fills it
    /// from the row key.
    pub fn deserialize(
        &self,
        container_type: ContainerType,
        data: &[u8],
    ) -> Result<AttributeContainer> {
        let bytes = self.codec.decode(data)?;
        let format = self.serialization_format;
        let container = match container_type {
            ContainerType::Event => deserialize_body::<Event>(format, &bytes)?.into(),
            ContainerType::EventData => deserialize_body::<EventData>(format, &bytes)?.into(),
            ContainerType::EventDataStream => {
                deserialize_body::<EventDataStream>(format, &bytes)?.into()
            }
            ContainerType::EventSource => deserialize_body::<EventSource>(format, &bytes)?.into(),
            ContainerType::EventTag => deserialize_body::<EventTag>(format, &bytes)?.into(),
            ContainerType::SessionStart => {
                deserialize_body::<SessionStart>(format, &bytes)?.into()
            }
            ContainerType::SessionCompletion => {
                deserialize_body::<SessionCompletion>(format, &bytes)?.into()
            }
            ContainerType::SessionConfiguration => {
                deserialize_body::<SessionConfiguration>(format, &bytes)?.into()
            }
            ContainerType::SystemConfiguration => {
                deserialize_body::<SystemConfiguration>(format, &bytes)?.into()
            }
            ContainerType::TaskStart => deserialize_body::<TaskStart>(format, &bytes)?.into(),
            ContainerType::TaskCompletion => {
                deserialize_body::<TaskCompletion>(format, &bytes)?.into()
            }
        };
        Ok(container)
    }
}

fn serialize_body<C: Container>(format: SerializationFormat, container: &C) -> Result<Vec<u8>> {
    match format {
        SerializationFormat::Json => Ok(serde_json::to_vec(container)?),
        // Named fields: bodies skip absent optional fields, which positional
        // encoding cannot represent.
        SerializationFormat::MessagePack => {
            rmp_serde::to_vec_named(container).map_err(Error::serialization)
        }
    }
}

fn deserialize_body<C: Container>(format: SerializationFormat, bytes: &[u8]) -> Result<C> {
    match format {
        SerializationFormat::Json => Ok(serde_json::from_slice(bytes)?),
        SerializationFormat::MessagePack => {
            rmp_serde::from_slice(bytes).map_err(Error::serialization)
        }
    }
}
