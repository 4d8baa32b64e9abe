use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use zstd::{decode_all, encode_all};

use crate::SaveError;

/// Bump this value whenever the on-disk [`PersistedRecord`] layout changes.
pub const STORE_SCHEMA_VERSION: u16 = 1;

/// On-disk form of one store entry. The image id is the backend key.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PersistedRecord {
    pub schema_version: u16,
    /// Version tag of the encoder model that produced `vector`.
    pub model_version: String,
    pub vector: Vec<f32>,
}

/// Compression codec options for persisted records.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CompressionCodec {
    /// Store raw bincode bytes.
    None,
    /// Zstd compression.
    #[default]
    Zstd,
}

/// Compression behavior configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressionConfig {
    pub codec: CompressionCodec,
    /// Zstd level (1-22).
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: 3,
        }
    }
}

impl CompressionConfig {
    pub fn new(codec: CompressionCodec, level: i32) -> Self {
        Self { codec, level }
    }

    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => encode_all(data, self.level),
        }
    }

    fn decompress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => decode_all(data),
        }
    }
}

/// Serializes and compresses a record for the backend.
pub(crate) fn encode_record(
    rec: &PersistedRecord,
    compression: &CompressionConfig,
) -> Result<Vec<u8>, SaveError> {
    let encoded = encode_to_vec(rec, standard()).map_err(|e| SaveError::Encode(e.to_string()))?;
    compression
        .compress(&encoded)
        .map_err(|e| SaveError::Compression(e.to_string()))
}

/// Decompresses and decodes a record read from the backend.
pub(crate) fn decode_record(
    data: &[u8],
    compression: &CompressionConfig,
) -> Result<PersistedRecord, String> {
    let decompressed = compression.decompress(data).map_err(|e| e.to_string())?;
    let (record, _) =
        decode_from_slice(&decompressed, standard()).map_err(|e| e.to_string())?;
    Ok(record)
}
