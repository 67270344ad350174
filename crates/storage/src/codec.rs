//! Typed serialization for records, definitions, WAL entries, and
//! snapshots, with optional block compression (spec §2 "Codec").
//!
//! Serialization itself is always `bincode`; [`StorageCodec`] is the seam
//! that varies — identity passthrough or zstd compression of the encoded
//! block — so it stays object-safe (`Box<dyn StorageCodec>`) while
//! [`encode`]/[`decode`] stay generic over the payload type.

use serde::{de::DeserializeOwned, Serialize};
use syncopate_core::error::{Error, Result};

/// The compression stage applied to an already-serialized block.
pub trait StorageCodec: Send + Sync {
    /// Compress (or pass through) an encoded block.
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>>;

    /// Reverse [`StorageCodec::compress`].
    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>>;
}

/// No compression. Used when the `block compression enabled` config flag
/// is off.
pub struct PlainCodec;

impl StorageCodec for PlainCodec {
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }

    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

/// zstd block compression. Used when the `block compression enabled`
/// config flag is on.
pub struct CompressedCodec {
    level: i32,
}

impl CompressedCodec {
    /// Build a codec at the given zstd compression level.
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Default for CompressedCodec {
    fn default() -> Self {
        Self::new(3)
    }
}

impl StorageCodec for CompressedCodec {
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        zstd::encode_all(bytes, self.level).map_err(|e| Error::Corruption(format!("compress: {e}")))
    }

    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        zstd::decode_all(bytes).map_err(|e| Error::Corruption(format!("decompress: {e}")))
    }
}

/// Build the codec named by the `block compression enabled` config flag.
pub fn codec_for(compression_enabled: bool) -> Box<dyn StorageCodec> {
    if compression_enabled {
        Box::new(CompressedCodec::default())
    } else {
        Box::new(PlainCodec)
    }
}

/// Serialize `value` with `bincode`, then run it through `codec`'s
/// compression stage. This is the one typed-encoding path every crate
/// above storage uses for WAL entries, snapshots, and definition records.
pub fn encode<T: Serialize>(codec: &dyn StorageCodec, value: &T) -> Result<Vec<u8>> {
    let raw = bincode::serialize(value).map_err(|e| Error::Corruption(format!("encode: {e}")))?;
    codec.compress(&raw)
}

/// Reverse of [`encode`].
pub fn decode<T: DeserializeOwned>(codec: &dyn StorageCodec, bytes: &[u8]) -> Result<T> {
    let raw = codec.decompress(bytes)?;
    bincode::deserialize(&raw).map_err(|e| Error::Corruption(format!("decode: {e}")))
}
