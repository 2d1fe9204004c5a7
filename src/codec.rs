//! Pluggable byte codecs.
//!
//! A [`Codec`] turns a [`SerializedChunk`] into bytes and back. Framing,
//! varints and tag schemas are the codec's own business; the only contract
//! is `decode(encode(c)) == c` for any legal chunk `c`. Any number of wire
//! formats may implement this trait against the same chunk model.
//!
//! Two backends ship with the crate: [`JsonCodec`] (human-readable
//! interchange) and [`BinaryCodec`] (compact bincode framing). The optional
//! `lz4` feature adds [`Lz4Codec`], a compressing adapter over any inner
//! codec.

use crate::chunk::SerializedChunk;
use crate::error::{FlatModelError, Result};

/// Byte encoding boundary for chunks.
///
/// Implementations must be lossless: `decode(encode(c)) == c`.
pub trait Codec {
    /// Encodes a chunk to bytes.
    fn encode(&self, chunk: &SerializedChunk) -> Result<Vec<u8>>;

    /// Decodes bytes back into a chunk.
    fn decode(&self, bytes: &[u8]) -> Result<SerializedChunk>;
}

/// JSON wire format (UTF-8, camelCase keys).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, chunk: &SerializedChunk) -> Result<Vec<u8>> {
        serde_json::to_vec(chunk).map_err(|e| FlatModelError::Codec(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<SerializedChunk> {
        serde_json::from_slice(bytes).map_err(|e| FlatModelError::Codec(e.to_string()))
    }
}

/// Compact binary wire format (bincode, standard configuration).
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl Codec for BinaryCodec {
    fn encode(&self, chunk: &SerializedChunk) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(chunk, bincode::config::standard())
            .map_err(|e| FlatModelError::Codec(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<SerializedChunk> {
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map(|(chunk, _)| chunk)
            .map_err(|e| FlatModelError::Codec(e.to_string()))
    }
}

/// LZ4-compressing adapter over any inner codec.
///
/// Encodes through the inner codec, then compresses with a size-prepended
/// LZ4 block; decoding reverses both steps.
#[cfg(feature = "lz4")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Codec<C: Codec>(pub C);

#[cfg(feature = "lz4")]
impl<C: Codec> Codec for Lz4Codec<C> {
    fn encode(&self, chunk: &SerializedChunk) -> Result<Vec<u8>> {
        let inner = self.0.encode(chunk)?;
        Ok(lz4_flex::compress_prepend_size(&inner))
    }

    fn decode(&self, bytes: &[u8]) -> Result<SerializedChunk> {
        let inner = lz4_flex::decompress_size_prepended(bytes)
            .map_err(|e| FlatModelError::Codec(e.to_string()))?;
        self.0.decode(&inner)
    }
}
