//! Compressed data packet body.
//!
//! Compression sits outermost in the message envelope, wrapping the
//! encrypted data packet. ZIP here means raw DEFLATE without any
//! container framing. Decompression is capped so a small packet cannot
//! expand into an unbounded allocation.

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::crypto::CompressionAlgorithm;
use crate::error::{PgpliteError, Result};
use crate::validation::MAX_DECOMPRESSED_SIZE;

use super::read_u8;

/// Compressed data packet body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedDataPacket {
    /// Compression algorithm applied to the payload
    pub algorithm: CompressionAlgorithm,
    /// Compressed payload bytes
    pub data: Vec<u8>,
}

impl CompressedDataPacket {
    /// Compresses a payload under the given algorithm
    pub fn compress(algorithm: CompressionAlgorithm, payload: &[u8]) -> Result<Self> {
        let data = match algorithm {
            CompressionAlgorithm::Uncompressed => payload.to_vec(),
            CompressionAlgorithm::Zip => {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(payload)?;
                encoder.finish()?
            }
        };

        Ok(Self { algorithm, data })
    }

    /// Recovers the payload, enforcing the decompression cap
    pub fn decompress(&self) -> Result<Vec<u8>> {
        match self.algorithm {
            CompressionAlgorithm::Uncompressed => Ok(self.data.clone()),
            CompressionAlgorithm::Zip => {
                let mut decoder =
                    DeflateDecoder::new(&self.data[..]).take(MAX_DECOMPRESSED_SIZE as u64 + 1);
                let mut payload = Vec::new();
                decoder.read_to_end(&mut payload).map_err(|e| {
                    PgpliteError::malformed_packets(format!("Invalid compressed data: {}", e))
                })?;

                if payload.len() > MAX_DECOMPRESSED_SIZE {
                    return Err(PgpliteError::validation(format!(
                        "Decompressed data too large: exceeds maximum of {} bytes",
                        MAX_DECOMPRESSED_SIZE
                    )));
                }

                Ok(payload)
            }
        }
    }

    /// Serializes to packet body bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.data.len());
        bytes.push(self.algorithm.to_id());
        bytes.extend_from_slice(&self.data);
        bytes
    }

    /// Parses from packet body bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let algorithm_id = read_u8(data, 0)?;
        let algorithm = CompressionAlgorithm::from_id(algorithm_id).ok_or_else(|| {
            PgpliteError::malformed_packets(format!(
                "Unknown compression algorithm: {}",
                algorithm_id
            ))
        })?;

        Ok(Self {
            algorithm,
            data: data[1..].to_vec(),
        })
    }
}
