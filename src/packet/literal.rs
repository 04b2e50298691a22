//! Literal data packet body.
//!
//! The innermost packet of every message: the plaintext itself plus a
//! small amount of metadata (format, filename hint, timestamp).

use crate::crypto::unix_time;
use crate::error::{PgpliteError, Result};

use super::{read_slice, read_u32, read_u8};

/// Filename hint for data that never lived in a file
pub const CONSOLE_FILENAME: &str = "_CONSOLE";

/// Binary data format marker
pub const FORMAT_BINARY: u8 = b'b';
/// UTF-8 text format marker
pub const FORMAT_UTF8: u8 = b'u';

/// Literal data packet body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralDataPacket {
    /// Data format marker (binary or UTF-8 text)
    pub format: u8,
    /// Filename hint
    pub filename: String,
    /// Modification timestamp (Unix seconds)
    pub timestamp: u32,
    /// The plaintext itself
    pub content: Vec<u8>,
}

impl LiteralDataPacket {
    /// Creates a binary literal packet with the console filename hint
    /// and the current time
    pub fn new_binary(content: Vec<u8>) -> Self {
        Self {
            format: FORMAT_BINARY,
            filename: CONSOLE_FILENAME.to_string(),
            timestamp: unix_time(),
            content,
        }
    }

    /// Creates a literal packet with explicit metadata
    pub fn new(format: u8, filename: String, timestamp: u32, content: Vec<u8>) -> Result<Self> {
        if format != FORMAT_BINARY && format != FORMAT_UTF8 {
            return Err(PgpliteError::validation(format!(
                "Unknown literal data format: {:#04x}",
                format
            )));
        }
        if filename.len() > 255 {
            return Err(PgpliteError::validation(format!(
                "Filename too long: {} bytes exceeds maximum of 255 bytes",
                filename.len()
            )));
        }

        Ok(Self {
            format,
            filename,
            timestamp,
            content,
        })
    }

    /// Serializes to packet body bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(6 + self.filename.len() + self.content.len());
        bytes.push(self.format);
        bytes.push(self.filename.len() as u8);
        bytes.extend_from_slice(self.filename.as_bytes());
        bytes.extend_from_slice(&self.timestamp.to_be_bytes());
        bytes.extend_from_slice(&self.content);
        bytes
    }

    /// Parses from packet body bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let format = read_u8(data, 0)?;
        if format != FORMAT_BINARY && format != FORMAT_UTF8 {
            return Err(PgpliteError::malformed_packets(format!(
                "Unknown literal data format: {:#04x}",
                format
            )));
        }

        let filename_len = read_u8(data, 1)? as usize;
        let filename = String::from_utf8(read_slice(data, 2, filename_len)?.to_vec())
            .map_err(|_| PgpliteError::malformed_packets("Invalid UTF-8 in filename"))?;

        let timestamp = read_u32(data, 2 + filename_len)?;
        let content = data[6 + filename_len..].to_vec();

        Ok(Self {
            format,
            filename,
            timestamp,
            content,
        })
    }

    /// Consumes the packet, returning just the plaintext
    pub fn into_content(self) -> Vec<u8> {
        self.content
    }
}
