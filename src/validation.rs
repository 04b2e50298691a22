//! Input validation and resource limits.
//!
//! Central size caps for every byte sequence pgplite ingests. Parsers
//! enforce these limits before allocating, so a hostile length field or
//! an oversized ring is rejected instead of exhausting memory.

use crate::error::{PgpliteError, Result};

/// Maximum allowed plaintext size (100MB)
///
/// Prevents memory exhaustion and keeps single-call encryption latency
/// reasonable. Larger data should be chunked by the caller.
pub const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Maximum allowed decompressed payload size (100MB)
///
/// Enforced while inflating compressed data packets so a small message
/// cannot expand into an arbitrarily large allocation.
pub const MAX_DECOMPRESSED_SIZE: usize = 100 * 1024 * 1024;

/// Maximum allowed packet body size (50MB)
pub const MAX_PACKET_SIZE: usize = 50 * 1024 * 1024;

/// Maximum allowed key material size (10KB - generous for post-quantum keys)
pub const MAX_KEY_SIZE: usize = 10 * 1024;

/// Maximum allowed User ID length (1KB)
pub const MAX_USER_ID_LENGTH: usize = 1024;

/// Maximum allowed number of packets in one stream
pub const MAX_PACKETS_PER_STREAM: usize = 16384;

/// Maximum allowed number of keys in a ring
pub const MAX_KEYS_PER_RING: usize = 4096;

/// Validation functions for input data
pub struct Validator;

impl Validator {
    /// Validate plaintext message size
    pub fn validate_message_size(data: &[u8]) -> Result<()> {
        if data.len() > MAX_MESSAGE_SIZE {
            return Err(PgpliteError::validation(format!(
                "Message too large: {} bytes exceeds maximum of {} bytes",
                data.len(),
                MAX_MESSAGE_SIZE
            )));
        }
        Ok(())
    }

    /// Validate key material size
    pub fn validate_key_size(data: &[u8]) -> Result<()> {
        if data.len() > MAX_KEY_SIZE {
            return Err(PgpliteError::validation(format!(
                "Key material too large: {} bytes exceeds maximum of {} bytes",
                data.len(),
                MAX_KEY_SIZE
            )));
        }
        Ok(())
    }

    /// Validate User ID string
    pub fn validate_user_id(user_id: &str) -> Result<()> {
        if user_id.len() > MAX_USER_ID_LENGTH {
            return Err(PgpliteError::validation(format!(
                "User ID too long: {} bytes exceeds maximum of {} bytes",
                user_id.len(),
                MAX_USER_ID_LENGTH
            )));
        }

        if user_id.contains('\0') {
            return Err(PgpliteError::validation("User ID contains null bytes"));
        }

        if user_id
            .chars()
            .any(|c| c.is_control() && c != '\t' && c != '\n' && c != '\r')
        {
            return Err(PgpliteError::validation(
                "User ID contains invalid control characters",
            ));
        }

        if user_id.trim().is_empty() {
            return Err(PgpliteError::validation("User ID cannot be empty"));
        }

        Ok(())
    }

    /// Validate packet count in a stream
    pub fn validate_packet_count(count: usize) -> Result<()> {
        if count > MAX_PACKETS_PER_STREAM {
            return Err(PgpliteError::validation(format!(
                "Too many packets: {} exceeds maximum of {}",
                count, MAX_PACKETS_PER_STREAM
            )));
        }
        Ok(())
    }

    /// Validate key count in a ring
    pub fn validate_ring_size(count: usize) -> Result<()> {
        if count > MAX_KEYS_PER_RING {
            return Err(PgpliteError::validation(format!(
                "Too many keys in ring: {} exceeds maximum of {}",
                count, MAX_KEYS_PER_RING
            )));
        }
        Ok(())
    }
}
