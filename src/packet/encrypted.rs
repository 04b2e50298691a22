//! Encrypted data packet body.
//!
//! Carries everything a single recipient needs to recover the message:
//! the recipient key ID as a routing hint, the KEM-wrapped session key,
//! and the symmetrically encrypted payload. The payload of a well
//! formed message is the ciphertext of one literal data packet.

use crate::crypto::engine::AEAD_NONCE_SIZE;
use crate::crypto::{KeyAlgorithm, WrappedSessionKey};
use crate::error::{PgpliteError, Result};

use super::{read_slice, read_u16, read_u8};

/// Version byte carried by every encrypted data packet
pub const ENCRYPTED_DATA_VERSION: u8 = 1;

/// Encrypted data packet body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedDataPacket {
    /// Packet version
    pub version: u8,
    /// Key ID of the intended recipient
    pub recipient_key_id: u64,
    /// Session key wrapped for the recipient
    pub wrapped_key: WrappedSessionKey,
    /// Symmetrically encrypted payload
    pub body: Vec<u8>,
}

impl EncryptedDataPacket {
    /// Creates a new encrypted data packet
    pub fn new(recipient_key_id: u64, wrapped_key: WrappedSessionKey, body: Vec<u8>) -> Self {
        Self {
            version: ENCRYPTED_DATA_VERSION,
            recipient_key_id,
            wrapped_key,
            body,
        }
    }

    /// Serializes to packet body bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.push(self.version);
        bytes.extend_from_slice(&self.recipient_key_id.to_be_bytes());
        bytes.push(self.wrapped_key.kem_algorithm.to_id());
        bytes.extend_from_slice(&(self.wrapped_key.kem_ciphertext.len() as u16).to_be_bytes());
        bytes.extend_from_slice(&self.wrapped_key.kem_ciphertext);
        bytes.extend_from_slice(&self.wrapped_key.nonce);
        bytes.extend_from_slice(&(self.wrapped_key.encrypted_key.len() as u16).to_be_bytes());
        bytes.extend_from_slice(&self.wrapped_key.encrypted_key);
        bytes.extend_from_slice(&self.body);
        bytes
    }

    /// Parses from packet body bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let version = read_u8(data, 0)?;
        if version != ENCRYPTED_DATA_VERSION {
            return Err(PgpliteError::malformed_packets(format!(
                "Unsupported encrypted data version: {}",
                version
            )));
        }

        let recipient_key_id = u64::from_be_bytes(
            read_slice(data, 1, 8)?
                .try_into()
                .map_err(|_| PgpliteError::malformed_packets("Invalid recipient key ID"))?,
        );

        let kem_algorithm_id = read_u8(data, 9)?;
        let kem_algorithm = KeyAlgorithm::from_id(kem_algorithm_id).ok_or_else(|| {
            PgpliteError::malformed_packets(format!("Unknown KEM algorithm: {}", kem_algorithm_id))
        })?;

        let kem_ciphertext_len = read_u16(data, 10)? as usize;
        let mut offset = 12;
        let kem_ciphertext = read_slice(data, offset, kem_ciphertext_len)?.to_vec();
        offset += kem_ciphertext_len;

        let mut nonce = [0u8; AEAD_NONCE_SIZE];
        nonce.copy_from_slice(read_slice(data, offset, AEAD_NONCE_SIZE)?);
        offset += AEAD_NONCE_SIZE;

        let encrypted_key_len = read_u16(data, offset)? as usize;
        offset += 2;
        let encrypted_key = read_slice(data, offset, encrypted_key_len)?.to_vec();
        offset += encrypted_key_len;

        let body = data[offset..].to_vec();

        Ok(Self {
            version,
            recipient_key_id,
            wrapped_key: WrappedSessionKey {
                kem_algorithm,
                kem_ciphertext,
                nonce,
                encrypted_key,
            },
            body,
        })
    }
}
