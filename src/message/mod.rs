//! Message encryption and decryption pipeline.
//!
//! A message is a nested packet envelope: literal data innermost, its
//! ciphertext inside an encrypted data packet, and optionally a
//! compressed data packet outermost. Encryption selects one recipient
//! key from the ring, wraps a fresh session key for it, and seals the
//! envelope. Decryption peels the envelope in reverse, selecting and
//! unlocking a secret key from the ring as it goes.
//!
//! Both directions abort on the first failure and never emit partial
//! output.

use rand::{CryptoRng, RngCore};
use tracing::{debug, info};

use crate::crypto::{
    key_ids_equal, symmetric_decrypt, symmetric_encrypt, unwrap_session_key, wrap_session_key,
    CompressionAlgorithm, Passphrase, SessionKey, SymmetricAlgorithm,
};
use crate::error::{PgpliteError, Result};
use crate::keyring::{PublicKeyRing, SecretKeyRing};
use crate::packet::{
    CompressedDataPacket, EncryptedDataPacket, LiteralDataPacket, Packet, PacketType,
};
use crate::validation::Validator;

/// Algorithm choices applied when sealing a message.
///
/// The default is the modern profile. Decryption does not consult a
/// policy at all: the envelope self-describes, and legacy algorithms
/// remain readable even though new messages never use them by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagePolicy {
    /// Symmetric cipher for the message body
    pub symmetric: SymmetricAlgorithm,
    /// Compression applied around the encrypted packet
    pub compression: CompressionAlgorithm,
}

impl MessagePolicy {
    /// Creates a policy with explicit algorithm choices
    pub fn new(symmetric: SymmetricAlgorithm, compression: CompressionAlgorithm) -> Self {
        Self {
            symmetric,
            compression,
        }
    }
}

impl Default for MessagePolicy {
    fn default() -> Self {
        Self {
            symmetric: SymmetricAlgorithm::Aes256Gcm,
            compression: CompressionAlgorithm::Zip,
        }
    }
}

/// Encrypts a message to the first encryption-capable key in the ring.
///
/// Returns the complete serialized envelope. Nothing is emitted when
/// any stage fails.
pub fn encrypt_message<R: CryptoRng + RngCore>(
    ring: &PublicKeyRing,
    plaintext: &[u8],
    policy: MessagePolicy,
    rng: &mut R,
) -> Result<Vec<u8>> {
    Validator::validate_message_size(plaintext)?;

    let recipient = ring.select_encryption_key()?;
    let session_key = SessionKey::generate(policy.symmetric, rng);

    let literal = LiteralDataPacket::new_binary(plaintext.to_vec());
    let literal_bytes = Packet::new(PacketType::LiteralData, literal.to_bytes()).to_bytes();

    let ciphertext = symmetric_encrypt(&session_key, &literal_bytes, rng)?;
    let wrapped = wrap_session_key(&session_key, recipient, rng)?;
    let packet = EncryptedDataPacket::new(recipient.key_id(), wrapped, ciphertext);

    let message = seal_envelope(&packet, policy.compression)?;

    info!(
        recipient = format_args!("{:016X}", recipient.key_id()),
        symmetric = %policy.symmetric,
        compression = %policy.compression,
        plaintext_size = plaintext.len(),
        message_size = message.len(),
        "encrypted message"
    );

    Ok(message)
}

/// Decrypts a message using the first usable key in the secret ring,
/// returning the plaintext
pub fn decrypt_message(
    ring: &SecretKeyRing,
    passphrase: Option<&Passphrase>,
    data: &[u8],
) -> Result<Vec<u8>> {
    Ok(decrypt_literal(ring, passphrase, data)?.into_content())
}

/// Decrypts a message, returning the whole literal data packet with its
/// metadata
pub fn decrypt_literal(
    ring: &SecretKeyRing,
    passphrase: Option<&Passphrase>,
    data: &[u8],
) -> Result<LiteralDataPacket> {
    let literal = open_envelope(data, |packet| {
        let unlocked = ring.select_decryption_key(passphrase)?;

        // The recipient hint is advisory. A mismatch is logged but the
        // unwrap is still attempted with the key we have.
        if !key_ids_equal(unlocked.key_id(), packet.recipient_key_id) {
            debug!(
                message_recipient = format_args!("{:016X}", packet.recipient_key_id),
                selected_key = format_args!("{:016X}", unlocked.key_id()),
                "selected key does not match message recipient, attempting unwrap anyway"
            );
        }

        unwrap_session_key(&packet.wrapped_key, &unlocked)
    })?;

    info!(plaintext_size = literal.content.len(), "decrypted message");
    Ok(literal)
}

/// Wraps an encrypted data packet into the outermost envelope framing
fn seal_envelope(
    packet: &EncryptedDataPacket,
    compression: CompressionAlgorithm,
) -> Result<Vec<u8>> {
    let encrypted = Packet::new(PacketType::EncryptedData, packet.to_bytes()).to_bytes();

    match compression {
        CompressionAlgorithm::Uncompressed => Ok(encrypted),
        CompressionAlgorithm::Zip => {
            let compressed = CompressedDataPacket::compress(CompressionAlgorithm::Zip, &encrypted)?;
            let body = compressed.to_bytes();
            Ok(Packet::new(PacketType::CompressedData, body).to_bytes())
        }
    }
}

/// Peels the envelope framing down to the literal data packet.
///
/// The caller supplies the session key recovery step as a closure, so
/// the envelope logic itself holds no cipher state. The outer packet
/// may be encrypted data directly or a compressed wrapper around it;
/// any other known packet type is not an encrypted message.
pub fn open_envelope<F>(data: &[u8], unwrap: F) -> Result<LiteralDataPacket>
where
    F: FnOnce(&EncryptedDataPacket) -> Result<SessionKey>,
{
    if data.is_empty() {
        return Err(PgpliteError::malformed_packets("Empty message"));
    }

    let (outer, consumed) = Packet::from_bytes(data)?;
    if consumed != data.len() {
        return Err(PgpliteError::malformed_packets(
            "Trailing data after message packet",
        ));
    }

    let encrypted = match outer.header.packet_type {
        PacketType::EncryptedData => EncryptedDataPacket::from_bytes(&outer.body)?,
        PacketType::CompressedData => {
            let compressed = CompressedDataPacket::from_bytes(&outer.body)?;
            let payload = compressed.decompress()?;

            let (inner, inner_consumed) = Packet::from_bytes(&payload)?;
            if inner.header.packet_type != PacketType::EncryptedData
                || inner_consumed != payload.len()
            {
                return Err(PgpliteError::NotEncryptedData);
            }
            EncryptedDataPacket::from_bytes(&inner.body)?
        }
        _ => return Err(PgpliteError::NotEncryptedData),
    };

    let session_key = unwrap(&encrypted)?;
    let plaintext_stream = symmetric_decrypt(&session_key, &encrypted.body)?;

    literal_from_stream(&plaintext_stream)
}

/// Requires the decrypted payload to be exactly one literal data packet
fn literal_from_stream(payload: &[u8]) -> Result<LiteralDataPacket> {
    let (packet, consumed) =
        Packet::from_bytes(payload).map_err(|_| PgpliteError::NotLiteralData)?;

    if packet.header.packet_type != PacketType::LiteralData || consumed != payload.len() {
        return Err(PgpliteError::NotLiteralData);
    }

    LiteralDataPacket::from_bytes(&packet.body).map_err(|_| PgpliteError::NotLiteralData)
}
