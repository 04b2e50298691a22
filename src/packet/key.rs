//! Public and secret key packet bodies.
//!
//! Key material is carried as an MPI (a big-endian length-prefixed
//! octet string). Secret key packets additionally record how the secret
//! material is stored: in the clear with a checksum, or sealed under a
//! passphrase.

use crate::crypto::keys::SecretKeyStorage;
use crate::crypto::passphrase::ProtectedKeyMaterial;
use crate::crypto::{KeyAlgorithm, KeyFlags, PublicKey, SecretKey};
use crate::error::{PgpliteError, Result};
use crate::validation::MAX_KEY_SIZE;
use zeroize::Zeroizing;

use super::{read_slice, read_u16, read_u32, read_u8};

/// Version byte carried by every key packet
pub const KEY_PACKET_VERSION: u8 = 4;

/// Secret material stored in the clear, followed by a checksum
const S2K_USAGE_NONE: u8 = 0;
/// Secret material sealed with a passphrase-derived AEAD key
const S2K_USAGE_PROTECTED: u8 = 254;

/// Writes key material as an MPI (bit count plus octets)
fn write_mpi(bytes: &mut Vec<u8>, material: &[u8]) {
    let bit_length = (material.len() * 8) as u16;
    bytes.extend_from_slice(&bit_length.to_be_bytes());
    bytes.extend_from_slice(material);
}

/// Reads an MPI, returning the material and the offset past it
fn read_mpi(data: &[u8], offset: usize) -> Result<(Vec<u8>, usize)> {
    let bit_length = read_u16(data, offset)? as usize;
    let byte_length = bit_length.div_ceil(8);

    if byte_length > MAX_KEY_SIZE {
        return Err(PgpliteError::malformed_packets(format!(
            "Key material too large: {} bytes exceeds maximum of {} bytes",
            byte_length, MAX_KEY_SIZE
        )));
    }

    let material = read_slice(data, offset + 2, byte_length)?.to_vec();
    Ok((material, offset + 2 + byte_length))
}

/// Additive checksum over cleartext secret material
fn material_checksum(material: &[u8]) -> u16 {
    material
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(b as u16))
}

/// Parses the version/created/algorithm/flags prefix shared by both
/// key packet kinds, returning the fields and the offset past them
fn read_key_prefix(data: &[u8]) -> Result<(u32, KeyAlgorithm, KeyFlags, usize)> {
    let version = read_u8(data, 0)?;
    if version != KEY_PACKET_VERSION {
        return Err(PgpliteError::malformed_packets(format!(
            "Unsupported key packet version: {}",
            version
        )));
    }

    let created = read_u32(data, 1)?;

    let algorithm_id = read_u8(data, 5)?;
    let algorithm = KeyAlgorithm::from_id(algorithm_id).ok_or_else(|| {
        PgpliteError::malformed_packets(format!("Unknown key algorithm: {}", algorithm_id))
    })?;

    let flags = KeyFlags::from_byte(read_u8(data, 6)?);

    Ok((created, algorithm, flags, 7))
}

/// Public key packet body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyPacket {
    /// Packet version
    pub version: u8,
    /// Creation timestamp (Unix seconds)
    pub created: u32,
    /// Key algorithm
    pub algorithm: KeyAlgorithm,
    /// Capability flags
    pub flags: KeyFlags,
    /// Raw public key material
    pub key_material: Vec<u8>,
}

impl PublicKeyPacket {
    /// Builds a packet body from a public key
    pub fn from_key(key: &PublicKey) -> Self {
        Self {
            version: KEY_PACKET_VERSION,
            created: key.metadata().created,
            algorithm: key.algorithm(),
            flags: key.flags(),
            key_material: key.as_bytes().to_vec(),
        }
    }

    /// Serializes to packet body bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(7 + 2 + self.key_material.len());
        bytes.push(self.version);
        bytes.extend_from_slice(&self.created.to_be_bytes());
        bytes.push(self.algorithm.to_id());
        bytes.push(self.flags.to_byte());
        write_mpi(&mut bytes, &self.key_material);
        bytes
    }

    /// Parses from packet body bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let (created, algorithm, flags, offset) = read_key_prefix(data)?;
        let (key_material, offset) = read_mpi(data, offset)?;

        if offset != data.len() {
            return Err(PgpliteError::malformed_packets(
                "Trailing data in public key packet",
            ));
        }

        Ok(Self {
            version: KEY_PACKET_VERSION,
            created,
            algorithm,
            flags,
            key_material,
        })
    }

    /// Converts the packet into a usable public key.
    ///
    /// The key ID is re-derived from the material rather than read from
    /// the wire.
    pub fn into_key(self) -> Result<PublicKey> {
        PublicKey::from_parts(self.algorithm, self.key_material, self.flags, self.created)
    }
}

/// Secret key packet body
#[derive(Clone)]
pub struct SecretKeyPacket {
    /// Packet version
    pub version: u8,
    /// Creation timestamp (Unix seconds)
    pub created: u32,
    /// Key algorithm
    pub algorithm: KeyAlgorithm,
    /// Capability flags
    pub flags: KeyFlags,
    /// Raw public key material for the same key
    pub public_key_material: Vec<u8>,
    /// Secret material, cleartext or passphrase-protected
    pub storage: SecretKeyStorage,
}

impl SecretKeyPacket {
    /// Builds a packet body from a secret key
    pub fn from_key(key: &SecretKey) -> Self {
        Self {
            version: KEY_PACKET_VERSION,
            created: key.metadata().created,
            algorithm: key.algorithm(),
            flags: key.flags(),
            public_key_material: key.public_bytes().to_vec(),
            storage: key.storage.clone(),
        }
    }

    /// Serializes to packet body bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.push(self.version);
        bytes.extend_from_slice(&self.created.to_be_bytes());
        bytes.push(self.algorithm.to_id());
        bytes.push(self.flags.to_byte());
        write_mpi(&mut bytes, &self.public_key_material);

        match &self.storage {
            SecretKeyStorage::Unprotected(material) => {
                bytes.push(S2K_USAGE_NONE);
                write_mpi(&mut bytes, material);
                bytes.extend_from_slice(&material_checksum(material).to_be_bytes());
            }
            SecretKeyStorage::Protected(protected) => {
                bytes.push(S2K_USAGE_PROTECTED);
                bytes.extend_from_slice(&protected.to_bytes());
            }
        }

        bytes
    }

    /// Parses from packet body bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let (created, algorithm, flags, offset) = read_key_prefix(data)?;
        let (public_key_material, offset) = read_mpi(data, offset)?;

        let s2k_usage = read_u8(data, offset)?;
        let offset = offset + 1;

        let storage = match s2k_usage {
            S2K_USAGE_NONE => {
                let (material, offset) = read_mpi(data, offset)?;
                let material = Zeroizing::new(material);

                let stored_checksum = read_u16(data, offset)?;
                if stored_checksum != material_checksum(&material) {
                    return Err(PgpliteError::malformed_packets(
                        "Secret key checksum mismatch",
                    ));
                }
                if offset + 2 != data.len() {
                    return Err(PgpliteError::malformed_packets(
                        "Trailing data in secret key packet",
                    ));
                }

                SecretKeyStorage::Unprotected(material)
            }
            S2K_USAGE_PROTECTED => {
                // The protected blob runs to the end of the body
                let protected = ProtectedKeyMaterial::from_bytes(&data[offset..])
                    .map_err(|e| PgpliteError::malformed_packets(e.to_string()))?;
                SecretKeyStorage::Protected(protected)
            }
            other => {
                return Err(PgpliteError::malformed_packets(format!(
                    "Unsupported secret key protection mode: {}",
                    other
                )));
            }
        };

        Ok(Self {
            version: KEY_PACKET_VERSION,
            created,
            algorithm,
            flags,
            public_key_material,
            storage,
        })
    }

    /// Converts the packet into a usable secret key
    pub fn into_key(self) -> Result<SecretKey> {
        SecretKey::from_parts(
            self.algorithm,
            self.public_key_material,
            self.storage,
            self.flags,
            self.created,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KeyPair, Passphrase};

    #[test]
    fn test_public_key_packet_roundtrip() {
        let keypair = KeyPair::generate_mlkem768().expect("key generation should succeed");

        let packet = PublicKeyPacket::from_key(&keypair.public);
        let bytes = packet.to_bytes();
        let parsed = PublicKeyPacket::from_bytes(&bytes).expect("parse should succeed");

        assert_eq!(parsed, packet);

        let key = parsed.into_key().expect("key reconstruction should succeed");
        assert_eq!(key.key_id(), keypair.public.key_id());
        assert_eq!(key.flags(), keypair.public.flags());
    }

    #[test]
    fn test_secret_key_packet_roundtrip() {
        let keypair = KeyPair::generate_mlkem768().expect("key generation should succeed");

        let packet = SecretKeyPacket::from_key(&keypair.secret);
        let bytes = packet.to_bytes();
        let parsed = SecretKeyPacket::from_bytes(&bytes).expect("parse should succeed");

        let key = parsed.into_key().expect("key reconstruction should succeed");
        assert_eq!(key.key_id(), keypair.secret.key_id());
        assert!(!key.is_protected());

        // The restored key must still unlock
        key.unlock(None).expect("unlock should succeed");
    }

    #[test]
    fn test_protected_secret_key_packet_roundtrip() {
        let mut keypair = KeyPair::generate_mlkem768().expect("key generation should succeed");
        let passphrase = Passphrase::from("correct horse");
        keypair
            .secret
            .protect(&passphrase)
            .expect("protection should succeed");

        let packet = SecretKeyPacket::from_key(&keypair.secret);
        let bytes = packet.to_bytes();
        let parsed = SecretKeyPacket::from_bytes(&bytes).expect("parse should succeed");

        let key = parsed.into_key().expect("key reconstruction should succeed");
        assert!(key.is_protected());
        key.unlock(Some(&passphrase))
            .expect("unlock with the right passphrase should succeed");
    }

    #[test]
    fn test_secret_key_checksum_detects_corruption() {
        let keypair = KeyPair::generate_mlkem768().expect("key generation should succeed");

        let packet = SecretKeyPacket::from_key(&keypair.secret);
        let mut bytes = packet.to_bytes();

        // Flip a bit inside the secret material MPI
        let target = bytes.len() - 100;
        bytes[target] ^= 0x01;

        let result = SecretKeyPacket::from_bytes(&bytes);
        assert!(matches!(
            result,
            Err(PgpliteError::MalformedPacketStream(_))
        ));
    }

    #[test]
    fn test_key_packet_rejects_bad_version() {
        let keypair = KeyPair::generate_mlkem768().expect("key generation should succeed");

        let mut bytes = PublicKeyPacket::from_key(&keypair.public).to_bytes();
        bytes[0] = 3;

        assert!(PublicKeyPacket::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_key_packet_rejects_unknown_algorithm() {
        let keypair = KeyPair::generate_mlkem768().expect("key generation should succeed");

        let mut bytes = PublicKeyPacket::from_key(&keypair.public).to_bytes();
        bytes[5] = 42;

        assert!(PublicKeyPacket::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_key_packet_rejects_truncation() {
        let keypair = KeyPair::generate_mlkem768().expect("key generation should succeed");
        let bytes = PublicKeyPacket::from_key(&keypair.public).to_bytes();

        for cut in [0, 3, 7, 9, bytes.len() - 1] {
            assert!(
                PublicKeyPacket::from_bytes(&bytes[..cut]).is_err(),
                "truncation at {} should fail",
                cut
            );
        }
    }

    #[test]
    fn test_key_packet_rejects_trailing_data() {
        let keypair = KeyPair::generate_mlkem768().expect("key generation should succeed");

        let mut bytes = PublicKeyPacket::from_key(&keypair.public).to_bytes();
        bytes.push(0x00);

        assert!(PublicKeyPacket::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_signing_key_packet_roundtrip() {
        let keypair = KeyPair::generate_mldsa65().expect("key generation should succeed");

        let packet = PublicKeyPacket::from_key(&keypair.public);
        let parsed =
            PublicKeyPacket::from_bytes(&packet.to_bytes()).expect("parse should succeed");
        let key = parsed.into_key().expect("key reconstruction should succeed");

        assert_eq!(key.algorithm(), crate::crypto::KeyAlgorithm::Mldsa65);
        assert!(!key.can_encrypt());
    }
}
