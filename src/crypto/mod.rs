//! Cryptographic primitives for pgplite.
//!
//! This module provides the core cryptographic operations behind the
//! message envelope:
//!
//! - **ML-KEM-768**: post-quantum key encapsulation for session key wrapping
//! - **ML-DSA-65**: post-quantum signature keys (carried in rings, not exercised here)
//! - **AES-256-GCM / TripleDES-CBC**: symmetric payload ciphers
//! - **SHA3-256**: fingerprints, key IDs, and session key derivation

use rand::{CryptoRng, RngCore};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

pub mod engine;
pub mod keys;
pub mod passphrase;

pub use engine::{
    symmetric_decrypt, symmetric_encrypt, unwrap_session_key, wrap_session_key, SessionKey,
    WrappedSessionKey,
};
pub use keys::{KeyPair, PublicKey, SecretKey, UnlockedKey};
pub use passphrase::{Passphrase, ProtectedKeyMaterial};

/// Asymmetric key algorithm identifiers carried in key packets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    /// ML-KEM-768 for key encapsulation (NIST standardized)
    Mlkem768 = 100,
    /// ML-DSA-65 for digital signatures (NIST standardized)
    Mldsa65 = 101,
}

impl KeyAlgorithm {
    /// Returns the algorithm name as a string
    pub fn name(&self) -> &'static str {
        match self {
            KeyAlgorithm::Mlkem768 => "ML-KEM-768",
            KeyAlgorithm::Mldsa65 => "ML-DSA-65",
        }
    }

    /// Returns the algorithm for a wire identifier, if supported
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            100 => Some(KeyAlgorithm::Mlkem768),
            101 => Some(KeyAlgorithm::Mldsa65),
            _ => None,
        }
    }

    /// Returns the wire identifier for this algorithm
    pub fn to_id(self) -> u8 {
        self as u8
    }

    /// Returns the public key size in bytes
    pub fn public_key_size(&self) -> usize {
        match self {
            KeyAlgorithm::Mlkem768 => 1184,
            KeyAlgorithm::Mldsa65 => 1952,
        }
    }

    /// Returns the secret key size in bytes
    pub fn secret_key_size(&self) -> usize {
        match self {
            KeyAlgorithm::Mlkem768 => 2400,
            KeyAlgorithm::Mldsa65 => 4032,
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Symmetric cipher identifiers carried inside wrapped session keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymmetricAlgorithm {
    /// TripleDES in CBC mode, kept for decrypting legacy messages
    TripleDesCbc = 2,
    /// AES-256-GCM, the default for new messages
    Aes256Gcm = 9,
}

impl SymmetricAlgorithm {
    /// Returns the algorithm name as a string
    pub fn name(&self) -> &'static str {
        match self {
            SymmetricAlgorithm::TripleDesCbc => "TripleDES-CBC",
            SymmetricAlgorithm::Aes256Gcm => "AES-256-GCM",
        }
    }

    /// Returns the algorithm for a wire identifier, if supported
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            2 => Some(SymmetricAlgorithm::TripleDesCbc),
            9 => Some(SymmetricAlgorithm::Aes256Gcm),
            _ => None,
        }
    }

    /// Returns the wire identifier for this algorithm
    pub fn to_id(self) -> u8 {
        self as u8
    }

    /// Returns the session key size in bytes
    pub fn key_size(&self) -> usize {
        match self {
            SymmetricAlgorithm::TripleDesCbc => 24,
            SymmetricAlgorithm::Aes256Gcm => 32,
        }
    }

    /// Returns true if the cipher authenticates its ciphertext
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SymmetricAlgorithm::Aes256Gcm)
    }
}

impl fmt::Display for SymmetricAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Compression algorithm identifiers carried in compressed data packets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionAlgorithm {
    /// No compression
    Uncompressed = 0,
    /// Raw DEFLATE (the OpenPGP "ZIP" algorithm)
    Zip = 1,
}

impl CompressionAlgorithm {
    /// Returns the algorithm name as a string
    pub fn name(&self) -> &'static str {
        match self {
            CompressionAlgorithm::Uncompressed => "Uncompressed",
            CompressionAlgorithm::Zip => "ZIP",
        }
    }

    /// Returns the algorithm for a wire identifier, if supported
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(CompressionAlgorithm::Uncompressed),
            1 => Some(CompressionAlgorithm::Zip),
            _ => None,
        }
    }

    /// Returns the wire identifier for this algorithm
    pub fn to_id(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Capability flags indicating how a key may be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyFlags {
    /// Key may be used for encryption
    pub encrypt: bool,
    /// Key may be used for digital signatures
    pub sign: bool,
    /// Key may be used to certify other keys
    pub certify: bool,
}

const FLAG_ENCRYPT: u8 = 0x01;
const FLAG_SIGN: u8 = 0x02;
const FLAG_CERTIFY: u8 = 0x04;

impl KeyFlags {
    /// Creates flags with all capabilities disabled
    pub fn none() -> Self {
        Self {
            encrypt: false,
            sign: false,
            certify: false,
        }
    }

    /// Creates flags for an encryption-only key
    pub fn encrypt_only() -> Self {
        Self {
            encrypt: true,
            sign: false,
            certify: false,
        }
    }

    /// Creates flags for a signing and certification key
    pub fn sign_and_certify() -> Self {
        Self {
            encrypt: false,
            sign: true,
            certify: true,
        }
    }

    /// Encodes the flags as a single wire byte
    pub fn to_byte(self) -> u8 {
        let mut byte = 0u8;
        if self.encrypt {
            byte |= FLAG_ENCRYPT;
        }
        if self.sign {
            byte |= FLAG_SIGN;
        }
        if self.certify {
            byte |= FLAG_CERTIFY;
        }
        byte
    }

    /// Decodes flags from a wire byte, ignoring unknown bits
    pub fn from_byte(byte: u8) -> Self {
        Self {
            encrypt: byte & FLAG_ENCRYPT != 0,
            sign: byte & FLAG_SIGN != 0,
            certify: byte & FLAG_CERTIFY != 0,
        }
    }
}

/// Cryptographic hash function using SHA3-256
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Secure random byte generation for cryptographic operations
pub fn secure_random_bytes<R: CryptoRng + RngCore>(rng: &mut R, len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rng.fill_bytes(&mut bytes);
    bytes
}

/// Computes the fingerprint of a key: SHA3-256 over the algorithm
/// identifier, creation time, and public key material.
pub fn fingerprint(key_material: &[u8], algorithm: KeyAlgorithm, created: u32) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(algorithm.to_id().to_be_bytes());
    hasher.update(created.to_be_bytes());
    hasher.update(key_material);
    hasher.finalize().into()
}

/// Derives the key ID from key material and metadata.
///
/// Key IDs are the last 8 bytes of the fingerprint, not randomly
/// generated, so the same key always yields the same ID.
pub fn generate_key_id(key_material: &[u8], algorithm: KeyAlgorithm, created: u32) -> u64 {
    let hash = fingerprint(key_material, algorithm, created);
    let mut key_id_bytes = [0u8; 8];
    key_id_bytes.copy_from_slice(&hash[24..32]);
    u64::from_be_bytes(key_id_bytes)
}

/// Constant-time comparison of key IDs to prevent timing attacks
pub fn key_ids_equal(a: u64, b: u64) -> bool {
    a.to_be_bytes().ct_eq(&b.to_be_bytes()).into()
}

/// Current Unix time truncated to the 32-bit field used in key and
/// literal data packets.
pub(crate) fn unix_time() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

/// Key metadata carried alongside every key in a ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMetadata {
    /// Unique key identifier derived from the fingerprint
    pub key_id: u64,
    /// Key algorithm
    pub algorithm: KeyAlgorithm,
    /// Capability flags
    pub flags: KeyFlags,
    /// Key creation time (Unix timestamp)
    pub created: u32,
}

impl KeyMetadata {
    /// Creates new key metadata with the specified parameters
    pub fn new(algorithm: KeyAlgorithm, flags: KeyFlags, created: u32, key_id: u64) -> Self {
        Self {
            key_id,
            algorithm,
            flags,
            created,
        }
    }
}
