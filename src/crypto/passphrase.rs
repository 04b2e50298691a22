//! Passphrase-based secret key protection using Argon2 and AES-GCM.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng as AeadRng},
    Aes256Gcm, Key, Nonce,
};
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use rand::{rngs::OsRng, RngCore};
use zeroize::{Zeroize, Zeroizing};

use crate::{error::PgpliteError, Result};

/// Salt size for Argon2 (128 bits)
pub const SALT_SIZE: usize = 16;

/// AES-GCM nonce size (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Parameters for Argon2id passphrase hashing
const ARGON2_PARAMS: argon2::Params = match argon2::Params::new(
    19 * 1024, // 19 MiB memory cost
    2,         // 2 iterations
    1,         // 1 thread (single-threaded)
    Some(32),  // 32-byte output length
) {
    Ok(params) => params,
    Err(_) => panic!("Invalid Argon2 parameters"),
};

/// Passphrase for secret key protection.
///
/// The underlying string is zeroed when the passphrase is dropped.
#[derive(Clone)]
pub struct Passphrase(String);

impl Passphrase {
    /// Creates a new passphrase from a string
    pub fn new(passphrase: String) -> Self {
        Self(passphrase)
    }

    /// Gets the passphrase as bytes
    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Checks if the passphrase is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Passphrase {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

impl Drop for Passphrase {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Secret key material protected under a passphrase.
///
/// Wire layout: salt (16 bytes) followed by the AES-GCM nonce (12 bytes)
/// followed by the ciphertext with its authentication tag.
#[derive(Debug, Clone)]
pub struct ProtectedKeyMaterial {
    /// Argon2 salt for passphrase derivation
    salt: [u8; SALT_SIZE],
    /// AES-GCM nonce
    nonce: [u8; NONCE_SIZE],
    /// Encrypted key material (includes the AES-GCM authentication tag)
    ciphertext: Vec<u8>,
}

impl ProtectedKeyMaterial {
    /// Protects raw key material under a passphrase
    pub fn protect(key_material: &[u8], passphrase: &Passphrase) -> Result<Self> {
        if passphrase.is_empty() {
            return Err(PgpliteError::passphrase("Passphrase cannot be empty"));
        }

        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);

        let derived_key = derive_key_from_passphrase(passphrase, &salt)?;
        let cipher = Aes256Gcm::new(&derived_key);
        let nonce = Aes256Gcm::generate_nonce(&mut AeadRng);

        let ciphertext = cipher
            .encrypt(&nonce, key_material)
            .map_err(|e| PgpliteError::crypto(format!("Failed to protect key material: {}", e)))?;

        Ok(Self {
            salt,
            nonce: nonce.into(),
            ciphertext,
        })
    }

    /// Recovers the raw key material using a passphrase.
    ///
    /// The returned buffer is zeroed on drop.
    pub fn reveal(&self, passphrase: &Passphrase) -> Result<Zeroizing<Vec<u8>>> {
        if passphrase.is_empty() {
            return Err(PgpliteError::passphrase("Passphrase cannot be empty"));
        }

        let derived_key = derive_key_from_passphrase(passphrase, &self.salt)?;
        let cipher = Aes256Gcm::new(&derived_key);
        let nonce = Nonce::from_slice(&self.nonce);

        let plaintext = cipher.decrypt(nonce, self.ciphertext.as_ref()).map_err(|_| {
            PgpliteError::passphrase("Failed to unlock key material (wrong passphrase?)")
        })?;

        Ok(Zeroizing::new(plaintext))
    }

    /// Serializes to the wire layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + self.ciphertext.len());
        bytes.extend_from_slice(&self.salt);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Deserializes from the wire layout
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        // Minimum: salt, nonce, and the 16-byte authentication tag
        if data.len() < SALT_SIZE + NONCE_SIZE + 16 {
            return Err(PgpliteError::passphrase(
                "Protected key material is truncated",
            ));
        }

        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&data[..SALT_SIZE]);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&data[SALT_SIZE..SALT_SIZE + NONCE_SIZE]);
        let ciphertext = data[SALT_SIZE + NONCE_SIZE..].to_vec();

        Ok(Self {
            salt,
            nonce,
            ciphertext,
        })
    }
}

/// Derives a 256-bit key from a passphrase using Argon2id
fn derive_key_from_passphrase(
    passphrase: &Passphrase,
    salt: &[u8; SALT_SIZE],
) -> Result<Key<Aes256Gcm>> {
    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ARGON2_PARAMS,
    );

    let salt_string = SaltString::encode_b64(salt)
        .map_err(|e| PgpliteError::passphrase(format!("Invalid salt: {}", e)))?;

    let passphrase_hash = argon2
        .hash_password(passphrase.as_bytes(), &salt_string)
        .map_err(|e| PgpliteError::passphrase(format!("Passphrase hashing failed: {}", e)))?;

    let hash = passphrase_hash
        .hash
        .ok_or_else(|| PgpliteError::passphrase("No hash in passphrase result"))?;
    let hash_bytes = hash.as_bytes();

    if hash_bytes.len() != 32 {
        return Err(PgpliteError::passphrase(format!(
            "Unexpected key length: {} bytes (expected 32)",
            hash_bytes.len()
        )));
    }

    Ok(*Key::<Aes256Gcm>::from_slice(hash_bytes))
}
