//! Hybrid cipher engine: session key generation, asymmetric wrapping,
//! and the symmetric payload ciphers.
//!
//! Encryption generates a fresh session key, encapsulates a shared
//! secret to the recipient's ML-KEM-768 key, and protects the session
//! key under a key-encryption key derived from that shared secret.
//! Decryption reverses the steps. Every failure on the unwrap path maps
//! to the same opaque error so callers cannot probe which check failed.

use crate::crypto::keys::{PublicKey, UnlockedKey};
use crate::crypto::{hash_data, secure_random_bytes, KeyAlgorithm, SymmetricAlgorithm};
use crate::error::{PgpliteError, Result};
use crate::validation::Validator;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use pqcrypto_mlkem::mlkem768;
use pqcrypto_traits::kem::{Ciphertext, SharedSecret};
use rand::{CryptoRng, RngCore};
use std::fmt;
use zeroize::{Zeroize, Zeroizing};

type TdesCbcEncryptor = cbc::Encryptor<des::TdesEde3>;
type TdesCbcDecryptor = cbc::Decryptor<des::TdesEde3>;

/// AES-GCM nonce size in bytes
pub const AEAD_NONCE_SIZE: usize = 12;

/// TripleDES block and IV size in bytes
const TDES_IV_SIZE: usize = 8;

/// A transient symmetric key for one message.
///
/// Generated fresh per encrypt call and recovered fresh per decrypt
/// call; the key bytes are zeroed on drop.
pub struct SessionKey {
    algorithm: SymmetricAlgorithm,
    key: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey")
            .field("algorithm", &self.algorithm)
            .field("key_size", &self.key.len())
            .finish()
    }
}

impl SessionKey {
    /// Generates a random session key sized for the given cipher
    pub fn generate<R: CryptoRng + RngCore>(algorithm: SymmetricAlgorithm, rng: &mut R) -> Self {
        let key = Zeroizing::new(secure_random_bytes(rng, algorithm.key_size()));
        Self { algorithm, key }
    }

    /// Returns the symmetric algorithm this key belongs to
    pub fn algorithm(&self) -> SymmetricAlgorithm {
        self.algorithm
    }

    /// Returns the raw key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Additive checksum over the key octets, modulo 65536.
    ///
    /// Carried inside the wrapped key blob as a quick integrity check
    /// on top of the AEAD tag.
    pub fn checksum(&self) -> u16 {
        self.key
            .iter()
            .fold(0u16, |acc, &b| acc.wrapping_add(b as u16))
    }
}

/// A session key wrapped for a single recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedSessionKey {
    /// The KEM algorithm used for encapsulation
    pub kem_algorithm: KeyAlgorithm,
    /// The KEM ciphertext (encapsulated shared secret)
    pub kem_ciphertext: Vec<u8>,
    /// AES-GCM nonce for the key encryption
    pub nonce: [u8; AEAD_NONCE_SIZE],
    /// The encrypted session key blob with its authentication tag
    pub encrypted_key: Vec<u8>,
}

/// Derives the AES-256 key-encryption key from a KEM shared secret
fn kek_cipher(shared_secret: &[u8]) -> Aes256Gcm {
    let mut key_material = hash_data(shared_secret);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_material));
    key_material.zeroize();
    cipher
}

/// Wraps a session key for a recipient.
///
/// Encapsulates a fresh shared secret to the recipient's ML-KEM-768
/// key, then encrypts `algorithm id || key bytes || checksum` under the
/// derived key-encryption key. Fails with `UnsupportedKeyAlgorithm` if
/// the recipient key cannot encrypt.
pub fn wrap_session_key<R: CryptoRng + RngCore>(
    session_key: &SessionKey,
    recipient: &PublicKey,
    rng: &mut R,
) -> Result<WrappedSessionKey> {
    if !recipient.can_encrypt() {
        return Err(PgpliteError::unsupported_algorithm(format!(
            "{} key {:016X} cannot wrap session keys",
            recipient.algorithm(),
            recipient.key_id()
        )));
    }

    let kem_public = recipient.as_mlkem768()?;
    let (shared_secret, kem_ciphertext) = mlkem768::encapsulate(&kem_public);

    // Blob layout: algorithm id, key octets, additive checksum
    let mut blob = Zeroizing::new(Vec::with_capacity(session_key.as_bytes().len() + 3));
    blob.push(session_key.algorithm().to_id());
    blob.extend_from_slice(session_key.as_bytes());
    blob.extend_from_slice(&session_key.checksum().to_be_bytes());

    let cipher = kek_cipher(shared_secret.as_bytes());
    let nonce_bytes = secure_random_bytes(rng, AEAD_NONCE_SIZE);
    let encrypted_key = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), blob.as_slice())
        .map_err(|_| PgpliteError::crypto("Failed to wrap session key"))?;

    let mut nonce = [0u8; AEAD_NONCE_SIZE];
    nonce.copy_from_slice(&nonce_bytes);

    Ok(WrappedSessionKey {
        kem_algorithm: KeyAlgorithm::Mlkem768,
        kem_ciphertext: Ciphertext::as_bytes(&kem_ciphertext).to_vec(),
        nonce,
        encrypted_key,
    })
}

/// Unwraps a session key with the recipient's unlocked secret key.
///
/// Every failure maps to the opaque `DecryptionFailed` so a caller
/// cannot distinguish a wrong key from a tampered blob.
pub fn unwrap_session_key(wrapped: &WrappedSessionKey, key: &UnlockedKey) -> Result<SessionKey> {
    if wrapped.kem_algorithm != KeyAlgorithm::Mlkem768
        || key.algorithm() != KeyAlgorithm::Mlkem768
    {
        return Err(PgpliteError::DecryptionFailed);
    }

    let kem_secret = key.as_mlkem768().map_err(|_| PgpliteError::DecryptionFailed)?;
    let kem_ciphertext = mlkem768::Ciphertext::from_bytes(&wrapped.kem_ciphertext)
        .map_err(|_| PgpliteError::DecryptionFailed)?;
    let shared_secret = mlkem768::decapsulate(&kem_ciphertext, &kem_secret);

    let cipher = kek_cipher(shared_secret.as_bytes());
    let nonce = Nonce::from_slice(&wrapped.nonce);
    let blob = Zeroizing::new(
        cipher
            .decrypt(nonce, wrapped.encrypted_key.as_ref())
            .map_err(|_| PgpliteError::DecryptionFailed)?,
    );

    if blob.len() < 3 {
        return Err(PgpliteError::DecryptionFailed);
    }
    let algorithm =
        SymmetricAlgorithm::from_id(blob[0]).ok_or(PgpliteError::DecryptionFailed)?;
    let key_bytes = &blob[1..blob.len() - 2];
    if key_bytes.len() != algorithm.key_size() {
        return Err(PgpliteError::DecryptionFailed);
    }
    let expected = u16::from_be_bytes([blob[blob.len() - 2], blob[blob.len() - 1]]);

    let session_key = SessionKey {
        algorithm,
        key: Zeroizing::new(key_bytes.to_vec()),
    };
    if session_key.checksum() != expected {
        return Err(PgpliteError::DecryptionFailed);
    }

    Ok(session_key)
}

/// Encrypts a payload with the session key's cipher.
///
/// AES-256-GCM output is `nonce || ciphertext+tag`; TripleDES-CBC
/// output is `iv || ciphertext` with PKCS#7 padding.
pub fn symmetric_encrypt<R: CryptoRng + RngCore>(
    session_key: &SessionKey,
    plaintext: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>> {
    Validator::validate_message_size(plaintext)?;

    match session_key.algorithm() {
        SymmetricAlgorithm::Aes256Gcm => {
            let cipher = Aes256Gcm::new_from_slice(session_key.as_bytes())
                .map_err(|_| PgpliteError::crypto("Invalid AES-256-GCM key length"))?;
            let nonce_bytes = secure_random_bytes(rng, AEAD_NONCE_SIZE);
            let ciphertext = cipher
                .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
                .map_err(|_| PgpliteError::crypto("Failed to encrypt payload with AES-GCM"))?;

            let mut out = nonce_bytes;
            out.extend_from_slice(&ciphertext);
            Ok(out)
        }
        SymmetricAlgorithm::TripleDesCbc => {
            let iv = secure_random_bytes(rng, TDES_IV_SIZE);
            let encryptor = TdesCbcEncryptor::new_from_slices(session_key.as_bytes(), &iv)
                .map_err(|_| PgpliteError::crypto("Invalid TripleDES key or IV length"))?;
            let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

            let mut out = iv;
            out.extend_from_slice(&ciphertext);
            Ok(out)
        }
    }
}

/// Decrypts a payload with the session key's cipher.
///
/// AES-256-GCM authenticates the ciphertext, so tampering fails here.
/// TripleDES-CBC only fails on bad padding; callers must not rely on it
/// alone for tamper detection.
pub fn symmetric_decrypt(session_key: &SessionKey, data: &[u8]) -> Result<Vec<u8>> {
    match session_key.algorithm() {
        SymmetricAlgorithm::Aes256Gcm => {
            if data.len() < AEAD_NONCE_SIZE {
                return Err(PgpliteError::DecryptionFailed);
            }
            let (nonce, ciphertext) = data.split_at(AEAD_NONCE_SIZE);
            let cipher = Aes256Gcm::new_from_slice(session_key.as_bytes())
                .map_err(|_| PgpliteError::DecryptionFailed)?;
            cipher
                .decrypt(Nonce::from_slice(nonce), ciphertext)
                .map_err(|_| PgpliteError::DecryptionFailed)
        }
        SymmetricAlgorithm::TripleDesCbc => {
            if data.len() < TDES_IV_SIZE + TDES_IV_SIZE
                || (data.len() - TDES_IV_SIZE) % TDES_IV_SIZE != 0
            {
                return Err(PgpliteError::DecryptionFailed);
            }
            let (iv, ciphertext) = data.split_at(TDES_IV_SIZE);
            let decryptor = TdesCbcDecryptor::new_from_slices(session_key.as_bytes(), iv)
                .map_err(|_| PgpliteError::DecryptionFailed)?;
            decryptor
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(|_| PgpliteError::DecryptionFailed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use rand::rngs::OsRng;

    #[test]
    fn test_session_key_generation() {
        let mut rng = OsRng;
        let aes_key = SessionKey::generate(SymmetricAlgorithm::Aes256Gcm, &mut rng);
        assert_eq!(aes_key.as_bytes().len(), 32);

        let tdes_key = SessionKey::generate(SymmetricAlgorithm::TripleDesCbc, &mut rng);
        assert_eq!(tdes_key.as_bytes().len(), 24);

        // Two generated keys should never collide
        let other = SessionKey::generate(SymmetricAlgorithm::Aes256Gcm, &mut rng);
        assert_ne!(aes_key.as_bytes(), other.as_bytes());
    }

    #[test]
    fn test_session_key_checksum() {
        let key = SessionKey {
            algorithm: SymmetricAlgorithm::Aes256Gcm,
            key: Zeroizing::new(vec![0x01, 0x02, 0xFF]),
        };
        assert_eq!(key.checksum(), 0x0102);

        // Checksum wraps modulo 65536
        let key = SessionKey {
            algorithm: SymmetricAlgorithm::Aes256Gcm,
            key: Zeroizing::new(vec![0xFF; 1024]),
        };
        assert_eq!(key.checksum(), (0xFFu16).wrapping_mul(1024));
    }

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let mut rng = OsRng;
        let keypair = KeyPair::generate_mlkem768().unwrap();

        for algorithm in [SymmetricAlgorithm::Aes256Gcm, SymmetricAlgorithm::TripleDesCbc] {
            let session_key = SessionKey::generate(algorithm, &mut rng);
            let wrapped =
                wrap_session_key(&session_key, keypair.public_key(), &mut rng).unwrap();

            let unlocked = keypair.secret_key().unlock(None).unwrap();
            let unwrapped = unwrap_session_key(&wrapped, &unlocked).unwrap();

            assert_eq!(unwrapped.algorithm(), algorithm);
            assert_eq!(unwrapped.as_bytes(), session_key.as_bytes());
        }
    }

    #[test]
    fn test_wrap_with_signing_key_fails() {
        let mut rng = OsRng;
        let signing_keypair = KeyPair::generate_mldsa65().unwrap();
        let session_key = SessionKey::generate(SymmetricAlgorithm::Aes256Gcm, &mut rng);

        let result = wrap_session_key(&session_key, signing_keypair.public_key(), &mut rng);
        assert!(matches!(
            result,
            Err(PgpliteError::UnsupportedKeyAlgorithm(_))
        ));
    }

    #[test]
    fn test_unwrap_with_wrong_key_fails() {
        let mut rng = OsRng;
        let keypair1 = KeyPair::generate_mlkem768().unwrap();
        let keypair2 = KeyPair::generate_mlkem768().unwrap();

        let session_key = SessionKey::generate(SymmetricAlgorithm::Aes256Gcm, &mut rng);
        let wrapped = wrap_session_key(&session_key, keypair1.public_key(), &mut rng).unwrap();

        let unlocked = keypair2.secret_key().unlock(None).unwrap();
        assert!(matches!(
            unwrap_session_key(&wrapped, &unlocked),
            Err(PgpliteError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_unwrap_tampered_blob_fails() {
        let mut rng = OsRng;
        let keypair = KeyPair::generate_mlkem768().unwrap();

        let session_key = SessionKey::generate(SymmetricAlgorithm::Aes256Gcm, &mut rng);
        let mut wrapped = wrap_session_key(&session_key, keypair.public_key(), &mut rng).unwrap();
        if let Some(byte) = wrapped.encrypted_key.get_mut(0) {
            *byte = byte.wrapping_add(1);
        }

        let unlocked = keypair.secret_key().unlock(None).unwrap();
        assert!(matches!(
            unwrap_session_key(&wrapped, &unlocked),
            Err(PgpliteError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_unwrap_tampered_kem_ciphertext_fails() {
        let mut rng = OsRng;
        let keypair = KeyPair::generate_mlkem768().unwrap();

        let session_key = SessionKey::generate(SymmetricAlgorithm::Aes256Gcm, &mut rng);
        let mut wrapped = wrap_session_key(&session_key, keypair.public_key(), &mut rng).unwrap();
        let last = wrapped.kem_ciphertext.len() - 1;
        wrapped.kem_ciphertext[last] ^= 0x80;

        // Decapsulation yields a different shared secret, so the AEAD
        // layer rejects the blob
        let unlocked = keypair.secret_key().unlock(None).unwrap();
        assert!(matches!(
            unwrap_session_key(&wrapped, &unlocked),
            Err(PgpliteError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_symmetric_roundtrip_aes() {
        let mut rng = OsRng;
        let session_key = SessionKey::generate(SymmetricAlgorithm::Aes256Gcm, &mut rng);

        let plaintext = b"symmetric payload under AES-256-GCM";
        let ciphertext = symmetric_encrypt(&session_key, plaintext, &mut rng).unwrap();
        assert_ne!(&ciphertext[AEAD_NONCE_SIZE..], plaintext.as_slice());

        let decrypted = symmetric_decrypt(&session_key, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_symmetric_roundtrip_tripledes() {
        let mut rng = OsRng;
        let session_key = SessionKey::generate(SymmetricAlgorithm::TripleDesCbc, &mut rng);

        let plaintext = b"legacy cipher payload";
        let ciphertext = symmetric_encrypt(&session_key, plaintext, &mut rng).unwrap();
        let decrypted = symmetric_decrypt(&session_key, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_symmetric_empty_plaintext() {
        let mut rng = OsRng;
        for algorithm in [SymmetricAlgorithm::Aes256Gcm, SymmetricAlgorithm::TripleDesCbc] {
            let session_key = SessionKey::generate(algorithm, &mut rng);
            let ciphertext = symmetric_encrypt(&session_key, b"", &mut rng).unwrap();
            let decrypted = symmetric_decrypt(&session_key, &ciphertext).unwrap();
            assert!(decrypted.is_empty());
        }
    }

    #[test]
    fn test_aes_tampering_detected() {
        let mut rng = OsRng;
        let session_key = SessionKey::generate(SymmetricAlgorithm::Aes256Gcm, &mut rng);

        let mut ciphertext = symmetric_encrypt(&session_key, b"authentic data", &mut rng).unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x01;

        assert!(matches!(
            symmetric_decrypt(&session_key, &ciphertext),
            Err(PgpliteError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_symmetric_decrypt_truncated_input() {
        let mut rng = OsRng;
        let aes_key = SessionKey::generate(SymmetricAlgorithm::Aes256Gcm, &mut rng);
        assert!(symmetric_decrypt(&aes_key, &[0u8; 5]).is_err());

        let tdes_key = SessionKey::generate(SymmetricAlgorithm::TripleDesCbc, &mut rng);
        assert!(symmetric_decrypt(&tdes_key, &[0u8; 8]).is_err());
        // Ciphertext not a multiple of the block size
        assert!(symmetric_decrypt(&tdes_key, &[0u8; 21]).is_err());
    }
}
