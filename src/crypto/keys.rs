//! Post-quantum key generation and the in-memory key model.
//!
//! Keys carry their algorithm, capability flags, and a key ID derived
//! from the public key material. Secret material is either held in a
//! zeroed-on-drop buffer or protected under a passphrase; it only
//! leaves the [`SecretKey`] through [`SecretKey::unlock`].

use crate::crypto::{
    fingerprint, generate_key_id, unix_time, KeyAlgorithm, KeyFlags, KeyMetadata, Passphrase,
    ProtectedKeyMaterial,
};
use crate::error::{PgpliteError, Result};
use pqcrypto_mldsa::mldsa65::{self, PublicKey as Mldsa65PublicKey, SecretKey as Mldsa65SecretKey};
use pqcrypto_mlkem::mlkem768::{self, PublicKey as Mlkem768PublicKey, SecretKey as Mlkem768SecretKey};
use pqcrypto_traits::kem::{PublicKey as KemPublicKey, SecretKey as KemSecretKey};
use pqcrypto_traits::sign::{PublicKey as SignPublicKey, SecretKey as SignSecretKey};
use std::fmt;
use zeroize::Zeroizing;

/// A public key holding either ML-KEM or ML-DSA material
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    /// Serialized key bytes for the specific algorithm
    pub(crate) key_bytes: Vec<u8>,
    /// Key metadata including algorithm, flags, and creation time
    pub(crate) metadata: KeyMetadata,
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("algorithm", &self.metadata.algorithm)
            .field("key_id", &self.metadata.key_id)
            .field("key_size", &self.key_bytes.len())
            .finish()
    }
}

/// Storage for secret key material
#[derive(Clone)]
pub enum SecretKeyStorage {
    /// Raw key material, zeroed on drop
    Unprotected(Zeroizing<Vec<u8>>),
    /// Passphrase-protected key material
    Protected(ProtectedKeyMaterial),
}

/// A secret key holding either ML-KEM or ML-DSA material.
///
/// The matching public key material is kept alongside so the key ID can
/// be re-derived and the key re-encoded without unlocking.
#[derive(Clone)]
pub struct SecretKey {
    /// Serialized public key bytes for the same key
    pub(crate) public_bytes: Vec<u8>,
    /// Secret material storage (protected or not)
    pub(crate) storage: SecretKeyStorage,
    /// Key metadata including algorithm, flags, and creation time
    pub(crate) metadata: KeyMetadata,
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("algorithm", &self.metadata.algorithm)
            .field("key_id", &self.metadata.key_id)
            .field("is_protected", &self.is_protected())
            .finish()
    }
}

/// Secret key material recovered from a [`SecretKey`].
///
/// Exists only for the duration of one decrypt operation; the material
/// buffer is zeroed on drop.
pub struct UnlockedKey {
    key_id: u64,
    algorithm: KeyAlgorithm,
    material: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for UnlockedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnlockedKey")
            .field("algorithm", &self.algorithm)
            .field("key_id", &self.key_id)
            .finish()
    }
}

/// A complete key pair containing both public and secret halves
#[derive(Clone)]
pub struct KeyPair {
    /// The public key component
    pub public: PublicKey,
    /// The secret key component
    pub secret: SecretKey,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.public.metadata.algorithm)
            .field("key_id", &self.public.metadata.key_id)
            .finish()
    }
}

impl PublicKey {
    /// Creates a new ML-KEM-768 public key for encryption
    pub fn new_mlkem768(key: Mlkem768PublicKey, flags: KeyFlags, created: u32) -> Self {
        let key_bytes = KemPublicKey::as_bytes(&key).to_vec();
        let key_id = generate_key_id(&key_bytes, KeyAlgorithm::Mlkem768, created);
        Self {
            key_bytes,
            metadata: KeyMetadata::new(KeyAlgorithm::Mlkem768, flags, created, key_id),
        }
    }

    /// Creates a new ML-DSA-65 public key for signatures
    pub fn new_mldsa65(key: Mldsa65PublicKey, flags: KeyFlags, created: u32) -> Self {
        let key_bytes = SignPublicKey::as_bytes(&key).to_vec();
        let key_id = generate_key_id(&key_bytes, KeyAlgorithm::Mldsa65, created);
        Self {
            key_bytes,
            metadata: KeyMetadata::new(KeyAlgorithm::Mldsa65, flags, created, key_id),
        }
    }

    /// Reconstructs a public key from decoded ring fields.
    ///
    /// The key ID is re-derived from the material, never trusted from
    /// the wire.
    pub fn from_parts(
        algorithm: KeyAlgorithm,
        key_bytes: Vec<u8>,
        flags: KeyFlags,
        created: u32,
    ) -> Result<Self> {
        if key_bytes.len() != algorithm.public_key_size() {
            return Err(PgpliteError::key(format!(
                "Invalid {} public key size: {} bytes (expected {})",
                algorithm,
                key_bytes.len(),
                algorithm.public_key_size()
            )));
        }
        let key_id = generate_key_id(&key_bytes, algorithm, created);
        Ok(Self {
            key_bytes,
            metadata: KeyMetadata::new(algorithm, flags, created, key_id),
        })
    }

    /// Returns the key's metadata
    pub fn metadata(&self) -> &KeyMetadata {
        &self.metadata
    }

    /// Returns the key's unique identifier
    pub fn key_id(&self) -> u64 {
        self.metadata.key_id
    }

    /// Returns the algorithm used by this key
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.metadata.algorithm
    }

    /// Returns the capability flags
    pub fn flags(&self) -> KeyFlags {
        self.metadata.flags
    }

    /// Checks if this key is usable for encryption
    pub fn can_encrypt(&self) -> bool {
        self.metadata.flags.encrypt && self.metadata.algorithm == KeyAlgorithm::Mlkem768
    }

    /// Returns the raw key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.key_bytes
    }

    /// Computes the SHA3-256 fingerprint of this key
    pub fn fingerprint(&self) -> [u8; 32] {
        fingerprint(&self.key_bytes, self.metadata.algorithm, self.metadata.created)
    }

    /// Returns the ML-KEM-768 public key for encapsulation
    pub fn as_mlkem768(&self) -> Result<Mlkem768PublicKey> {
        if self.metadata.algorithm != KeyAlgorithm::Mlkem768 {
            return Err(PgpliteError::key("Key is not an ML-KEM-768 key"));
        }

        Mlkem768PublicKey::from_bytes(&self.key_bytes)
            .map_err(|_| PgpliteError::key("Failed to reconstruct ML-KEM-768 public key from bytes"))
    }
}

impl SecretKey {
    /// Creates a new unprotected ML-KEM-768 secret key
    pub fn new_mlkem768(
        public: &Mlkem768PublicKey,
        secret: Mlkem768SecretKey,
        flags: KeyFlags,
        created: u32,
    ) -> Self {
        let public_bytes = KemPublicKey::as_bytes(public).to_vec();
        let key_id = generate_key_id(&public_bytes, KeyAlgorithm::Mlkem768, created);
        Self {
            public_bytes,
            storage: SecretKeyStorage::Unprotected(Zeroizing::new(
                KemSecretKey::as_bytes(&secret).to_vec(),
            )),
            metadata: KeyMetadata::new(KeyAlgorithm::Mlkem768, flags, created, key_id),
        }
    }

    /// Creates a new unprotected ML-DSA-65 secret key
    pub fn new_mldsa65(
        public: &Mldsa65PublicKey,
        secret: Mldsa65SecretKey,
        flags: KeyFlags,
        created: u32,
    ) -> Self {
        let public_bytes = SignPublicKey::as_bytes(public).to_vec();
        let key_id = generate_key_id(&public_bytes, KeyAlgorithm::Mldsa65, created);
        Self {
            public_bytes,
            storage: SecretKeyStorage::Unprotected(Zeroizing::new(
                SignSecretKey::as_bytes(&secret).to_vec(),
            )),
            metadata: KeyMetadata::new(KeyAlgorithm::Mldsa65, flags, created, key_id),
        }
    }

    /// Reconstructs a secret key from decoded ring fields
    pub fn from_parts(
        algorithm: KeyAlgorithm,
        public_bytes: Vec<u8>,
        storage: SecretKeyStorage,
        flags: KeyFlags,
        created: u32,
    ) -> Result<Self> {
        if public_bytes.len() != algorithm.public_key_size() {
            return Err(PgpliteError::key(format!(
                "Invalid {} public key size: {} bytes (expected {})",
                algorithm,
                public_bytes.len(),
                algorithm.public_key_size()
            )));
        }
        if let SecretKeyStorage::Unprotected(material) = &storage {
            if material.len() != algorithm.secret_key_size() {
                return Err(PgpliteError::key(format!(
                    "Invalid {} secret key size: {} bytes (expected {})",
                    algorithm,
                    material.len(),
                    algorithm.secret_key_size()
                )));
            }
        }
        let key_id = generate_key_id(&public_bytes, algorithm, created);
        Ok(Self {
            public_bytes,
            storage,
            metadata: KeyMetadata::new(algorithm, flags, created, key_id),
        })
    }

    /// Protects the secret material under a passphrase
    pub fn protect(&mut self, passphrase: &Passphrase) -> Result<()> {
        let material = match &self.storage {
            SecretKeyStorage::Unprotected(bytes) => bytes,
            SecretKeyStorage::Protected(_) => {
                return Err(PgpliteError::key("Secret key is already protected"));
            }
        };

        let protected = ProtectedKeyMaterial::protect(material, passphrase)?;
        self.storage = SecretKeyStorage::Protected(protected);
        Ok(())
    }

    /// Recovers the secret material.
    ///
    /// Unprotected keys ignore any supplied passphrase. Protected keys
    /// require the matching one and fail otherwise.
    pub fn unlock(&self, passphrase: Option<&Passphrase>) -> Result<UnlockedKey> {
        let material = match &self.storage {
            SecretKeyStorage::Unprotected(bytes) => Zeroizing::new(bytes.to_vec()),
            SecretKeyStorage::Protected(protected) => {
                let passphrase = passphrase.ok_or_else(|| {
                    PgpliteError::passphrase("Passphrase required for protected secret key")
                })?;
                protected.reveal(passphrase)?
            }
        };

        Ok(UnlockedKey {
            key_id: self.metadata.key_id,
            algorithm: self.metadata.algorithm,
            material,
        })
    }

    /// Returns true if the secret material is passphrase-protected
    pub fn is_protected(&self) -> bool {
        matches!(self.storage, SecretKeyStorage::Protected(_))
    }

    /// Returns the key's metadata
    pub fn metadata(&self) -> &KeyMetadata {
        &self.metadata
    }

    /// Returns the key's unique identifier
    pub fn key_id(&self) -> u64 {
        self.metadata.key_id
    }

    /// Returns the algorithm used by this key
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.metadata.algorithm
    }

    /// Returns the capability flags
    pub fn flags(&self) -> KeyFlags {
        self.metadata.flags
    }

    /// Returns the matching public key bytes
    pub fn public_bytes(&self) -> &[u8] {
        &self.public_bytes
    }

    /// Checks if this key is usable for decryption
    pub fn can_decrypt(&self) -> bool {
        self.metadata.flags.encrypt && self.metadata.algorithm == KeyAlgorithm::Mlkem768
    }
}

impl UnlockedKey {
    /// Returns the key's unique identifier
    pub fn key_id(&self) -> u64 {
        self.key_id
    }

    /// Returns the algorithm used by this key
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Returns the ML-KEM-768 secret key for decapsulation
    pub fn as_mlkem768(&self) -> Result<Mlkem768SecretKey> {
        if self.algorithm != KeyAlgorithm::Mlkem768 {
            return Err(PgpliteError::key("Key is not an ML-KEM-768 key"));
        }

        Mlkem768SecretKey::from_bytes(&self.material)
            .map_err(|_| PgpliteError::key("Failed to reconstruct ML-KEM-768 secret key from bytes"))
    }
}

impl KeyPair {
    /// Generates a new ML-KEM-768 key pair for encryption.
    ///
    /// The pqcrypto implementation draws randomness from its own
    /// internal CSPRNG.
    pub fn generate_mlkem768() -> Result<Self> {
        let flags = KeyFlags::encrypt_only();
        let created = unix_time();
        let (public_key, secret_key) = mlkem768::keypair();

        let secret = SecretKey::new_mlkem768(&public_key, secret_key, flags, created);
        let public = PublicKey::new_mlkem768(public_key, flags, created);

        Ok(Self { public, secret })
    }

    /// Generates a new ML-DSA-65 key pair for signing and certification.
    ///
    /// The pqcrypto implementation draws randomness from its own
    /// internal CSPRNG.
    pub fn generate_mldsa65() -> Result<Self> {
        let flags = KeyFlags::sign_and_certify();
        let created = unix_time();
        let (public_key, secret_key) = mldsa65::keypair();

        let secret = SecretKey::new_mldsa65(&public_key, secret_key, flags, created);
        let public = PublicKey::new_mldsa65(public_key, flags, created);

        Ok(Self { public, secret })
    }

    /// Returns the public key component
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Returns the secret key component
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// Returns the key's unique identifier
    pub fn key_id(&self) -> u64 {
        self.public.key_id()
    }

    /// Returns the algorithm used by this key pair
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.public.algorithm()
    }

    /// Checks that the public and secret halves describe the same key
    pub fn is_valid(&self) -> bool {
        crate::crypto::key_ids_equal(self.public.key_id(), self.secret.key_id())
            && self.public.algorithm() == self.secret.algorithm()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PublicKey({}, ID: {:016X})",
            self.algorithm(),
            self.key_id()
        )
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SecretKey({}, ID: {:016X})",
            self.algorithm(),
            self.key_id()
        )
    }
}

impl fmt::Display for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KeyPair({}, ID: {:016X})",
            self.algorithm(),
            self.key_id()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mlkem768_key_generation() {
        let keypair = KeyPair::generate_mlkem768().unwrap();

        assert!(keypair.is_valid());
        assert_eq!(keypair.algorithm(), KeyAlgorithm::Mlkem768);
        assert!(keypair.public_key().can_encrypt());
        assert!(keypair.secret_key().can_decrypt());
        assert_eq!(
            keypair.public_key().as_bytes().len(),
            KeyAlgorithm::Mlkem768.public_key_size()
        );
    }

    #[test]
    fn test_mldsa65_key_generation() {
        let keypair = KeyPair::generate_mldsa65().unwrap();

        assert!(keypair.is_valid());
        assert_eq!(keypair.algorithm(), KeyAlgorithm::Mldsa65);
        assert!(!keypair.public_key().can_encrypt());
        assert!(!keypair.secret_key().can_decrypt());
        assert!(keypair.public_key().flags().sign);
    }

    #[test]
    fn test_unlock_unprotected_key() {
        let keypair = KeyPair::generate_mlkem768().unwrap();

        let unlocked = keypair.secret_key().unlock(None).unwrap();
        assert_eq!(unlocked.key_id(), keypair.key_id());
        assert!(unlocked.as_mlkem768().is_ok());

        // A supplied passphrase is ignored for unprotected keys
        let passphrase = Passphrase::from("irrelevant");
        assert!(keypair.secret_key().unlock(Some(&passphrase)).is_ok());
    }

    #[test]
    fn test_protected_key_unlock() {
        let mut keypair = KeyPair::generate_mlkem768().unwrap();
        let passphrase = Passphrase::from("key test passphrase");

        keypair.secret.protect(&passphrase).unwrap();
        assert!(keypair.secret_key().is_protected());

        // Protecting twice fails
        assert!(keypair.secret.protect(&passphrase).is_err());

        // No passphrase fails
        assert!(keypair.secret_key().unlock(None).is_err());

        // Wrong passphrase fails
        let wrong = Passphrase::from("not the passphrase");
        assert!(keypair.secret_key().unlock(Some(&wrong)).is_err());

        // Correct passphrase recovers working material
        let unlocked = keypair.secret_key().unlock(Some(&passphrase)).unwrap();
        assert!(unlocked.as_mlkem768().is_ok());
    }

    #[test]
    fn test_from_parts_key_id_stability() {
        let keypair = KeyPair::generate_mlkem768().unwrap();
        let public = keypair.public_key();

        let rebuilt = PublicKey::from_parts(
            public.algorithm(),
            public.as_bytes().to_vec(),
            public.flags(),
            public.metadata().created,
        )
        .unwrap();

        assert_eq!(rebuilt.key_id(), public.key_id());
        assert_eq!(rebuilt.fingerprint(), public.fingerprint());
    }

    #[test]
    fn test_from_parts_rejects_wrong_size() {
        let result = PublicKey::from_parts(
            KeyAlgorithm::Mlkem768,
            vec![0u8; 100],
            KeyFlags::encrypt_only(),
            1000,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_key_fingerprints_differ() {
        let keypair1 = KeyPair::generate_mlkem768().unwrap();
        let keypair2 = KeyPair::generate_mlkem768().unwrap();

        assert_ne!(
            keypair1.public_key().fingerprint(),
            keypair2.public_key().fingerprint()
        );
    }

    #[test]
    fn test_display_formats_key_id() {
        let keypair = KeyPair::generate_mlkem768().unwrap();
        let display = keypair.public_key().to_string();
        assert!(display.starts_with("PublicKey(ML-KEM-768"));
        assert!(display.contains("ID:"));
    }
}
