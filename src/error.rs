//! Error types for pgplite operations.

use thiserror::Error;

/// Result type alias for pgplite operations.
pub type Result<T> = std::result::Result<T, PgpliteError>;

/// Main error type for pgplite operations.
#[derive(Error, Debug)]
pub enum PgpliteError {
    /// Key ring bytes are not a valid sequence of key group encodings
    #[error("Malformed key ring: {0}")]
    MalformedRing(String),

    /// No encryption-capable key in the public key ring
    #[error("No encryption key found in key ring")]
    NoEncryptionKey,

    /// No secret key in the ring could be unlocked
    #[error("No usable decryption key found in key ring")]
    NoDecryptionKey,

    /// Packet framing errors: bad tags, bad lengths, truncated bodies
    #[error("Malformed packet stream: {0}")]
    MalformedPacketStream(String),

    /// The message envelope does not contain an encrypted data packet
    #[error("Message does not contain encrypted data")]
    NotEncryptedData,

    /// The decrypted envelope body is not a single literal data packet
    #[error("Decrypted message is not literal data")]
    NotLiteralData,

    /// The key algorithm cannot perform the requested operation
    #[error("Unsupported key algorithm: {0}")]
    UnsupportedKeyAlgorithm(String),

    /// Session key unwrap or payload decryption failed.
    ///
    /// Deliberately carries no detail: callers must not be able to tell
    /// which cryptographic step rejected the input.
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Cryptographic operation errors outside the decrypt path
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Key construction or conversion errors
    #[error("Key error: {0}")]
    Key(String),

    /// Passphrase handling errors
    #[error("Passphrase error: {0}")]
    Passphrase(String),

    /// Armor encoding/decoding errors
    #[error("Armor error: {0}")]
    Armor(String),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PgpliteError {
    /// Creates a new malformed key ring error.
    pub fn malformed_ring<T: ToString>(msg: T) -> Self {
        Self::MalformedRing(msg.to_string())
    }

    /// Creates a new malformed packet stream error.
    pub fn malformed_packets<T: ToString>(msg: T) -> Self {
        Self::MalformedPacketStream(msg.to_string())
    }

    /// Creates a new unsupported key algorithm error.
    pub fn unsupported_algorithm<T: ToString>(msg: T) -> Self {
        Self::UnsupportedKeyAlgorithm(msg.to_string())
    }

    /// Creates a new cryptographic error.
    pub fn crypto<T: ToString>(msg: T) -> Self {
        Self::Crypto(msg.to_string())
    }

    /// Creates a new key error.
    pub fn key<T: ToString>(msg: T) -> Self {
        Self::Key(msg.to_string())
    }

    /// Creates a new passphrase error.
    pub fn passphrase<T: ToString>(msg: T) -> Self {
        Self::Passphrase(msg.to_string())
    }

    /// Creates a new armor error.
    pub fn armor<T: ToString>(msg: T) -> Self {
        Self::Armor(msg.to_string())
    }

    /// Creates a new validation error.
    pub fn validation<T: ToString>(msg: T) -> Self {
        Self::Validation(msg.to_string())
    }
}
