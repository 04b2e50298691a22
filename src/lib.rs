//! # pgplite - Post-quantum message encryption
//!
//! A compact OpenPGP-style message encryption library built on
//! post-quantum primitives. Messages are nested packet envelopes
//! encrypted to a single recipient: a fresh session key encrypts the
//! payload, and the session key is wrapped with the recipient's KEM
//! key.
//!
//! ## Cryptographic Algorithms
//!
//! - **Key Encapsulation**: ML-KEM-768 (NIST FIPS 203)
//! - **Signing Key Algorithm**: ML-DSA-65 (NIST FIPS 204)
//! - **Symmetric Encryption**: AES-256-GCM, with 3DES-CBC read and
//!   written only for legacy interop
//! - **Hashing**: SHA3-256
//!
//! ## Examples
//!
//! ### Key generation
//!
//! ```rust,no_run
//! use pgplite::crypto::KeyPair;
//! use pgplite::keyring::KeyRingBuilder;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let primary = KeyPair::generate_mldsa65()?;
//! let subkey = KeyPair::generate_mlkem768()?;
//! let (public_ring, secret_ring) = KeyRingBuilder::new(primary)
//!     .subkey(subkey)
//!     .user_id("Alice <alice@example.com>")
//!     .build(None)?;
//! println!("Generated a ring holding {} keys", public_ring.len());
//! # Ok(())
//! # }
//! ```
//!
//! ### Encryption and decryption
//!
//! ```rust,no_run
//! use pgplite::crypto::KeyPair;
//! use pgplite::keyring::KeyRingBuilder;
//! use pgplite::message::{decrypt_message, encrypt_message, MessagePolicy};
//! use rand::rngs::OsRng;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let keypair = KeyPair::generate_mlkem768()?;
//! let (public_ring, secret_ring) = KeyRingBuilder::new(keypair).build(None)?;
//!
//! let message = encrypt_message(
//!     &public_ring,
//!     b"Secret message",
//!     MessagePolicy::default(),
//!     &mut OsRng,
//! )?;
//! let plaintext = decrypt_message(&secret_ring, None, &message)?;
//! assert_eq!(plaintext, b"Secret message");
//! # Ok(())
//! # }
//! ```

pub mod armor;
pub mod cli;
pub mod crypto;
pub mod error;
pub mod keyring;
pub mod message;
pub mod packet;
pub mod validation;

pub use error::{PgpliteError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Packet format version carried in key packets
pub const PGP_VERSION: u8 = 4;
