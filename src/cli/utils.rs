//! Utility functions for CLI operations.

use crate::armor::{self, ArmorType};
use crate::crypto::Passphrase;
use crate::keyring::{PublicKeyRing, SecretKeyRing};
use crate::{PgpliteError, Result};
use rpassword::prompt_password;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

/// Read file contents
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    let mut file = fs::File::open(path)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    Ok(contents)
}

/// Write file contents
pub fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents)?;
    Ok(())
}

/// Appends a suffix to a path, keeping any existing extension
pub fn ring_file(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Format Unix timestamp as human-readable string
pub fn format_timestamp(timestamp: u32) -> String {
    let datetime = UNIX_EPOCH + Duration::from_secs(timestamp as u64);

    // Basic timestamp formatting for CLI display
    format!("{:?}", datetime)
}

/// Prompt for a passphrase securely (no echo to terminal)
pub fn prompt_for_passphrase(prompt: &str) -> Result<Passphrase> {
    let passphrase = prompt_password(format!("{}: ", prompt))
        .map_err(|e| PgpliteError::passphrase(format!("Failed to read passphrase: {}", e)))?;

    if passphrase.is_empty() {
        return Err(PgpliteError::passphrase("Passphrase cannot be empty"));
    }

    Ok(Passphrase::from(passphrase.as_str()))
}

/// Strips armor when present, verifying the block type matches
fn unwrap_armor(bytes: Vec<u8>, expected: ArmorType) -> Result<Vec<u8>> {
    match std::str::from_utf8(&bytes)
        .ok()
        .and_then(|text| armor::decode(text).ok())
    {
        Some(armored) => {
            if armored.armor_type != expected {
                return Err(PgpliteError::armor(format!(
                    "Expected {}, found {}",
                    expected.header_string(),
                    armored.armor_type.header_string()
                )));
            }
            Ok(armored.data)
        }
        // Not armored at all: treat the file as binary packet data
        None => Ok(bytes),
    }
}

/// Loads a public key ring from an armored or binary file
pub fn load_public_ring(path: &Path) -> Result<PublicKeyRing> {
    let data = unwrap_armor(read_file(path)?, ArmorType::PublicKey)?;
    PublicKeyRing::decode(&data)
}

/// Loads a secret key ring from an armored or binary file
pub fn load_secret_ring(path: &Path) -> Result<SecretKeyRing> {
    let data = unwrap_armor(read_file(path)?, ArmorType::PrivateKey)?;
    SecretKeyRing::decode(&data)
}

/// Loads an encrypted message from an armored or binary file
pub fn load_message(path: &Path) -> Result<Vec<u8>> {
    unwrap_armor(read_file(path)?, ArmorType::Message)
}
