//! Command implementations for the pgplite CLI.

use crate::armor::{self, ArmorType};
use crate::cli::utils::{
    format_timestamp, load_message, load_public_ring, load_secret_ring, prompt_for_passphrase,
    read_file, ring_file, write_file,
};
use crate::crypto::KeyPair;
use crate::keyring::KeyRingBuilder;
use crate::message::{decrypt_message, encrypt_message, MessagePolicy};
use crate::validation::Validator;
use crate::Result;
use rand::rngs::OsRng;
use std::path::Path;
use tracing::info;

/// Execute generate-key command
pub fn generate_key(user_id: &str, output_prefix: &Path, passphrase_protected: bool) -> Result<()> {
    Validator::validate_user_id(user_id)?;

    info!(user_id = user_id, "Generating key ring pair");

    // Signing primary with an encryption subkey, the usual ring shape
    let primary = KeyPair::generate_mldsa65()?;
    let encryption_subkey = KeyPair::generate_mlkem768()?;

    let passphrase = if passphrase_protected {
        Some(prompt_for_passphrase(
            "Enter passphrase to protect secret keys",
        )?)
    } else {
        None
    };

    let (public_ring, secret_ring) = KeyRingBuilder::new(primary)
        .subkey(encryption_subkey)
        .user_id(user_id)
        .build(passphrase.as_ref())?;

    let public_path = ring_file(output_prefix, ".pub.asc");
    let secret_path = ring_file(output_prefix, ".sec.asc");

    write_file(
        &public_path,
        armor::encode_public_key(&public_ring.encode()).as_bytes(),
    )?;
    write_file(
        &secret_path,
        armor::encode_private_key(&secret_ring.encode()).as_bytes(),
    )?;

    info!(
        user_id = user_id,
        public_ring = %public_path.display(),
        secret_ring = %secret_path.display(),
        protected = passphrase_protected,
        "Generated key ring pair"
    );

    Ok(())
}

/// Execute list-keys command
pub fn list_keys(ring_file: &Path) -> Result<()> {
    let bytes = read_file(ring_file)?;
    let armored = std::str::from_utf8(&bytes)
        .ok()
        .and_then(|text| armor::decode(text).ok());

    // Armored files carry their kind; binary files are tried both ways
    match armored.map(|a| a.armor_type) {
        Some(ArmorType::PrivateKey) => list_secret_ring(ring_file),
        Some(ArmorType::PublicKey) => list_public_ring(ring_file),
        Some(ArmorType::Message) => Err(crate::PgpliteError::armor(
            "File contains a message, not a key ring",
        )),
        None => list_public_ring(ring_file).or_else(|_| list_secret_ring(ring_file)),
    }
}

fn list_public_ring(path: &Path) -> Result<()> {
    let ring = load_public_ring(path)?;

    if ring.is_empty() {
        info!("No keys found in ring");
        return Ok(());
    }

    for group in ring.groups() {
        info!(
            key_id = format!("{:016X}", group.primary.key_id()),
            algorithm = %group.primary.algorithm(),
            created = format_timestamp(group.primary.metadata().created),
            user_ids = ?group.user_ids,
            "Primary key"
        );
        for subkey in &group.subkeys {
            info!(
                key_id = format!("{:016X}", subkey.key_id()),
                algorithm = %subkey.algorithm(),
                can_encrypt = subkey.can_encrypt(),
                "Subkey"
            );
        }
    }

    Ok(())
}

fn list_secret_ring(path: &Path) -> Result<()> {
    let ring = load_secret_ring(path)?;

    if ring.is_empty() {
        info!("No keys found in ring");
        return Ok(());
    }

    for group in ring.groups() {
        info!(
            key_id = format!("{:016X}", group.primary.key_id()),
            algorithm = %group.primary.algorithm(),
            created = format_timestamp(group.primary.metadata().created),
            protected = group.primary.is_protected(),
            user_ids = ?group.user_ids,
            "Primary secret key"
        );
        for subkey in &group.subkeys {
            info!(
                key_id = format!("{:016X}", subkey.key_id()),
                algorithm = %subkey.algorithm(),
                can_decrypt = subkey.can_decrypt(),
                protected = subkey.is_protected(),
                "Secret subkey"
            );
        }
    }

    Ok(())
}

/// Execute encrypt command
pub fn encrypt(
    ring_file: &Path,
    input_file: &Path,
    output_file: &Path,
    policy: MessagePolicy,
) -> Result<()> {
    let ring = load_public_ring(ring_file)?;

    info!(file = %input_file.display(), "Encrypting file");

    let plaintext = read_file(input_file)?;
    let message = encrypt_message(&ring, &plaintext, policy, &mut OsRng)?;
    let armored = armor::encode_message(&message);

    write_file(output_file, armored.as_bytes())?;

    info!(output_file = %output_file.display(), "File encrypted and saved");

    Ok(())
}

/// Execute decrypt command
pub fn decrypt(ring_file: &Path, input_file: &Path, output_file: &Path) -> Result<()> {
    let ring = load_secret_ring(ring_file)?;

    info!(file = %input_file.display(), "Decrypting file");

    // Prompt only when the ring actually holds protected keys
    let passphrase = if ring.keys().any(|key| key.is_protected()) {
        Some(prompt_for_passphrase("Enter passphrase for secret key")?)
    } else {
        None
    };

    let message = load_message(input_file)?;
    let plaintext = decrypt_message(&ring, passphrase.as_ref(), &message)?;

    write_file(output_file, &plaintext)?;

    info!(output_file = %output_file.display(), "File decrypted and saved");

    Ok(())
}
