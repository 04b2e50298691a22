//! Key ring management for pgplite.
//!
//! A key ring is a packet stream of key groups. Each group starts with
//! a primary key packet, followed by the User IDs and subkeys that hang
//! off it. Public and secret rings are distinct types carrying distinct
//! packet tags, and decoding one never accepts packets of the other.
//!
//! Ring order is meaningful: key selection walks groups in the order
//! they appear, primary before subkeys, so the same ring always yields
//! the same key.

use tracing::{debug, warn};

use crate::crypto::{Passphrase, PublicKey, SecretKey, UnlockedKey};
use crate::error::{PgpliteError, Result};
use crate::packet::{
    parse_packets, Packet, PacketType, PublicKeyPacket, SecretKeyPacket, UserIdPacket,
};
use crate::validation::Validator;

/// A primary public key with its attached User IDs and subkeys
#[derive(Debug, Clone)]
pub struct PublicKeyGroup {
    /// The primary key that opens the group
    pub primary: PublicKey,
    /// Subkeys bound to the primary
    pub subkeys: Vec<PublicKey>,
    /// User IDs bound to the primary
    pub user_ids: Vec<String>,
}

impl PublicKeyGroup {
    /// Creates a group containing just a primary key
    pub fn new(primary: PublicKey) -> Self {
        Self {
            primary,
            subkeys: Vec::new(),
            user_ids: Vec::new(),
        }
    }
}

/// A primary secret key with its attached User IDs and subkeys
#[derive(Clone)]
pub struct SecretKeyGroup {
    /// The primary key that opens the group
    pub primary: SecretKey,
    /// Subkeys bound to the primary
    pub subkeys: Vec<SecretKey>,
    /// User IDs bound to the primary
    pub user_ids: Vec<String>,
}

impl SecretKeyGroup {
    /// Creates a group containing just a primary key
    pub fn new(primary: SecretKey) -> Self {
        Self {
            primary,
            subkeys: Vec::new(),
            user_ids: Vec::new(),
        }
    }
}

/// An ordered collection of public key groups
#[derive(Debug, Clone, Default)]
pub struct PublicKeyRing {
    groups: Vec<PublicKeyGroup>,
}

/// An ordered collection of secret key groups
#[derive(Clone, Default)]
pub struct SecretKeyRing {
    groups: Vec<SecretKeyGroup>,
}

impl PublicKeyRing {
    /// Creates a new empty ring
    pub fn new() -> Self {
        Self { groups: Vec::new() }
    }

    /// Appends a key group to the ring
    pub fn add_group(&mut self, group: PublicKeyGroup) {
        self.groups.push(group);
    }

    /// Returns the key groups in ring order
    pub fn groups(&self) -> &[PublicKeyGroup] {
        &self.groups
    }

    /// Iterates over every key in ring order, primaries before their
    /// subkeys
    pub fn keys(&self) -> impl Iterator<Item = &PublicKey> {
        self.groups
            .iter()
            .flat_map(|group| std::iter::once(&group.primary).chain(group.subkeys.iter()))
    }

    /// Returns the total number of keys in the ring
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| 1 + g.subkeys.len()).sum()
    }

    /// Checks if the ring contains no keys
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Serializes the ring to a packet stream
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::new();

        for group in &self.groups {
            let body = PublicKeyPacket::from_key(&group.primary).to_bytes();
            bytes.extend(Packet::new(PacketType::PublicKey, body).to_bytes());

            for user_id in &group.user_ids {
                let body = UserIdPacket::new(user_id.clone()).to_bytes();
                bytes.extend(Packet::new(PacketType::UserId, body).to_bytes());
            }

            for subkey in &group.subkeys {
                let body = PublicKeyPacket::from_key(subkey).to_bytes();
                bytes.extend(Packet::new(PacketType::PublicSubkey, body).to_bytes());
            }
        }

        bytes
    }

    /// Parses a ring from a packet stream.
    ///
    /// Any structural failure, from packet framing up to key material
    /// sizes, is reported as a malformed ring.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_inner(data).map_err(ring_error)
    }

    fn decode_inner(data: &[u8]) -> Result<Self> {
        let mut groups: Vec<PublicKeyGroup> = Vec::new();
        let mut key_count = 0;

        for packet in parse_packets(data)? {
            match packet.header.packet_type {
                PacketType::PublicKey => {
                    let key = PublicKeyPacket::from_bytes(&packet.body)?.into_key()?;
                    groups.push(PublicKeyGroup::new(key));
                    key_count += 1;
                }
                PacketType::PublicSubkey => {
                    let group = groups.last_mut().ok_or_else(|| {
                        PgpliteError::malformed_ring("Subkey packet before any primary key")
                    })?;
                    let key = PublicKeyPacket::from_bytes(&packet.body)?.into_key()?;
                    group.subkeys.push(key);
                    key_count += 1;
                }
                PacketType::UserId => {
                    let group = groups.last_mut().ok_or_else(|| {
                        PgpliteError::malformed_ring("User ID packet before any primary key")
                    })?;
                    let user_id = UserIdPacket::from_bytes(&packet.body)?.user_id;
                    group.user_ids.push(user_id);
                }
                PacketType::SecretKey | PacketType::SecretSubkey => {
                    return Err(PgpliteError::malformed_ring(
                        "Secret key packet in public key ring",
                    ));
                }
                other => {
                    return Err(PgpliteError::malformed_ring(format!(
                        "Unexpected {:?} packet in key ring",
                        other
                    )));
                }
            }

            Validator::validate_ring_size(key_count)?;
        }

        Ok(Self { groups })
    }

    /// Selects the key a new message should be encrypted to.
    ///
    /// Walks the ring in order and returns the first encryption-capable
    /// key. The same ring always selects the same key.
    pub fn select_encryption_key(&self) -> Result<&PublicKey> {
        for key in self.keys() {
            if key.can_encrypt() {
                debug!(
                    key_id = format_args!("{:016X}", key.key_id()),
                    "selected encryption key"
                );
                return Ok(key);
            }
            debug!(
                key_id = format_args!("{:016X}", key.key_id()),
                algorithm = %key.algorithm(),
                "skipping key without encryption capability"
            );
        }

        Err(PgpliteError::NoEncryptionKey)
    }
}

impl SecretKeyRing {
    /// Creates a new empty ring
    pub fn new() -> Self {
        Self { groups: Vec::new() }
    }

    /// Appends a key group to the ring
    pub fn add_group(&mut self, group: SecretKeyGroup) {
        self.groups.push(group);
    }

    /// Returns the key groups in ring order
    pub fn groups(&self) -> &[SecretKeyGroup] {
        &self.groups
    }

    /// Iterates over every key in ring order, primaries before their
    /// subkeys
    pub fn keys(&self) -> impl Iterator<Item = &SecretKey> {
        self.groups
            .iter()
            .flat_map(|group| std::iter::once(&group.primary).chain(group.subkeys.iter()))
    }

    /// Returns the total number of keys in the ring
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| 1 + g.subkeys.len()).sum()
    }

    /// Checks if the ring contains no keys
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Serializes the ring to a packet stream
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::new();

        for group in &self.groups {
            let body = SecretKeyPacket::from_key(&group.primary).to_bytes();
            bytes.extend(Packet::new(PacketType::SecretKey, body).to_bytes());

            for user_id in &group.user_ids {
                let body = UserIdPacket::new(user_id.clone()).to_bytes();
                bytes.extend(Packet::new(PacketType::UserId, body).to_bytes());
            }

            for subkey in &group.subkeys {
                let body = SecretKeyPacket::from_key(subkey).to_bytes();
                bytes.extend(Packet::new(PacketType::SecretSubkey, body).to_bytes());
            }
        }

        bytes
    }

    /// Parses a ring from a packet stream.
    ///
    /// Any structural failure, from packet framing up to key material
    /// sizes, is reported as a malformed ring.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_inner(data).map_err(ring_error)
    }

    fn decode_inner(data: &[u8]) -> Result<Self> {
        let mut groups: Vec<SecretKeyGroup> = Vec::new();
        let mut key_count = 0;

        for packet in parse_packets(data)? {
            match packet.header.packet_type {
                PacketType::SecretKey => {
                    let key = SecretKeyPacket::from_bytes(&packet.body)?.into_key()?;
                    groups.push(SecretKeyGroup::new(key));
                    key_count += 1;
                }
                PacketType::SecretSubkey => {
                    let group = groups.last_mut().ok_or_else(|| {
                        PgpliteError::malformed_ring("Subkey packet before any primary key")
                    })?;
                    let key = SecretKeyPacket::from_bytes(&packet.body)?.into_key()?;
                    group.subkeys.push(key);
                    key_count += 1;
                }
                PacketType::UserId => {
                    let group = groups.last_mut().ok_or_else(|| {
                        PgpliteError::malformed_ring("User ID packet before any primary key")
                    })?;
                    let user_id = UserIdPacket::from_bytes(&packet.body)?.user_id;
                    group.user_ids.push(user_id);
                }
                PacketType::PublicKey | PacketType::PublicSubkey => {
                    return Err(PgpliteError::malformed_ring(
                        "Public key packet in secret key ring",
                    ));
                }
                other => {
                    return Err(PgpliteError::malformed_ring(format!(
                        "Unexpected {:?} packet in key ring",
                        other
                    )));
                }
            }

            Validator::validate_ring_size(key_count)?;
        }

        Ok(Self { groups })
    }

    /// Selects a usable decryption key and unlocks it.
    ///
    /// Walks the ring in order and returns the first decryption-capable
    /// key whose material can actually be recovered under the supplied
    /// passphrase. Keys that fail to unlock are logged and skipped, so
    /// one unusable key never blocks the rest of the ring.
    pub fn select_decryption_key(&self, passphrase: Option<&Passphrase>) -> Result<UnlockedKey> {
        for key in self.keys() {
            if !key.can_decrypt() {
                debug!(
                    key_id = format_args!("{:016X}", key.key_id()),
                    algorithm = %key.algorithm(),
                    "skipping key without decryption capability"
                );
                continue;
            }

            match key.unlock(passphrase) {
                Ok(unlocked) => {
                    debug!(
                        key_id = format_args!("{:016X}", key.key_id()),
                        "selected decryption key"
                    );
                    return Ok(unlocked);
                }
                Err(e) => {
                    warn!(
                        key_id = format_args!("{:016X}", key.key_id()),
                        error = %e,
                        "skipping secret key that failed to unlock"
                    );
                }
            }
        }

        Err(PgpliteError::NoDecryptionKey)
    }
}

/// Maps structural decode failures to the malformed ring error
fn ring_error(e: PgpliteError) -> PgpliteError {
    match e {
        PgpliteError::MalformedPacketStream(msg)
        | PgpliteError::Validation(msg)
        | PgpliteError::Key(msg)
        | PgpliteError::Passphrase(msg) => PgpliteError::malformed_ring(msg),
        other => other,
    }
}

/// Builder assembling matched public and secret rings from key pairs
pub struct KeyRingBuilder {
    primary: crate::crypto::KeyPair,
    subkeys: Vec<crate::crypto::KeyPair>,
    user_ids: Vec<String>,
}

impl KeyRingBuilder {
    /// Starts a ring around a primary key pair
    pub fn new(primary: crate::crypto::KeyPair) -> Self {
        Self {
            primary,
            subkeys: Vec::new(),
            user_ids: Vec::new(),
        }
    }

    /// Adds a subkey pair
    pub fn subkey(mut self, keypair: crate::crypto::KeyPair) -> Self {
        self.subkeys.push(keypair);
        self
    }

    /// Adds a User ID
    pub fn user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_ids.push(user_id.into());
        self
    }

    /// Builds the matched ring pair, protecting every secret key when a
    /// passphrase is supplied
    pub fn build(
        self,
        passphrase: Option<&Passphrase>,
    ) -> Result<(PublicKeyRing, SecretKeyRing)> {
        let mut public_group = PublicKeyGroup::new(self.primary.public.clone());
        let mut secret_group = SecretKeyGroup::new(self.primary.secret.clone());

        public_group.user_ids = self.user_ids.clone();
        secret_group.user_ids = self.user_ids;

        for keypair in self.subkeys {
            public_group.subkeys.push(keypair.public);
            secret_group.subkeys.push(keypair.secret);
        }

        if let Some(passphrase) = passphrase {
            secret_group.primary.protect(passphrase)?;
            for subkey in &mut secret_group.subkeys {
                subkey.protect(passphrase)?;
            }
        }

        let mut public_ring = PublicKeyRing::new();
        public_ring.add_group(public_group);
        let mut secret_ring = SecretKeyRing::new();
        secret_ring.add_group(secret_group);

        Ok((public_ring, secret_ring))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn build_rings(passphrase: Option<&Passphrase>) -> (PublicKeyRing, SecretKeyRing) {
        let primary = KeyPair::generate_mldsa65().expect("key generation should succeed");
        let subkey = KeyPair::generate_mlkem768().expect("key generation should succeed");

        KeyRingBuilder::new(primary)
            .subkey(subkey)
            .user_id("Alice <alice@example.com>")
            .build(passphrase)
            .expect("ring construction should succeed")
    }

    #[test]
    fn test_builder_assembles_matched_rings() {
        let (public_ring, secret_ring) = build_rings(None);

        assert_eq!(public_ring.len(), 2);
        assert_eq!(secret_ring.len(), 2);
        assert_eq!(public_ring.groups()[0].user_ids, vec!["Alice <alice@example.com>"]);

        let public_ids: Vec<u64> = public_ring.keys().map(|k| k.key_id()).collect();
        let secret_ids: Vec<u64> = secret_ring.keys().map(|k| k.key_id()).collect();
        assert_eq!(public_ids, secret_ids);
    }

    #[test]
    fn test_public_ring_roundtrip() {
        let (public_ring, _) = build_rings(None);

        let encoded = public_ring.encode();
        let decoded = PublicKeyRing::decode(&encoded).expect("decode should succeed");

        assert_eq!(decoded.len(), public_ring.len());
        let original_ids: Vec<u64> = public_ring.keys().map(|k| k.key_id()).collect();
        let decoded_ids: Vec<u64> = decoded.keys().map(|k| k.key_id()).collect();
        assert_eq!(decoded_ids, original_ids);
        assert_eq!(decoded.groups()[0].user_ids, public_ring.groups()[0].user_ids);
    }

    #[test]
    fn test_secret_ring_roundtrip() {
        let (_, secret_ring) = build_rings(None);

        let encoded = secret_ring.encode();
        let decoded = SecretKeyRing::decode(&encoded).expect("decode should succeed");

        assert_eq!(decoded.len(), secret_ring.len());
        decoded
            .select_decryption_key(None)
            .expect("decoded ring should still unlock");
    }

    #[test]
    fn test_protected_secret_ring_roundtrip() {
        let passphrase = Passphrase::from("ring passphrase");
        let (_, secret_ring) = build_rings(Some(&passphrase));

        let decoded =
            SecretKeyRing::decode(&secret_ring.encode()).expect("decode should succeed");
        assert!(decoded.keys().all(|k| k.is_protected()));

        decoded
            .select_decryption_key(Some(&passphrase))
            .expect("unlocking with the right passphrase should succeed");
    }

    #[test]
    fn test_empty_ring_decode() {
        let ring = PublicKeyRing::decode(&[]).expect("empty ring should decode");
        assert!(ring.is_empty());
        assert!(matches!(
            ring.select_encryption_key(),
            Err(PgpliteError::NoEncryptionKey)
        ));

        let secret = SecretKeyRing::decode(&[]).expect("empty ring should decode");
        assert!(matches!(
            secret.select_decryption_key(None),
            Err(PgpliteError::NoDecryptionKey)
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = PublicKeyRing::decode(&[0x01, 0x02, 0x03]);
        assert!(matches!(result, Err(PgpliteError::MalformedRing(_))));
    }

    #[test]
    fn test_decode_rejects_dangling_subkey() {
        let (public_ring, _) = build_rings(None);
        let subkey = &public_ring.groups()[0].subkeys[0];

        let body = PublicKeyPacket::from_key(subkey).to_bytes();
        let stream = Packet::new(PacketType::PublicSubkey, body).to_bytes();

        assert!(matches!(
            PublicKeyRing::decode(&stream),
            Err(PgpliteError::MalformedRing(_))
        ));
    }

    #[test]
    fn test_decode_rejects_dangling_user_id() {
        let body = UserIdPacket::new("Nobody <nobody@example.com>".to_string()).to_bytes();
        let stream = Packet::new(PacketType::UserId, body).to_bytes();

        assert!(matches!(
            PublicKeyRing::decode(&stream),
            Err(PgpliteError::MalformedRing(_))
        ));
    }

    #[test]
    fn test_decode_rejects_mixed_ring_kinds() {
        let (public_ring, secret_ring) = build_rings(None);

        // Secret packets have no business in a public ring
        assert!(matches!(
            PublicKeyRing::decode(&secret_ring.encode()),
            Err(PgpliteError::MalformedRing(_))
        ));
        assert!(matches!(
            SecretKeyRing::decode(&public_ring.encode()),
            Err(PgpliteError::MalformedRing(_))
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_ring() {
        let (public_ring, _) = build_rings(None);
        let encoded = public_ring.encode();

        let result = PublicKeyRing::decode(&encoded[..encoded.len() - 10]);
        assert!(matches!(result, Err(PgpliteError::MalformedRing(_))));
    }

    #[test]
    fn test_encryption_key_selection_prefers_ring_order() {
        let (public_ring, _) = build_rings(None);

        // The ML-DSA primary cannot encrypt, so the subkey is chosen
        let selected = public_ring
            .select_encryption_key()
            .expect("selection should succeed");
        assert_eq!(selected.key_id(), public_ring.groups()[0].subkeys[0].key_id());

        // Selection is deterministic
        for _ in 0..3 {
            let again = public_ring
                .select_encryption_key()
                .expect("selection should succeed");
            assert_eq!(again.key_id(), selected.key_id());
        }
    }

    #[test]
    fn test_encryption_key_selection_picks_first_capable_key() {
        let first = KeyPair::generate_mlkem768().expect("key generation should succeed");
        let second = KeyPair::generate_mlkem768().expect("key generation should succeed");
        let first_id = first.public.key_id();

        let mut ring = PublicKeyRing::new();
        let mut group = PublicKeyGroup::new(first.public);
        group.subkeys.push(second.public);
        ring.add_group(group);

        let selected = ring.select_encryption_key().expect("selection should succeed");
        assert_eq!(selected.key_id(), first_id);
    }

    #[test]
    fn test_signing_only_ring_has_no_encryption_key() {
        let primary = KeyPair::generate_mldsa65().expect("key generation should succeed");
        let (public_ring, _) = KeyRingBuilder::new(primary)
            .user_id("Signer <signer@example.com>")
            .build(None)
            .expect("ring construction should succeed");

        assert!(matches!(
            public_ring.select_encryption_key(),
            Err(PgpliteError::NoEncryptionKey)
        ));
    }

    #[test]
    fn test_decryption_key_selection_requires_matching_passphrase() {
        let passphrase = Passphrase::from("right");
        let (_, secret_ring) = build_rings(Some(&passphrase));

        secret_ring
            .select_decryption_key(Some(&passphrase))
            .expect("matching passphrase should unlock");

        let wrong = Passphrase::from("wrong");
        assert!(matches!(
            secret_ring.select_decryption_key(Some(&wrong)),
            Err(PgpliteError::NoDecryptionKey)
        ));
        assert!(matches!(
            secret_ring.select_decryption_key(None),
            Err(PgpliteError::NoDecryptionKey)
        ));
    }

    #[test]
    fn test_decryption_key_selection_skips_signing_keys() {
        let (_, secret_ring) = build_rings(None);

        let unlocked = secret_ring
            .select_decryption_key(None)
            .expect("selection should succeed");
        assert_eq!(
            unlocked.key_id(),
            secret_ring.groups()[0].subkeys[0].key_id()
        );
    }
}
