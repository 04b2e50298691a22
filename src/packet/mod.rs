//! OpenPGP-style packet framing.
//!
//! Every object on the wire is a packet: a one-byte tag, a variable
//! length field, and a body. Packets nest to form the message envelope
//! (compressed data wrapping encrypted data wrapping literal data) and
//! concatenate to form key rings. Only the new-format header encoding
//! from RFC 4880 is supported, and only the packet tags this crate
//! actually produces; anything else is rejected while parsing.

use crate::error::{PgpliteError, Result};
use crate::validation::{Validator, MAX_PACKET_SIZE};

pub mod compressed;
pub mod encrypted;
pub mod key;
pub mod literal;

pub use compressed::CompressedDataPacket;
pub use encrypted::EncryptedDataPacket;
pub use key::{PublicKeyPacket, SecretKeyPacket};
pub use literal::LiteralDataPacket;

/// The packet tags this implementation understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// Secret-Key Packet
    SecretKey = 5,
    /// Public-Key Packet
    PublicKey = 6,
    /// Secret-Subkey Packet
    SecretSubkey = 7,
    /// Compressed Data Packet
    CompressedData = 8,
    /// Literal Data Packet
    LiteralData = 11,
    /// User ID Packet
    UserId = 13,
    /// Public-Subkey Packet
    PublicSubkey = 14,
    /// Encrypted Data Packet
    EncryptedData = 18,
}

impl PacketType {
    /// Converts the packet type to its tag byte
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Converts a tag byte to a packet type
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            5 => Some(Self::SecretKey),
            6 => Some(Self::PublicKey),
            7 => Some(Self::SecretSubkey),
            8 => Some(Self::CompressedData),
            11 => Some(Self::LiteralData),
            13 => Some(Self::UserId),
            14 => Some(Self::PublicSubkey),
            18 => Some(Self::EncryptedData),
            _ => None,
        }
    }
}

/// Packet header: tag plus body length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketHeader {
    /// Packet type
    pub packet_type: PacketType,
    /// Packet body length
    pub length: usize,
}

impl PacketHeader {
    /// Creates a new packet header
    pub fn new(packet_type: PacketType, length: usize) -> Self {
        Self {
            packet_type,
            length,
        }
    }

    /// Serializes the header in the new packet format
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();

        // New packet format: 0xC0 plus the tag
        bytes.push(0xC0 | self.packet_type.to_byte());

        if self.length < 192 {
            bytes.push(self.length as u8);
        } else if self.length < 8384 {
            let encoded = self.length - 192;
            bytes.push(192 + (encoded >> 8) as u8);
            bytes.push((encoded & 0xFF) as u8);
        } else {
            // 5-byte length
            bytes.push(0xFF);
            bytes.extend_from_slice(&(self.length as u32).to_be_bytes());
        }

        bytes
    }

    /// Parses a header from the start of `data`, returning the header
    /// and the number of bytes consumed
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize)> {
        if data.is_empty() {
            return Err(PgpliteError::malformed_packets("Empty packet header"));
        }

        let first_byte = data[0];
        let mut consumed = 1;

        if (first_byte & 0x80) == 0 {
            return Err(PgpliteError::malformed_packets(
                "Invalid packet header: MSB not set",
            ));
        }
        if (first_byte & 0x40) == 0 {
            return Err(PgpliteError::malformed_packets(
                "Old packet format not supported",
            ));
        }

        let tag_byte = first_byte & 0x3F;
        let packet_type = PacketType::from_byte(tag_byte)
            .ok_or_else(|| PgpliteError::malformed_packets(format!("Unknown packet type: {}", tag_byte)))?;

        if data.len() < 2 {
            return Err(PgpliteError::malformed_packets("Incomplete packet header"));
        }

        let (length, length_bytes) = if data[1] < 192 {
            (data[1] as usize, 1)
        } else if data[1] < 224 {
            if data.len() < 3 {
                return Err(PgpliteError::malformed_packets("Incomplete two-byte length"));
            }
            let len = ((data[1] as usize - 192) << 8) + data[2] as usize + 192;
            (len, 2)
        } else if data[1] == 255 {
            if data.len() < 6 {
                return Err(PgpliteError::malformed_packets("Incomplete five-byte length"));
            }
            let len = u32::from_be_bytes([data[2], data[3], data[4], data[5]]) as usize;
            if len > MAX_PACKET_SIZE {
                return Err(PgpliteError::malformed_packets(format!(
                    "Packet length {} exceeds maximum of {} bytes",
                    len, MAX_PACKET_SIZE
                )));
            }
            (len, 5)
        } else {
            return Err(PgpliteError::malformed_packets(
                "Partial body length not supported",
            ));
        };

        consumed += length_bytes;

        Ok((
            Self {
                packet_type,
                length,
            },
            consumed,
        ))
    }
}

/// A complete packet: header plus body bytes
#[derive(Debug, Clone)]
pub struct Packet {
    /// Packet header
    pub header: PacketHeader,
    /// Packet body data
    pub body: Vec<u8>,
}

impl Packet {
    /// Creates a new packet around a body
    pub fn new(packet_type: PacketType, body: Vec<u8>) -> Self {
        let header = PacketHeader::new(packet_type, body.len());
        Self { header, body }
    }

    /// Serializes the packet to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header.to_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }

    /// Parses one packet from the start of `data`, returning the packet
    /// and the number of bytes consumed
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize)> {
        let (header, header_len) = PacketHeader::from_bytes(data)?;

        if data.len() < header_len + header.length {
            return Err(PgpliteError::malformed_packets("Incomplete packet body"));
        }

        let body = data[header_len..header_len + header.length].to_vec();
        let consumed = header_len + header.length;

        Ok((Self { header, body }, consumed))
    }
}

/// Parses a whole byte sequence as back-to-back packets.
///
/// Empty input yields an empty stream; any leftover bytes that do not
/// form a valid packet fail the whole parse.
pub fn parse_packets(data: &[u8]) -> Result<Vec<Packet>> {
    let mut packets = Vec::new();
    let mut offset = 0;

    while offset < data.len() {
        let (packet, consumed) = Packet::from_bytes(&data[offset..])?;
        offset += consumed;
        packets.push(packet);
        Validator::validate_packet_count(packets.len())?;
    }

    Ok(packets)
}

/// User ID packet carrying a UTF-8 identity string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdPacket {
    /// User ID string (typically a name plus email)
    pub user_id: String,
}

impl UserIdPacket {
    /// Creates a new User ID packet
    pub fn new(user_id: String) -> Self {
        Self { user_id }
    }

    /// Serializes to packet body bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        self.user_id.as_bytes().to_vec()
    }

    /// Parses from packet body bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(PgpliteError::malformed_packets("Empty User ID packet"));
        }

        let user_id = String::from_utf8(data.to_vec())
            .map_err(|_| PgpliteError::malformed_packets("Invalid UTF-8 in User ID"))?;

        Validator::validate_user_id(&user_id)?;

        Ok(Self { user_id })
    }
}

/// Bounds-checked single byte read used by the packet body parsers
pub(crate) fn read_u8(data: &[u8], offset: usize) -> Result<u8> {
    data.get(offset).copied().ok_or_else(|| {
        PgpliteError::malformed_packets(format!(
            "Truncated packet body: need {} bytes, have {}",
            offset + 1,
            data.len()
        ))
    })
}

/// Bounds-checked big-endian u16 read used by the packet body parsers
pub(crate) fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
    if data.len() < offset + 2 {
        return Err(PgpliteError::malformed_packets(format!(
            "Truncated packet body: need {} bytes, have {}",
            offset + 2,
            data.len()
        )));
    }
    Ok(u16::from_be_bytes([data[offset], data[offset + 1]]))
}

/// Bounds-checked big-endian u32 read used by the packet body parsers
pub(crate) fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    if data.len() < offset + 4 {
        return Err(PgpliteError::malformed_packets(format!(
            "Truncated packet body: need {} bytes, have {}",
            offset + 4,
            data.len()
        )));
    }
    Ok(u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]))
}

/// Bounds-checked slice read used by the packet body parsers
pub(crate) fn read_slice(data: &[u8], offset: usize, length: usize) -> Result<&[u8]> {
    if data.len() < offset + length {
        return Err(PgpliteError::malformed_packets(format!(
            "Truncated packet body: need {} bytes, have {}",
            offset + length,
            data.len()
        )));
    }
    Ok(&data[offset..offset + length])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_type_conversion() {
        assert_eq!(PacketType::PublicKey.to_byte(), 6);
        assert_eq!(PacketType::EncryptedData.to_byte(), 18);
        assert_eq!(PacketType::from_byte(6), Some(PacketType::PublicKey));
        assert_eq!(PacketType::from_byte(11), Some(PacketType::LiteralData));

        // Tags outside the supported subset are unknown
        assert_eq!(PacketType::from_byte(2), None);
        assert_eq!(PacketType::from_byte(19), None);
        assert_eq!(PacketType::from_byte(255), None);
    }

    #[test]
    fn test_packet_header_roundtrip() {
        let header = PacketHeader::new(PacketType::PublicKey, 100);
        let bytes = header.to_bytes();

        let (parsed, consumed) = PacketHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.packet_type, PacketType::PublicKey);
        assert_eq!(parsed.length, 100);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn test_packet_header_length_encoding() {
        let test_cases = vec![
            (50, vec![0xC0 | PacketType::PublicKey.to_byte(), 50]),
            (
                200,
                vec![0xC0 | PacketType::PublicKey.to_byte(), 192, 8],
            ), // 200 = 192 + 8
            (
                10000,
                vec![0xC0 | PacketType::PublicKey.to_byte(), 255, 0, 0, 39, 16],
            ), // 10000 in big-endian
        ];

        for (length, expected_bytes) in test_cases {
            let header = PacketHeader::new(PacketType::PublicKey, length);
            let bytes = header.to_bytes();
            assert_eq!(bytes, expected_bytes);

            let (parsed, _) = PacketHeader::from_bytes(&bytes).unwrap();
            assert_eq!(parsed.length, length);
        }
    }

    #[test]
    fn test_header_rejects_old_format() {
        // MSB set but the new-format bit clear
        let result = PacketHeader::from_bytes(&[0x99, 0x05]);
        assert!(matches!(
            result,
            Err(PgpliteError::MalformedPacketStream(_))
        ));
    }

    #[test]
    fn test_header_rejects_unknown_tag() {
        // Tag 2 (signature) is outside the supported subset
        let result = PacketHeader::from_bytes(&[0xC2, 0x05]);
        assert!(matches!(
            result,
            Err(PgpliteError::MalformedPacketStream(_))
        ));
    }

    #[test]
    fn test_header_rejects_partial_length() {
        let result = PacketHeader::from_bytes(&[0xC6, 224]);
        assert!(matches!(
            result,
            Err(PgpliteError::MalformedPacketStream(_))
        ));
    }

    #[test]
    fn test_header_rejects_oversized_length() {
        // Five-byte length claiming 4GB
        let result = PacketHeader::from_bytes(&[0xC6, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(
            result,
            Err(PgpliteError::MalformedPacketStream(_))
        ));
    }

    #[test]
    fn test_header_rejects_empty_and_garbage() {
        assert!(PacketHeader::from_bytes(&[]).is_err());
        // MSB not set
        assert!(PacketHeader::from_bytes(&[0x06, 0x01]).is_err());
    }

    #[test]
    fn test_packet_roundtrip() {
        let body = vec![1, 2, 3, 4, 5];
        let packet = Packet::new(PacketType::UserId, body.clone());
        let bytes = packet.to_bytes();

        let (parsed, consumed) = Packet::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.header.packet_type, PacketType::UserId);
        assert_eq!(parsed.body, body);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn test_packet_rejects_truncated_body() {
        let packet = Packet::new(PacketType::UserId, vec![0u8; 32]);
        let bytes = packet.to_bytes();

        let result = Packet::from_bytes(&bytes[..bytes.len() - 5]);
        assert!(matches!(
            result,
            Err(PgpliteError::MalformedPacketStream(_))
        ));
    }

    #[test]
    fn test_parse_packet_stream() {
        let mut stream = Packet::new(PacketType::UserId, b"alice".to_vec()).to_bytes();
        stream.extend(Packet::new(PacketType::UserId, b"bob".to_vec()).to_bytes());

        let packets = parse_packets(&stream).unwrap();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].body, b"alice");
        assert_eq!(packets[1].body, b"bob");
    }

    #[test]
    fn test_parse_empty_stream() {
        let packets = parse_packets(&[]).unwrap();
        assert!(packets.is_empty());
    }

    #[test]
    fn test_parse_stream_with_trailing_garbage() {
        let mut stream = Packet::new(PacketType::UserId, b"alice".to_vec()).to_bytes();
        stream.push(0x00);

        assert!(parse_packets(&stream).is_err());
    }

    #[test]
    fn test_user_id_packet_roundtrip() {
        let user_id = "Alice <alice@example.com>".to_string();
        let packet = UserIdPacket::new(user_id.clone());
        let bytes = packet.to_bytes();

        let parsed = UserIdPacket::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.user_id, user_id);
    }

    #[test]
    fn test_user_id_packet_rejects_invalid() {
        assert!(UserIdPacket::from_bytes(&[]).is_err());
        assert!(UserIdPacket::from_bytes(&[0xFF, 0xFE]).is_err());
    }

    #[test]
    fn test_body_read_helpers() {
        let data = [1, 2, 3, 4, 5, 6, 7, 8];

        assert_eq!(read_u8(&data, 0).unwrap(), 1);
        assert_eq!(read_u16(&data, 0).unwrap(), 0x0102);
        assert_eq!(read_u32(&data, 2).unwrap(), 0x03040506);
        assert_eq!(read_slice(&data, 2, 3).unwrap(), &[3, 4, 5]);

        assert!(read_u8(&data, 8).is_err());
        assert!(read_u16(&data, 7).is_err());
        assert!(read_u32(&data, 6).is_err());
        assert!(read_slice(&data, 5, 5).is_err());
    }
}
