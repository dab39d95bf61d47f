//! # Packet Format
//!
//! Every packet on the wire is a fixed-size header followed by a variable-length
//! payload:
//!
//! ```text
//! [Size(4, LE)] [Type(4, LE)] [Payload(Size - 8)]
//! ```
//!
//! `Size` counts the whole packet, header included, so the smallest legal packet is
//! a bare header of [`HEADER_SIZE`] bytes.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::error::{ProtocolError, Result};

/// Width of the leading size field
pub const SIZE_FIELD_SIZE: usize = 4;

/// Size of [`PacketHeader`] on the wire
pub const HEADER_SIZE: usize = SIZE_FIELD_SIZE + 4;

/// Default bound on packet payload size (150 KB)
pub const DEFAULT_MAX_PACKET_DATA_SIZE: usize = 150 * 1024;

/// Packet type discriminant.
///
/// The framing layer attaches no meaning to the value; higher layers assign it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PacketType(pub u32);

impl PacketType {
    /// Type of a packet whose meaning has not been set
    pub const UNDEFINED: PacketType = PacketType(0);

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for PacketType {
    fn from(value: u32) -> Self {
        PacketType(value)
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-layout prefix of every packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Total packet size including this header
    pub size: u32,
    /// Packet type
    pub packet_type: PacketType,
}

impl PacketHeader {
    /// Create a header for a packet carrying `payload_size` payload bytes.
    pub fn for_payload(packet_type: PacketType, payload_size: usize) -> Result<Self> {
        let size = payload_size
            .checked_add(HEADER_SIZE)
            .and_then(|size| u32::try_from(size).ok())
            .ok_or(ProtocolError::OversizedPacket(payload_size))?;

        Ok(Self { size, packet_type })
    }

    /// Decode a header from the front of `bytes`, returning `None` if too short.
    #[inline]
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let size = read_size_field(bytes)?;
        let type_bytes: [u8; 4] = bytes.get(SIZE_FIELD_SIZE..HEADER_SIZE)?.try_into().ok()?;

        Some(Self {
            size,
            packet_type: PacketType(u32::from_le_bytes(type_bytes)),
        })
    }

    /// Encode into the wire representation
    #[inline]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..SIZE_FIELD_SIZE].copy_from_slice(&self.size.to_le_bytes());
        out[SIZE_FIELD_SIZE..].copy_from_slice(&self.packet_type.0.to_le_bytes());
        out
    }

    /// Append the wire representation to `dst`
    #[inline]
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE);
        dst.put_u32_le(self.size);
        dst.put_u32_le(self.packet_type.0);
    }

    /// Number of payload bytes following the header
    pub fn payload_size(&self) -> usize {
        (self.size as usize).saturating_sub(HEADER_SIZE)
    }
}

/// Narrow a length for error reporting, saturating at `u32::MAX`
#[inline]
pub(crate) fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Read the little-endian size field at the front of `bytes`
#[inline]
pub(crate) fn read_size_field(bytes: &[u8]) -> Option<u32> {
    let size_bytes: [u8; SIZE_FIELD_SIZE] = bytes.get(..SIZE_FIELD_SIZE)?.try_into().ok()?;
    Some(u32::from_le_bytes(size_bytes))
}

/// Borrowed, zero-copy view of one complete packet.
///
/// The view borrows the buffer it was extracted from, so it cannot outlive the next
/// append to or compaction of that buffer. Copy out anything needed beyond that
/// point with [`Packet::to_owned_bytes`].
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a> {
    header: PacketHeader,
    bytes: &'a [u8],
}

impl<'a> Packet<'a> {
    /// Interpret `bytes` as exactly one packet.
    ///
    /// Fails unless `bytes` holds a full header whose size field equals `bytes.len()`.
    pub fn from_slice(bytes: &'a [u8]) -> Result<Self> {
        let header = PacketHeader::decode(bytes).ok_or(ProtocolError::MalformedPacket {
            size: saturating_u32(bytes.len()),
            min: HEADER_SIZE as u32,
            max: u32::MAX,
        })?;

        if header.size as usize != bytes.len() {
            return Err(ProtocolError::MalformedPacket {
                size: header.size,
                min: saturating_u32(bytes.len()),
                max: saturating_u32(bytes.len()),
            });
        }

        Ok(Self { header, bytes })
    }

    /// `bytes` must have been validated by the extractor.
    pub(crate) fn new_validated(bytes: &'a [u8]) -> Self {
        debug_assert!(bytes.len() >= HEADER_SIZE);
        let header = PacketHeader {
            size: bytes.len() as u32,
            packet_type: PacketType(u32::from_le_bytes([
                bytes[4], bytes[5], bytes[6], bytes[7],
            ])),
        };

        Self { header, bytes }
    }

    pub fn header(&self) -> PacketHeader {
        self.header
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn packet_type(&self) -> PacketType {
        self.header.packet_type
    }

    /// Payload bytes following the header
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[HEADER_SIZE..]
    }

    /// Whole packet, header included
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Copy the packet out of the borrowed buffer
    pub fn to_owned_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.bytes)
    }
}

impl fmt::Debug for Packet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("size", &self.header.size)
            .field("packet_type", &self.header.packet_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout_is_little_endian() {
        let header = PacketHeader {
            size: 0x0102_0304,
            packet_type: PacketType(0x0A0B_0C0D),
        };

        assert_eq!(
            header.to_bytes(),
            [0x04, 0x03, 0x02, 0x01, 0x0D, 0x0C, 0x0B, 0x0A]
        );
        assert_eq!(PacketHeader::decode(&header.to_bytes()), Some(header));
    }

    #[test]
    fn test_header_decode_requires_full_header() {
        assert!(PacketHeader::decode(&[8, 0, 0, 0, 1, 0, 0]).is_none());
        assert!(read_size_field(&[8, 0, 0]).is_none());
        assert_eq!(read_size_field(&[8, 0, 0, 0]), Some(8));
    }

    #[test]
    fn test_header_for_payload_counts_header() {
        let header = PacketHeader::for_payload(PacketType(7), 12).unwrap();
        assert_eq!(header.size, 20);
        assert_eq!(header.payload_size(), 12);

        assert!(matches!(
            PacketHeader::for_payload(PacketType(7), u32::MAX as usize),
            Err(ProtocolError::OversizedPacket(_))
        ));
    }

    #[test]
    fn test_saturating_u32() {
        assert_eq!(saturating_u32(12), 12);
        assert_eq!(saturating_u32(u32::MAX as usize), u32::MAX);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(saturating_u32(u32::MAX as usize + 1), u32::MAX);
    }

    #[test]
    fn test_packet_from_slice() {
        let bytes = [10, 0, 0, 0, 3, 0, 0, 0, 0xAA, 0xBB];
        let packet = Packet::from_slice(&bytes).unwrap();

        assert_eq!(packet.size(), 10);
        assert_eq!(packet.packet_type(), PacketType(3));
        assert_eq!(packet.payload(), &[0xAA, 0xBB]);

        assert!(Packet::from_slice(&bytes[..9]).is_err());
        assert!(Packet::from_slice(&bytes[..4]).is_err());
    }
}
