//! # Packet Extractor
//!
//! Slices complete, size-validated packets off the front of a byte buffer.
//!
//! Extraction never copies or mutates the buffer. The extractor only advances an
//! internal read offset, so several packets that arrived in a single read can be
//! drained back to back. [`PacketExtractor::consume`] is the one operation that
//! shrinks the buffer, dropping everything extracted so far in a single step.
//!
//! ## Validation
//! The declared size of every packet must lie in
//! `[HEADER_SIZE, max_packet_data_size + HEADER_SIZE]`. A size outside that range
//! is reported as [`PacketExtractResult::PacketError`]; the stream cannot be
//! resynchronised afterwards and the connection must be dropped.

use bytes::{Buf, BytesMut};
use std::fmt;
use tracing::trace;

use super::packet::{read_size_field, Packet, HEADER_SIZE};

/// Outcome of a single extraction attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketExtractResult {
    /// A complete packet was extracted
    Success,
    /// More bytes are needed before a packet can be extracted
    InsufficientData,
    /// The declared packet size is out of range
    PacketError,
}

impl fmt::Display for PacketExtractResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PacketExtractResult::Success => "Success",
            PacketExtractResult::InsufficientData => "Insufficient_Data",
            PacketExtractResult::PacketError => "Packet_Error",
        })
    }
}

/// Stateful packet scanner over a borrowed byte buffer
#[derive(Debug)]
pub struct PacketExtractor<'a> {
    buffer: &'a mut BytesMut,
    max_packet_size: usize,
    read_offset: usize,
}

impl<'a> PacketExtractor<'a> {
    /// Create an extractor accepting payloads of up to `max_packet_data_size` bytes.
    pub fn new(buffer: &'a mut BytesMut, max_packet_data_size: usize) -> Self {
        Self {
            buffer,
            max_packet_size: max_packet_data_size.saturating_add(HEADER_SIZE),
            read_offset: 0,
        }
    }

    /// Largest legal packet size, header included
    pub fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }

    /// Bytes extracted but not yet consumed
    pub fn pending_size(&self) -> usize {
        self.read_offset
    }

    /// Bytes not yet extracted
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.read_offset
    }

    /// Attempt to extract the next packet.
    ///
    /// The returned view borrows the extractor, so it must be released before the
    /// next extraction or [`consume`](Self::consume).
    pub fn try_extract_next_packet(&mut self) -> (PacketExtractResult, Option<Packet<'_>>) {
        let unread = &self.buffer[self.read_offset..];

        let size = match read_size_field(unread) {
            Some(size) => size as usize,
            None => return (PacketExtractResult::InsufficientData, None),
        };

        if size < HEADER_SIZE || size > self.max_packet_size {
            trace!(
                size,
                max_packet_size = self.max_packet_size,
                "declared packet size out of range"
            );
            return (PacketExtractResult::PacketError, None);
        }

        if unread.len() < size {
            return (PacketExtractResult::InsufficientData, None);
        }

        let start = self.read_offset;
        self.read_offset += size;

        let packet = Packet::new_validated(&self.buffer[start..start + size]);
        (PacketExtractResult::Success, Some(packet))
    }

    /// Drop all extracted bytes from the front of the buffer.
    ///
    /// Does nothing when no packet has been extracted since the last call.
    pub fn consume(&mut self) {
        if self.read_offset == 0 {
            return;
        }

        self.buffer.advance(self.read_offset);
        self.read_offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::packet::{DEFAULT_MAX_PACKET_DATA_SIZE, SIZE_FIELD_SIZE};

    const DEFAULT_MAX_PACKET_SIZE: usize = DEFAULT_MAX_PACKET_DATA_SIZE + HEADER_SIZE;

    fn set_value_at_offset(buffer: &mut BytesMut, offset: usize, value: u32) {
        buffer[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn zeroed(size: usize) -> BytesMut {
        BytesMut::zeroed(size)
    }

    fn assert_extract_failure(extractor: &mut PacketExtractor<'_>, expected: PacketExtractResult) {
        let (result, packet) = extractor.try_extract_next_packet();
        assert_eq!(result, expected);
        assert!(packet.is_none());
    }

    fn assert_extract_success(extractor: &mut PacketExtractor<'_>, expected: &[u8]) {
        let (result, packet) = extractor.try_extract_next_packet();
        assert_eq!(result, PacketExtractResult::Success);
        assert_eq!(packet.expect("packet").as_bytes(), expected);
    }

    #[test]
    fn test_cannot_extract_with_incomplete_size() {
        for size in 0..SIZE_FIELD_SIZE {
            let mut buffer = BytesMut::from(&[0xFFu8; 3][..size]);
            let mut extractor = PacketExtractor::new(&mut buffer, DEFAULT_MAX_PACKET_DATA_SIZE);
            assert_extract_failure(&mut extractor, PacketExtractResult::InsufficientData);
        }
    }

    #[test]
    fn test_size_below_header_is_error() {
        let mut buffer = zeroed(4);
        set_value_at_offset(&mut buffer, 0, HEADER_SIZE as u32 - 1);
        let mut extractor = PacketExtractor::new(&mut buffer, DEFAULT_MAX_PACKET_DATA_SIZE);

        assert_extract_failure(&mut extractor, PacketExtractResult::PacketError);
    }

    #[test]
    fn test_size_above_max_is_error() {
        let mut buffer = zeroed(4);
        set_value_at_offset(&mut buffer, 0, DEFAULT_MAX_PACKET_SIZE as u32 + 1);
        let mut extractor = PacketExtractor::new(&mut buffer, DEFAULT_MAX_PACKET_DATA_SIZE);
        assert_extract_failure(&mut extractor, PacketExtractResult::PacketError);

        let mut buffer = zeroed(4);
        set_value_at_offset(&mut buffer, 0, 21);
        let mut extractor = PacketExtractor::new(&mut buffer, 20 - HEADER_SIZE);
        assert_extract_failure(&mut extractor, PacketExtractResult::PacketError);
    }

    #[test]
    fn test_incomplete_packet_with_known_size() {
        for size in [HEADER_SIZE, 10, DEFAULT_MAX_PACKET_SIZE] {
            let mut buffer = zeroed(4);
            set_value_at_offset(&mut buffer, 0, size as u32);
            let mut extractor = PacketExtractor::new(&mut buffer, DEFAULT_MAX_PACKET_DATA_SIZE);
            assert_extract_failure(&mut extractor, PacketExtractResult::InsufficientData);
        }
    }

    #[test]
    fn test_extract_header_only_and_max_size() {
        for size in [HEADER_SIZE, 19, 20] {
            let mut buffer = BytesMut::from(&(0..size).map(|i| i as u8).collect::<Vec<_>>()[..]);
            set_value_at_offset(&mut buffer, 0, size as u32);
            let expected = buffer.to_vec();

            let mut extractor = PacketExtractor::new(&mut buffer, 20 - HEADER_SIZE);
            assert_extract_success(&mut extractor, &expected);
            assert_extract_failure(&mut extractor, PacketExtractResult::InsufficientData);
        }
    }

    #[test]
    fn test_packet_error_does_not_advance() {
        let mut buffer = zeroed(8);
        set_value_at_offset(&mut buffer, 0, 2);
        let mut extractor = PacketExtractor::new(&mut buffer, DEFAULT_MAX_PACKET_DATA_SIZE);

        assert_extract_failure(&mut extractor, PacketExtractResult::PacketError);
        assert_eq!(extractor.pending_size(), 0);
        extractor.consume();
        assert_eq!(buffer.len(), 8);
    }

    #[test]
    fn test_pending_and_remaining_track_offset() {
        let mut buffer = zeroed(32);
        set_value_at_offset(&mut buffer, 0, 20);
        let mut extractor = PacketExtractor::new(&mut buffer, DEFAULT_MAX_PACKET_DATA_SIZE);

        assert_eq!(extractor.remaining(), 32);
        let _ = extractor.try_extract_next_packet();
        assert_eq!(extractor.pending_size(), 20);
        assert_eq!(extractor.remaining(), 12);

        extractor.consume();
        assert_eq!(extractor.pending_size(), 0);
        assert_eq!(extractor.remaining(), 12);
    }

    #[test]
    fn test_view_exposes_type_and_payload() {
        let mut buffer = BytesMut::from(&[11u8, 0, 0, 0, 0x2A, 0, 0, 0, 1, 2, 3][..]);
        let mut extractor = PacketExtractor::new(&mut buffer, DEFAULT_MAX_PACKET_DATA_SIZE);

        let (_, packet) = extractor.try_extract_next_packet();
        let packet = packet.expect("packet");
        assert_eq!(packet.packet_type().value(), 42);
        assert_eq!(packet.payload(), &[1, 2, 3]);
    }

    #[test]
    fn test_display_matches_wire_names() {
        assert_eq!(PacketExtractResult::PacketError.to_string(), "Packet_Error");
        assert_eq!(
            PacketExtractResult::InsufficientData.to_string(),
            "Insufficient_Data"
        );
    }
}
