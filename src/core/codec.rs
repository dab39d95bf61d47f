//! Tokio codec for packet framing.
//!
//! [`PacketCodec`] applies the same size bounds as [`PacketExtractor`] but yields
//! owned frames, for callers that prefer `Framed` streams over the callback-driven
//! [`PacketSocket`](crate::transport::socket::PacketSocket). Decoded frames are split
//! off the read buffer without copying.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::error;

use super::extractor::{PacketExtractResult, PacketExtractor};
use super::packet::{
    read_size_field, saturating_u32, DEFAULT_MAX_PACKET_DATA_SIZE, HEADER_SIZE,
};
use super::payload::PacketPayload;
use crate::error::{constants, ProtocolError, Result};

#[derive(Debug, Clone, Copy)]
pub struct PacketCodec {
    max_packet_data_size: usize,
}

impl PacketCodec {
    pub fn new(max_packet_data_size: usize) -> Self {
        Self {
            max_packet_data_size,
        }
    }

    pub fn max_packet_data_size(&self) -> usize {
        self.max_packet_data_size
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PACKET_DATA_SIZE)
    }
}

impl Decoder for PacketCodec {
    type Item = PacketPayload;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let (result, size) = {
            let mut extractor = PacketExtractor::new(src, self.max_packet_data_size);
            let (result, packet) = extractor.try_extract_next_packet();
            (result, packet.map(|packet| packet.size()))
        };

        let size = match (result, size) {
            (PacketExtractResult::Success, Some(size)) => size,
            (PacketExtractResult::PacketError, _) => {
                let size = read_size_field(&src[..]).unwrap_or_default();
                error!(size, "{}", constants::ERR_MALFORMED_PACKET);
                return Err(ProtocolError::MalformedPacket {
                    size,
                    min: HEADER_SIZE as u32,
                    max: saturating_u32(self.max_packet_data_size.saturating_add(HEADER_SIZE)),
                });
            }
            _ => return Ok(None),
        };

        let frame = src.split_to(size).freeze();
        PacketPayload::from_packet_bytes(frame).map(Some)
    }
}

impl Encoder<PacketPayload> for PacketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: PacketPayload, dst: &mut BytesMut) -> Result<()> {
        if item.size() > self.max_packet_data_size.saturating_add(HEADER_SIZE) {
            return Err(ProtocolError::OversizedPacket(item.size()));
        }

        dst.reserve(item.size());
        item.header().encode(dst);
        for buffer in item.buffers() {
            dst.extend_from_slice(buffer);
        }

        Ok(())
    }
}
