//! Outbound packet payloads.
//!
//! A [`PacketPayload`] is a header plus a list of data buffers. The buffers are
//! written to the transport back to back after the header, so callers can assemble a
//! packet from independently owned pieces without copying them together first.

use bytes::{Bytes, BytesMut};

use super::packet::{PacketHeader, PacketType, HEADER_SIZE};
use crate::error::{ProtocolError, Result};

/// Header and data buffers making up one outbound packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketPayload {
    header: PacketHeader,
    buffers: Vec<Bytes>,
}

impl PacketPayload {
    /// Header-only packet of type `packet_type`
    pub fn new(packet_type: PacketType) -> Self {
        Self {
            header: PacketHeader {
                size: HEADER_SIZE as u32,
                packet_type,
            },
            buffers: Vec::new(),
        }
    }

    /// Packet carrying a single data buffer
    pub fn from_data(packet_type: PacketType, data: impl Into<Bytes>) -> Result<Self> {
        Self::from_buffers(packet_type, vec![data.into()])
    }

    /// Packet whose payload is the concatenation of `buffers`
    pub fn from_buffers(packet_type: PacketType, buffers: Vec<Bytes>) -> Result<Self> {
        let payload_size = buffers
            .iter()
            .try_fold(0usize, |total, buffer| total.checked_add(buffer.len()))
            .ok_or(ProtocolError::OversizedPacket(usize::MAX))?;

        let header = PacketHeader::for_payload(packet_type, payload_size)?;
        let buffers = buffers.into_iter().filter(|b| !b.is_empty()).collect();
        Ok(Self { header, buffers })
    }

    /// Wrap an already framed packet (header included) without copying it.
    pub fn from_packet_bytes(bytes: Bytes) -> Result<Self> {
        let header = super::packet::Packet::from_slice(&bytes)?.header();
        let data = bytes.slice(HEADER_SIZE..);
        let buffers = if data.is_empty() { Vec::new() } else { vec![data] };
        Ok(Self { header, buffers })
    }

    pub fn header(&self) -> &PacketHeader {
        &self.header
    }

    pub fn buffers(&self) -> &[Bytes] {
        &self.buffers
    }

    /// Total encoded size, header included
    pub fn size(&self) -> usize {
        self.header.size as usize
    }

    /// Flatten into one contiguous frame
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.size());
        self.header.encode(&mut out);
        for buffer in &self.buffers {
            out.extend_from_slice(buffer);
        }

        out.freeze()
    }
}
