//! # packet-io
//!
//! Packet framing and transport I/O for peer-to-peer nodes.
//!
//! Turns a raw byte stream into discrete, length-delimited packets, and stages
//! incoming socket reads so that buffer growth is always either committed or rolled
//! back.
//!
//! ## Layers
//! - [`core`]: packet format, [`AppendContext`], [`PacketExtractor`], codec
//! - [`transport`]: the [`PacketIo`] contract and the [`PacketSocket`] implementation
//! - [`config`]: TOML/environment configuration with validation
//! - [`utils`]: logging setup and metrics
//!
//! ## Example
//! ```rust
//! use bytes::BytesMut;
//! use packet_io::{AppendContext, PacketExtractResult, PacketExtractor};
//!
//! let mut buffer = BytesMut::new();
//!
//! let mut context = AppendContext::new(&mut buffer, 64);
//! let frame = [10, 0, 0, 0, 1, 0, 0, 0, 0xAB, 0xCD];
//! context.buffer()[..frame.len()].copy_from_slice(&frame);
//! context.commit(frame.len()).unwrap();
//!
//! let mut extractor = PacketExtractor::new(&mut buffer, 1024);
//! let (result, packet) = extractor.try_extract_next_packet();
//! assert_eq!(result, PacketExtractResult::Success);
//! assert_eq!(packet.unwrap().payload(), &[0xAB, 0xCD]);
//! extractor.consume();
//! assert!(buffer.is_empty());
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod transport;
pub mod utils;

pub use crate::config::{IoConfig, PacketSocketOptions};
pub use crate::core::{
    AppendContext, Packet, PacketCodec, PacketExtractResult, PacketExtractor, PacketHeader,
    PacketPayload, PacketType, DEFAULT_MAX_PACKET_DATA_SIZE, HEADER_SIZE,
};
pub use crate::error::{ProtocolError, Result};
pub use crate::transport::{PacketIo, PacketIoExt, PacketSocket, SocketOperationCode};
