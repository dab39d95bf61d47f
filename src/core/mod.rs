//! # Core Framing Components
//!
//! Low-level packet format, buffer staging and extraction.
//!
//! ## Components
//! - **Packet**: Header layout and zero-copy packet views
//! - **Payload**: Outbound header-plus-buffers packets
//! - **Append**: Commit-or-rollback reservations on a byte buffer
//! - **Extractor**: Zero-copy packet scanner with deferred compaction
//! - **Codec**: Tokio codec for framing over byte streams
//!
//! ## Wire Format
//! ```text
//! [Size(4, LE)] [Type(4, LE)] [Payload(N)]
//! ```
//!
//! ## Security
//! - Declared sizes are validated before any payload is buffered against them
//! - Out-of-range sizes are fatal; no attempt is made to resynchronise
//! - Packet views borrow the buffer and cannot outlive its next mutation

pub mod append;
pub mod codec;
pub mod extractor;
pub mod packet;
pub mod payload;

pub use append::AppendContext;
pub use codec::PacketCodec;
pub use extractor::{PacketExtractResult, PacketExtractor};
pub use packet::{
    Packet, PacketHeader, PacketType, DEFAULT_MAX_PACKET_DATA_SIZE, HEADER_SIZE,
};
pub use payload::PacketPayload;
