//! # Transport Layer
//!
//! Asynchronous packet I/O over byte-stream transports.
//!
//! ## Components
//! - **PacketIo**: The callback-based read/write contract used by session code
//! - **PacketSocket**: Reference implementation over any tokio `AsyncRead + AsyncWrite`
//! - **WorkingBuffer**: Per-connection staging buffer with memory reclamation
//! - **TCP**: Accept/connect helpers returning packet sockets
//!
//! ## Concurrency
//! Each packet socket processes at most one read and one write at a time. Only the
//! socket's reader task touches its working buffer.

pub mod packet_io;
pub mod socket;
pub mod tcp;
pub mod working_buffer;

pub use packet_io::{
    multi_read_callback, read_callback, write_callback, MultiReadCallback, PacketIo,
    PacketIoExt, ReadCallback, SocketOperationCode, WriteCallback,
};
pub use socket::{PacketSocket, PacketSocketStats, StatsCallback};
pub use working_buffer::WorkingBuffer;
