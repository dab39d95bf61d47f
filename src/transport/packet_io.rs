//! # Packet I/O Contract
//!
//! The asynchronous duplex interface used by session-level code. It is
//! deliberately callback based so that a packet handed to a read callback can be a
//! zero-copy view into the implementation's working buffer: the view is only valid
//! for the duration of the callback.
//!
//! ## Rules for implementations
//! - At most one read and at most one write are in flight at any time. A caller
//!   must not issue a second read before the first read's callback has fired.
//! - Every callback is invoked exactly once, and never before the initiating call
//!   returns.
//! - Transport failures are reported through [`SocketOperationCode`], never as a
//!   panic or error crossing the asynchronous boundary.

use bytes::Bytes;
use std::fmt;
use std::future::Future;
use tokio::sync::oneshot;

use crate::core::packet::Packet;
use crate::core::payload::PacketPayload;

/// Outcome of an asynchronous socket operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketOperationCode {
    /// The operation succeeded
    Success,
    /// The peer closed the connection or the socket was closed locally
    Closed,
    /// The transport failed while reading
    ReadError,
    /// The transport failed while writing
    WriteError,
    /// A packet with an out-of-range size was received
    MalformedData,
    /// A multi-packet read drained every complete packet that was buffered
    InsufficientData,
}

impl SocketOperationCode {
    pub fn is_success(self) -> bool {
        self == SocketOperationCode::Success
    }
}

impl fmt::Display for SocketOperationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SocketOperationCode::Success => "Success",
            SocketOperationCode::Closed => "Closed",
            SocketOperationCode::ReadError => "Read_Error",
            SocketOperationCode::WriteError => "Write_Error",
            SocketOperationCode::MalformedData => "Malformed_Data",
            SocketOperationCode::InsufficientData => "Insufficient_Data",
        })
    }
}

/// Completion of a single-packet read; the packet is `Some` only on success
pub type ReadCallback = Box<dyn FnOnce(SocketOperationCode, Option<Packet<'_>>) + Send>;

/// Invoked once per packet of a multi-packet read, then once with a terminal code
pub type MultiReadCallback = Box<dyn FnMut(SocketOperationCode, Option<Packet<'_>>) + Send>;

/// Completion of a write
pub type WriteCallback = Box<dyn FnOnce(SocketOperationCode) + Send>;

/// Box a closure as a [`ReadCallback`]
pub fn read_callback<F>(callback: F) -> ReadCallback
where
    F: FnOnce(SocketOperationCode, Option<Packet<'_>>) + Send + 'static,
{
    Box::new(callback)
}

/// Box a closure as a [`MultiReadCallback`]
pub fn multi_read_callback<F>(callback: F) -> MultiReadCallback
where
    F: FnMut(SocketOperationCode, Option<Packet<'_>>) + Send + 'static,
{
    Box::new(callback)
}

/// Box a closure as a [`WriteCallback`]
pub fn write_callback<F>(callback: F) -> WriteCallback
where
    F: FnOnce(SocketOperationCode) + Send + 'static,
{
    Box::new(callback)
}

/// Reads and writes packets
pub trait PacketIo: Send + Sync {
    /// Read the next packet and invoke `callback` on completion.
    fn read(&self, callback: ReadCallback);

    /// Write `payload` and invoke `callback` on completion.
    fn write(&self, payload: PacketPayload, callback: WriteCallback);
}

/// Future-based helpers over [`PacketIo`].
///
/// The read or write is issued when the method is called, not when the returned
/// future is first polled.
pub trait PacketIoExt: PacketIo {
    /// Read the next packet, copying it out of the working buffer.
    fn read_packet(&self) -> impl Future<Output = (SocketOperationCode, Option<Bytes>)> + Send {
        let (tx, rx) = oneshot::channel();
        self.read(read_callback(move |code, packet| {
            let _ = tx.send((code, packet.map(|packet| packet.to_owned_bytes())));
        }));

        async move { rx.await.unwrap_or((SocketOperationCode::Closed, None)) }
    }

    /// Write `payload` and wait for completion.
    fn write_packet(&self, payload: PacketPayload) -> impl Future<Output = SocketOperationCode> + Send {
        let (tx, rx) = oneshot::channel();
        self.write(
            payload,
            write_callback(move |code| {
                let _ = tx.send(code);
            }),
        );

        async move { rx.await.unwrap_or(SocketOperationCode::Closed) }
    }
}

impl<T: PacketIo + ?Sized> PacketIoExt for T {}
