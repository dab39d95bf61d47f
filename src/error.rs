//! # Error Types
//!
//! Error handling for the packet framing and transport layer.
//!
//! Synchronous framing and staging operations return [`Result`]. Asynchronous
//! transport outcomes never surface as a [`ProtocolError`]; they are reported to the
//! caller through [`SocketOperationCode`](crate::transport::SocketOperationCode)
//! values passed to completion callbacks.
//!
//! ## Error Categories
//! - **I/O Errors**: Socket failures while resolving, connecting or accepting
//! - **Framing Errors**: Declared packet sizes outside the legal range
//! - **Staging Errors**: Misuse of an [`AppendContext`](crate::core::append::AppendContext)
//! - **Configuration Errors**: Invalid or unreadable configuration
//!
//! ## Example Usage
//! ```rust
//! use bytes::BytesMut;
//! use packet_io::core::append::AppendContext;
//! use packet_io::error::{ProtocolError, Result};
//!
//! fn stage(buffer: &mut BytesMut) -> Result<()> {
//!     let context = AppendContext::new(buffer, 4);
//!     context.commit(8)
//! }
//!
//! let mut buffer = BytesMut::new();
//! assert!(matches!(stage(&mut buffer), Err(ProtocolError::AppendOverflow { .. })));
//! assert!(buffer.is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Framing errors
    pub const ERR_MALFORMED_PACKET: &str = "Failed processing malformed packet";

    /// Configuration errors
    pub const ERR_INVALID_CONFIG: &str = "Configuration validation failed";
}

/// Primary error type for all synchronous packet I/O operations
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    #[serde(skip_serializing, skip_deserializing)]
    Io(#[from] io::Error),

    #[error("Cannot commit more than reserved append size ({size} > {reserved})")]
    AppendOverflow { size: usize, reserved: usize },

    #[error("Malformed packet: declared size {size} outside [{min}, {max}]")]
    MalformedPacket { size: u32, min: u32, max: u32 },

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Failed to resolve '{host}': {reason}")]
    ResolveError { host: String, reason: String },

    #[error("Failed to connect to '{host}': {reason}")]
    ConnectError { host: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Logging error: {0}")]
    LoggingError(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
