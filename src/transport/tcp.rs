//! TCP accept and connect helpers producing [`PacketSocket`]s.
//!
//! Cancelling a connect is done by dropping its future; nothing is left running.

use tokio::net::{lookup_host, TcpListener, TcpStream};
use tracing::{info, instrument, trace, warn};

use super::socket::PacketSocket;
use crate::config::PacketSocketOptions;
use crate::error::{ProtocolError, Result};

/// Accept the next inbound connection on `listener`.
#[instrument(skip(listener, options))]
pub async fn accept(listener: &TcpListener, options: PacketSocketOptions) -> Result<PacketSocket> {
    match listener.accept().await {
        Ok((stream, peer)) => {
            trace!(%peer, "accepted connection");
            configure(&stream);
            Ok(PacketSocket::new(stream, options))
        }
        Err(e) => {
            warn!(error = %e, "accept returned an error");
            Err(ProtocolError::Io(e))
        }
    }
}

/// Resolve `host` and connect to the first address that accepts.
#[instrument(skip(options))]
pub async fn connect(host: &str, port: u16, options: PacketSocketOptions) -> Result<PacketSocket> {
    let addrs = lookup_host((host, port))
        .await
        .map_err(|e| ProtocolError::ResolveError {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                info!(%host, %addr, "connected");
                configure(&stream);
                return Ok(PacketSocket::new(stream, options));
            }
            Err(e) => {
                trace!(%addr, error = %e, "connect attempt failed");
                last_error = Some(e);
            }
        }
    }

    let reason = match last_error {
        Some(e) => e.to_string(),
        None => "no addresses resolved".to_string(),
    };
    warn!(%host, %reason, "failed when connecting");
    Err(ProtocolError::ConnectError {
        host: host.to_string(),
        reason,
    })
}

fn configure(stream: &TcpStream) {
    if let Err(e) = stream.set_nodelay(true) {
        warn!(error = %e, "failed to set TCP_NODELAY");
    }
}
