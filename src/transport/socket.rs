//! # Packet Socket
//!
//! Reference [`PacketIo`] implementation over any tokio byte stream.
//!
//! Each socket runs two tasks. The reader task owns the read half of the transport
//! and the [`WorkingBuffer`]; the writer task owns the write half. Requests reach
//! them over unbounded channels and are processed strictly in order, which gives the
//! one-read/one-write-in-flight guarantee without locks. Callbacks run on those
//! tasks, never inline in the initiating call.
//!
//! ## Read cycle
//! 1. Drain complete packets already buffered through a [`PacketExtractor`].
//! 2. If none were complete, stage a transport read through an
//!    [`AppendContext`], commit the bytes received, and go back to 1.
//! 3. Compact the buffer once the delivered packets have been handed out.
//!
//! A malformed packet is fatal: the callback receives
//! [`SocketOperationCode::MalformedData`] and the caller is expected to close the
//! socket.
//!
//! [`PacketExtractor`]: crate::core::extractor::PacketExtractor
//! [`AppendContext`]: crate::core::append::AppendContext

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace};

use super::packet_io::{
    MultiReadCallback, PacketIo, ReadCallback, SocketOperationCode, WriteCallback,
};
use super::working_buffer::WorkingBuffer;
use crate::config::PacketSocketOptions;
use crate::core::extractor::PacketExtractResult;
use crate::core::packet::Packet;
use crate::core::payload::PacketPayload;
use crate::error::constants;
use crate::utils::metrics::IoMetrics;

/// Point-in-time socket statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketSocketStats {
    /// `false` once the socket has been closed
    pub is_open: bool,
    /// Bytes received but not yet delivered as packets
    pub num_unprocessed_bytes: usize,
}

/// Completion of a stats request
pub type StatsCallback = Box<dyn FnOnce(PacketSocketStats) + Send>;

enum ReadRequest {
    Single(ReadCallback),
    Multiple(MultiReadCallback),
}

impl ReadRequest {
    fn abort(self, code: SocketOperationCode) {
        match self {
            ReadRequest::Single(callback) => callback(code, None),
            ReadRequest::Multiple(mut callback) => callback(code, None),
        }
    }
}

struct WriteRequest {
    payload: PacketPayload,
    callback: WriteCallback,
}

/// Packet-framed duplex socket
pub struct PacketSocket {
    read_tx: mpsc::UnboundedSender<ReadRequest>,
    write_tx: mpsc::UnboundedSender<WriteRequest>,
    shutdown: CancellationToken,
    unprocessed_bytes: Arc<AtomicUsize>,
    metrics: Arc<IoMetrics>,
    runtime: Handle,
}

impl PacketSocket {
    /// Wrap `transport`, spawning the reader and writer tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<T>(transport: T, options: PacketSocketOptions) -> Self
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::with_metrics(transport, options, Arc::new(IoMetrics::new()))
    }

    /// Like [`PacketSocket::new`], reporting into a shared metrics collector.
    pub fn with_metrics<T>(transport: T, options: PacketSocketOptions, metrics: Arc<IoMetrics>) -> Self
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(transport);
        let (read_tx, read_rx) = mpsc::unbounded_channel();
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let unprocessed_bytes = Arc::new(AtomicUsize::new(0));
        let runtime = Handle::current();

        let reader = SocketReader {
            transport: read_half,
            buffer: WorkingBuffer::new(options),
            shutdown: shutdown.clone(),
            unprocessed_bytes: unprocessed_bytes.clone(),
            metrics: metrics.clone(),
        };
        runtime.spawn(reader.run(read_rx));

        let writer = SocketWriter {
            transport: write_half,
            shutdown: shutdown.clone(),
            metrics: metrics.clone(),
        };
        runtime.spawn(writer.run(write_rx));

        Self {
            read_tx,
            write_tx,
            shutdown,
            unprocessed_bytes,
            metrics,
            runtime,
        }
    }

    /// Read every complete packet currently available.
    ///
    /// `callback` receives each packet with [`SocketOperationCode::Success`], then
    /// a final [`SocketOperationCode::InsufficientData`] once the buffered packets
    /// are exhausted, or an error code instead.
    pub fn read_multiple(&self, callback: MultiReadCallback) {
        self.send_read(ReadRequest::Multiple(callback));
    }

    /// Report socket statistics
    pub fn stats(&self, callback: StatsCallback) {
        let stats = PacketSocketStats {
            is_open: !self.shutdown.is_cancelled(),
            num_unprocessed_bytes: self.unprocessed_bytes.load(Ordering::Acquire),
        };
        self.runtime.spawn(async move { callback(stats) });
    }

    /// Close the socket. Pending and future operations complete with
    /// [`SocketOperationCode::Closed`].
    pub fn close(&self) {
        debug!("closing packet socket");
        self.shutdown.cancel();
    }

    pub fn is_open(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    pub fn metrics(&self) -> &Arc<IoMetrics> {
        &self.metrics
    }

    fn send_read(&self, request: ReadRequest) {
        if let Err(mpsc::error::SendError(request)) = self.read_tx.send(request) {
            self.runtime
                .spawn(async move { request.abort(SocketOperationCode::Closed) });
        }
    }
}

impl PacketIo for PacketSocket {
    fn read(&self, callback: ReadCallback) {
        self.send_read(ReadRequest::Single(callback));
    }

    fn write(&self, payload: PacketPayload, callback: WriteCallback) {
        let request = WriteRequest { payload, callback };
        if let Err(mpsc::error::SendError(request)) = self.write_tx.send(request) {
            self.runtime
                .spawn(async move { (request.callback)(SocketOperationCode::Closed) });
        }
    }
}

impl Drop for PacketSocket {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

type PacketSink<'a> = dyn FnMut(SocketOperationCode, Option<Packet<'_>>) + Send + 'a;

enum ExtractOutcome {
    /// The request was completed
    Completed,
    /// No complete packet is buffered
    NeedMoreData,
}

struct SocketReader<R> {
    transport: ReadHalf<R>,
    buffer: WorkingBuffer,
    shutdown: CancellationToken,
    unprocessed_bytes: Arc<AtomicUsize>,
    metrics: Arc<IoMetrics>,
}

impl<R: AsyncRead> SocketReader<R> {
    async fn run(mut self, mut requests: mpsc::UnboundedReceiver<ReadRequest>) {
        loop {
            let request = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                request = requests.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };

            match request {
                ReadRequest::Single(callback) => {
                    let mut callback = Some(callback);
                    self.read(
                        &mut |code: SocketOperationCode, packet: Option<Packet<'_>>| {
                            if let Some(callback) = callback.take() {
                                callback(code, packet);
                            }
                        },
                        false,
                    )
                    .await;
                }
                ReadRequest::Multiple(mut callback) => {
                    self.read(&mut *callback, true).await;
                }
            }

            self.publish_unprocessed();
        }

        requests.close();
        while let Ok(request) = requests.try_recv() {
            request.abort(SocketOperationCode::Closed);
        }
        trace!("socket reader stopped");
        self.metrics.log_summary();
    }

    #[instrument(skip(self, callback), level = "trace")]
    async fn read(
        &mut self,
        callback: &mut PacketSink<'_>,
        allow_multiple: bool,
    ) {
        loop {
            if let ExtractOutcome::Completed = self.extract(callback, allow_multiple) {
                return;
            }

            // Nothing was extracted, so nothing is pending consumption and the
            // staged read has the buffer to itself.
            if self.buffer.try_reclaim() {
                self.metrics.reclamation();
            }

            let mut context = self.buffer.prepare_append();
            let received = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => None,
                result = self.transport.read(context.buffer()) => Some(result),
            };

            let code = match received {
                None => SocketOperationCode::Closed,
                Some(Ok(0)) => {
                    info!("eof reading from socket");
                    SocketOperationCode::Closed
                }
                Some(Ok(size)) => match context.commit(size) {
                    Ok(()) => {
                        trace!(size, "committed bytes from socket");
                        self.metrics.bytes_committed(size);
                        self.publish_unprocessed();
                        continue;
                    }
                    Err(e) => {
                        error!(error = %e, "failed staging socket read");
                        SocketOperationCode::ReadError
                    }
                },
                Some(Err(e)) => {
                    error!(error = %e, "failed when reading from socket");
                    self.metrics.read_error();
                    SocketOperationCode::ReadError
                }
            };

            callback(code, None);
            return;
        }
    }

    fn extract(
        &mut self,
        callback: &mut PacketSink<'_>,
        allow_multiple: bool,
    ) -> ExtractOutcome {
        let mut extractor = self.buffer.prepare_packet_extractor();
        let mut num_extracted = 0usize;

        let outcome = loop {
            let (result, packet) = extractor.try_extract_next_packet();
            match result {
                PacketExtractResult::Success => {
                    num_extracted += 1;
                    self.metrics.packet_read();
                    callback(SocketOperationCode::Success, packet);
                    if !allow_multiple {
                        break ExtractOutcome::Completed;
                    }
                }
                PacketExtractResult::InsufficientData if num_extracted == 0 => {
                    break ExtractOutcome::NeedMoreData;
                }
                PacketExtractResult::InsufficientData => {
                    // signals the end of a multi-packet read
                    callback(SocketOperationCode::InsufficientData, None);
                    break ExtractOutcome::Completed;
                }
                PacketExtractResult::PacketError => {
                    error!(result = %result, "{}", constants::ERR_MALFORMED_PACKET);
                    self.metrics.malformed_packet();
                    callback(SocketOperationCode::MalformedData, None);
                    break ExtractOutcome::Completed;
                }
            }
        };

        if num_extracted > 0 {
            extractor.consume();
            self.metrics.compaction();
            self.publish_unprocessed();
        }

        outcome
    }

    /// Make the buffered byte count visible to `stats`
    fn publish_unprocessed(&self) {
        self.unprocessed_bytes
            .store(self.buffer.len(), Ordering::Release);
    }
}

struct SocketWriter<W> {
    transport: WriteHalf<W>,
    shutdown: CancellationToken,
    metrics: Arc<IoMetrics>,
}

impl<W: AsyncWrite> SocketWriter<W> {
    async fn run(mut self, mut requests: mpsc::UnboundedReceiver<WriteRequest>) {
        let shutdown = self.shutdown.clone();
        loop {
            let request = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                request = requests.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };

            let size = request.payload.size();
            let code = tokio::select! {
                biased;
                _ = shutdown.cancelled() => SocketOperationCode::Closed,
                code = self.write(&request.payload) => code,
            };

            if code.is_success() {
                self.metrics.packet_written(size);
            }

            (request.callback)(code);
        }

        requests.close();
        while let Ok(request) = requests.try_recv() {
            (request.callback)(SocketOperationCode::Closed);
        }

        if let Err(e) = self.transport.shutdown().await {
            debug!(error = %e, "failed shutting down socket write half");
        }
        trace!("socket writer stopped");
    }

    async fn write(&mut self, payload: &PacketPayload) -> SocketOperationCode {
        let header = payload.header().to_bytes();
        if let Err(e) = self.transport.write_all(&header).await {
            return self.write_failed(e);
        }

        for buffer in payload.buffers() {
            if let Err(e) = self.transport.write_all(buffer).await {
                return self.write_failed(e);
            }
        }

        match self.transport.flush().await {
            Ok(()) => SocketOperationCode::Success,
            Err(e) => self.write_failed(e),
        }
    }

    fn write_failed(&self, e: std::io::Error) -> SocketOperationCode {
        error!(error = %e, "failed when writing to socket");
        self.metrics.write_error();
        SocketOperationCode::WriteError
    }
}
