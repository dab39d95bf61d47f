//! Observability and Metrics
//!
//! Counters for packet socket activity. Each socket updates a shared [`IoMetrics`]
//! with relaxed atomics; a [`MetricsSnapshot`] gives a consistent-enough view for
//! reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Metrics collector shared by packet sockets
#[derive(Debug)]
pub struct IoMetrics {
    /// Packets delivered to read callbacks
    pub packets_read: AtomicU64,
    /// Bytes committed into working buffers
    pub bytes_received: AtomicU64,
    /// Packets fully written to the transport
    pub packets_written: AtomicU64,
    /// Bytes written to the transport
    pub bytes_sent: AtomicU64,
    /// Packets rejected for an out-of-range size
    pub malformed_packets: AtomicU64,
    /// Transport read failures (excluding clean close)
    pub read_errors: AtomicU64,
    /// Transport write failures
    pub write_errors: AtomicU64,
    /// Working buffer compactions
    pub compactions: AtomicU64,
    /// Working buffer capacity reclamations
    pub reclamations: AtomicU64,
    start_time: Instant,
}

/// Point-in-time copy of [`IoMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub packets_read: u64,
    pub bytes_received: u64,
    pub packets_written: u64,
    pub bytes_sent: u64,
    pub malformed_packets: u64,
    pub read_errors: u64,
    pub write_errors: u64,
    pub compactions: u64,
    pub reclamations: u64,
}

impl IoMetrics {
    pub fn new() -> Self {
        Self {
            packets_read: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            packets_written: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            malformed_packets: AtomicU64::new(0),
            read_errors: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            compactions: AtomicU64::new(0),
            reclamations: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn packet_read(&self) {
        self.packets_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_committed(&self, byte_count: usize) {
        self.bytes_received
            .fetch_add(byte_count as u64, Ordering::Relaxed);
    }

    pub fn packet_written(&self, byte_count: usize) {
        self.packets_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count as u64, Ordering::Relaxed);
    }

    pub fn malformed_packet(&self) {
        self.malformed_packets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn compaction(&self) {
        self.compactions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reclamation(&self) {
        self.reclamations.fetch_add(1, Ordering::Relaxed);
    }

    /// Time since the collector was created
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_read: self.packets_read.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            packets_written: self.packets_written.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            malformed_packets: self.malformed_packets.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            compactions: self.compactions.load(Ordering::Relaxed),
            reclamations: self.reclamations.load(Ordering::Relaxed),
        }
    }

    /// Log a summary of all counters at info level
    pub fn log_summary(&self) {
        let s = self.snapshot();
        info!(
            uptime_secs = self.uptime_secs(),
            packets_read = s.packets_read,
            bytes_received = s.bytes_received,
            packets_written = s.packets_written,
            bytes_sent = s.bytes_sent,
            malformed_packets = s.malformed_packets,
            read_errors = s.read_errors,
            write_errors = s.write_errors,
            compactions = s.compactions,
            reclamations = s.reclamations,
            "packet io metrics"
        );
    }
}

impl Default for IoMetrics {
    fn default() -> Self {
        Self::new()
    }
}
