//! Per-connection working buffer.
//!
//! Owns the byte buffer a packet socket stages reads into and extracts packets
//! from. Reads are staged through [`AppendContext`]s of `working_buffer_size`
//! bytes; packets are sliced off by a [`PacketExtractor`] bounded by
//! `max_packet_data_size`.
//!
//! A burst of large packets can leave the buffer holding far more capacity than a
//! steady stream needs. When the spare capacity stays above twice the working size
//! for `working_buffer_sensitivity` consecutive reclaim checks, the storage is
//! reallocated down to what is actually needed. A sensitivity of 0 disables this.

use bytes::BytesMut;
use tracing::debug;

use crate::config::PacketSocketOptions;
use crate::core::append::AppendContext;
use crate::core::extractor::PacketExtractor;

#[derive(Debug)]
pub struct WorkingBuffer {
    data: BytesMut,
    options: PacketSocketOptions,
    oversized_checks: usize,
}

impl WorkingBuffer {
    pub fn new(options: PacketSocketOptions) -> Self {
        Self {
            data: BytesMut::with_capacity(options.working_buffer_size),
            options,
            oversized_checks: 0,
        }
    }

    /// Number of buffered, unprocessed bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn options(&self) -> &PacketSocketOptions {
        &self.options
    }

    /// Reserve `working_buffer_size` bytes for the next read
    pub fn prepare_append(&mut self) -> AppendContext<'_> {
        AppendContext::new(&mut self.data, self.options.working_buffer_size)
    }

    /// Extractor over the buffered bytes
    pub fn prepare_packet_extractor(&mut self) -> PacketExtractor<'_> {
        PacketExtractor::new(&mut self.data, self.options.max_packet_data_size)
    }

    /// Shrink oversized storage once it has stayed oversized long enough.
    ///
    /// Returns `true` if the storage was reallocated.
    pub fn try_reclaim(&mut self) -> bool {
        if self.options.working_buffer_sensitivity == 0 {
            return false;
        }

        let spare = self.data.capacity() - self.data.len();
        if spare <= self.options.working_buffer_size.saturating_mul(2) {
            self.oversized_checks = 0;
            return false;
        }

        self.oversized_checks += 1;
        if self.oversized_checks < self.options.working_buffer_sensitivity {
            return false;
        }

        let old_capacity = self.data.capacity();
        let mut data = BytesMut::with_capacity(self.data.len() + self.options.working_buffer_size);
        data.extend_from_slice(&self.data);
        self.data = data;
        self.oversized_checks = 0;

        debug!(
            old_capacity,
            new_capacity = self.data.capacity(),
            "reclaimed working buffer memory"
        );
        true
    }
}
