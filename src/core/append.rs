//! # Append Context
//!
//! Scoped reservation of tail space in a byte buffer.
//!
//! An [`AppendContext`] grows the buffer by a fixed amount and hands out the new
//! region so it can be filled, typically by a socket read. The reservation ends in
//! exactly one of two ways:
//!
//! - [`AppendContext::commit`] keeps the first `size` bytes of the region and drops
//!   the unused tail.
//! - Dropping the context uncommitted restores the buffer to its original size.
//!
//! Drop runs on every exit route (early return, `?`, panic unwind, and a cancelled
//! future that owns the context), so staged bytes never survive unconfirmed.
//!
//! ```rust
//! use bytes::BytesMut;
//! use packet_io::core::append::AppendContext;
//!
//! let mut buffer = BytesMut::new();
//! let mut context = AppendContext::new(&mut buffer, 16);
//! context.buffer()[..5].copy_from_slice(b"hello");
//! context.commit(5).unwrap();
//! assert_eq!(&buffer[..], b"hello");
//! ```

use bytes::BytesMut;
use tracing::trace;

use crate::error::{ProtocolError, Result};

/// Pending tail reservation on a byte buffer
#[derive(Debug)]
pub struct AppendContext<'a> {
    data: &'a mut BytesMut,
    append_size: usize,
    original_size: usize,
    is_committed: bool,
}

impl<'a> AppendContext<'a> {
    /// Reserve `append_size` zeroed bytes at the end of `data`.
    pub fn new(data: &'a mut BytesMut, append_size: usize) -> Self {
        let original_size = data.len();
        data.resize(original_size + append_size, 0);

        Self {
            data,
            append_size,
            original_size,
            is_committed: false,
        }
    }

    /// Writable view over exactly the reserved region
    pub fn buffer(&mut self) -> &mut [u8] {
        let start = self.original_size;
        &mut self.data[start..start + self.append_size]
    }

    /// Number of bytes reserved
    pub fn append_size(&self) -> usize {
        self.append_size
    }

    /// Buffer size before the reservation
    pub fn original_size(&self) -> usize {
        self.original_size
    }

    /// Keep the first `size` reserved bytes.
    ///
    /// Committing more than was reserved is a caller bug. The error is returned and
    /// the reservation is rolled back when the context drops.
    pub fn commit(mut self, size: usize) -> Result<()> {
        if size > self.append_size {
            return Err(ProtocolError::AppendOverflow {
                size,
                reserved: self.append_size,
            });
        }

        self.data.truncate(self.original_size + size);
        self.is_committed = true;
        Ok(())
    }
}

impl Drop for AppendContext<'_> {
    fn drop(&mut self) {
        if !self.is_committed {
            trace!(
                original_size = self.original_size,
                append_size = self.append_size,
                "rolling back uncommitted append"
            );
            self.data.truncate(self.original_size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_of(size: usize) -> BytesMut {
        BytesMut::from(&(0..size).map(|i| i as u8).collect::<Vec<_>>()[..])
    }

    #[test]
    fn test_reservation_grows_buffer() {
        let mut data = buffer_of(3);
        let mut context = AppendContext::new(&mut data, 16);

        assert_eq!(context.original_size(), 3);
        assert_eq!(context.append_size(), 16);
        assert_eq!(context.buffer().len(), 16);
        assert!(context.buffer().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_buffer_view_covers_only_reserved_region() {
        let mut data = buffer_of(3);
        {
            let mut context = AppendContext::new(&mut data, 4);
            context.buffer().copy_from_slice(&[9, 9, 9, 9]);
            context.commit(4).unwrap();
        }

        assert_eq!(&data[..], &[0, 1, 2, 9, 9, 9, 9]);
    }

    #[test]
    fn test_commit_keeps_prefix() {
        let mut data = BytesMut::new();
        {
            let mut context = AppendContext::new(&mut data, 16);
            context.buffer()[..5].copy_from_slice(&[1, 2, 3, 4, 5]);
            context.commit(5).unwrap();
        }

        assert_eq!(&data[..], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_commit_every_size_in_range() {
        for size in 0..=8 {
            let mut data = buffer_of(2);
            AppendContext::new(&mut data, 8).commit(size).unwrap();
            assert_eq!(data.len(), 2 + size);
        }
    }

    #[test]
    fn test_drop_without_commit_rolls_back() {
        let mut data = BytesMut::new();
        {
            let mut context = AppendContext::new(&mut data, 16);
            context.buffer().fill(0xFF);
        }

        assert_eq!(data.len(), 0);
    }

    #[test]
    fn test_over_commit_fails_and_rolls_back() {
        let mut data = buffer_of(5);
        let result = AppendContext::new(&mut data, 4).commit(5);

        assert!(matches!(
            result,
            Err(ProtocolError::AppendOverflow {
                size: 5,
                reserved: 4
            })
        ));
        assert_eq!(&data[..], &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_zero_size_reservation() {
        let mut data = buffer_of(5);
        {
            let mut context = AppendContext::new(&mut data, 0);
            assert!(context.buffer().is_empty());
        }
        assert_eq!(data.len(), 5);

        AppendContext::new(&mut data, 0).commit(0).unwrap();
        assert_eq!(data.len(), 5);
    }

    #[test]
    fn test_moved_context_rolls_back_once() {
        fn take(context: AppendContext<'_>) -> AppendContext<'_> {
            context
        }

        let mut data = buffer_of(2);
        {
            let context = AppendContext::new(&mut data, 6);
            let moved = take(context);
            moved.commit(3).unwrap();
        }
        assert_eq!(data.len(), 5);

        {
            let context = AppendContext::new(&mut data, 6);
            let _moved = take(context);
        }
        assert_eq!(data.len(), 5);
    }

    #[test]
    fn test_rollback_on_early_return() {
        fn stage(data: &mut BytesMut, fail: bool) -> Result<()> {
            let mut context = AppendContext::new(data, 8);
            context.buffer()[0] = 1;
            if fail {
                return Err(std::io::Error::from(std::io::ErrorKind::ConnectionReset).into());
            }
            context.commit(1)
        }

        let mut data = BytesMut::new();
        assert!(stage(&mut data, true).is_err());
        assert!(data.is_empty());

        stage(&mut data, false).unwrap();
        assert_eq!(&data[..], &[1]);
    }

    #[test]
    fn test_rollback_on_panic() {
        let mut data = buffer_of(4);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut context = AppendContext::new(&mut data, 8);
            context.buffer()[0] = 1;
            panic!("read failed");
        }));

        assert!(result.is_err());
        assert_eq!(data.len(), 4);
    }
}
