//! Fixed-width little-endian writer.

use std::io::{self, Write};

use byteorder::{LittleEndian as LE, WriteBytesExt as _};
use snafu::ResultExt as _;

use crate::error::{self, SnapshotError};

/// A writer of fixed-width little-endian values.
///
/// The first failure of the underlying sink is latched: every write after it is a no-op, and the original error is
/// returned, exactly once, by [`finish`][Self::finish]. This lets the snapshot codec issue its whole write sequence
/// without checking a result after each field.
pub struct PrimitiveWriter<W> {
    sink: W,
    bytes_written: usize,
    error: Option<io::Error>,
}

impl PrimitiveWriter<Vec<u8>> {
    /// Creates a new `PrimitiveWriter` backed by an in-memory buffer with the given initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(Vec::with_capacity(capacity))
    }
}

impl<W: Write> PrimitiveWriter<W> {
    /// Creates a new `PrimitiveWriter` wrapping the given sink.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            bytes_written: 0,
            error: None,
        }
    }

    /// Writes a 16-bit signed integer.
    pub fn write_i16(&mut self, value: i16) {
        self.apply(2, |sink| sink.write_i16::<LE>(value));
    }

    /// Writes a 32-bit signed integer.
    pub fn write_i32(&mut self, value: i32) {
        self.apply(4, |sink| sink.write_i32::<LE>(value));
    }

    /// Writes a 64-bit float, preserving its exact bit pattern.
    pub fn write_f64(&mut self, value: f64) {
        self.apply(8, |sink| sink.write_f64::<LE>(value));
    }

    /// Writes a raw byte sequence as-is.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.apply(bytes.len(), |sink| sink.write_all(bytes));
    }

    /// Returns the number of bytes accepted by the sink so far.
    ///
    /// Bytes from the write that failed, and from any write after it, are not counted.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Returns `true` if a write has failed.
    pub fn has_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Flushes the sink and returns it.
    ///
    /// # Errors
    ///
    /// If any write failed, the first failure is returned. Otherwise, if flushing the sink fails, that error is
    /// returned.
    pub fn finish(mut self) -> Result<W, SnapshotError> {
        if let Some(e) = self.error.take() {
            return Err(e).context(error::Write);
        }

        self.sink.flush().context(error::Write)?;
        Ok(self.sink)
    }

    fn apply<F>(&mut self, len: usize, write: F)
    where
        F: FnOnce(&mut W) -> io::Result<()>,
    {
        if self.error.is_some() {
            return;
        }

        match write(&mut self.sink) {
            Ok(()) => self.bytes_written += len,
            Err(e) => self.error = Some(e),
        }
    }
}
