//! Fixed-width little-endian reader.

use byteorder::{ByteOrder, LittleEndian as LE};

use crate::error::{self, SnapshotError};

#[derive(Clone, Copy, Debug)]
enum Fault {
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    InvalidCount {
        field: &'static str,
        count: i32,
    },
}

impl Fault {
    fn to_error(self) -> SnapshotError {
        match self {
            Self::Truncated {
                offset,
                needed,
                remaining,
            } => error::Truncated {
                offset,
                needed,
                remaining,
            }
            .build(),
            Self::InvalidCount { field, count } => error::InvalidCount { field, count }.build(),
        }
    }
}

/// A reader of fixed-width little-endian values.
///
/// Each read consumes exactly the width requested. If the input runs out partway through a read, the reader latches a
/// truncation error, and every read after it is a no-op returning a zero value. Callers check for the latched error
/// once, at whatever point they need to stop, via [`check`][Self::check] or [`finish`][Self::finish].
///
/// Running out of input exactly at a call boundary is not itself an error: [`is_at_end`][Self::is_at_end] reports it,
/// and only a read attempted past that point fails.
pub struct PrimitiveReader<'a> {
    input: &'a [u8],
    offset: usize,
    fault: Option<Fault>,
}

impl<'a> PrimitiveReader<'a> {
    /// Creates a new `PrimitiveReader` over the given input.
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            offset: 0,
            fault: None,
        }
    }

    /// Returns the number of bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    /// Returns `true` if every byte of the input has been consumed.
    pub fn is_at_end(&self) -> bool {
        self.input.is_empty()
    }

    /// Returns `true` if a read has failed.
    pub fn has_failed(&self) -> bool {
        self.fault.is_some()
    }

    /// Reads a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0; N];
        if let Some(bytes) = self.take(N) {
            out.copy_from_slice(bytes);
        }
        out
    }

    /// Reads a 16-bit signed integer.
    pub fn read_i16(&mut self) -> i16 {
        self.take(2).map(LE::read_i16).unwrap_or_default()
    }

    /// Reads a 32-bit signed integer.
    pub fn read_i32(&mut self) -> i32 {
        self.take(4).map(LE::read_i32).unwrap_or_default()
    }

    /// Reads a 64-bit float, preserving its exact bit pattern.
    pub fn read_f64(&mut self) -> f64 {
        self.take(8).map(LE::read_f64).unwrap_or_default()
    }

    /// Reads an array count prefix.
    ///
    /// The count is untrusted: a negative count latches an invalid count error, and a count whose elements could not
    /// possibly fit in the remaining input (`count * element_len` bytes) latches a truncation error. Either way, zero
    /// is returned, so callers never size an allocation from a count that the input cannot back.
    pub fn read_count(&mut self, field: &'static str, element_len: usize) -> usize {
        let raw = self.read_i32();
        if self.fault.is_some() {
            return 0;
        }

        let count = match usize::try_from(raw) {
            Ok(count) => count,
            Err(_) => {
                self.fault = Some(Fault::InvalidCount { field, count: raw });
                return 0;
            }
        };

        let needed = count.saturating_mul(element_len);
        if needed > self.input.len() {
            self.fault = Some(Fault::Truncated {
                offset: self.offset,
                needed,
                remaining: self.input.len(),
            });
            return 0;
        }

        count
    }

    /// Reads `count` 64-bit floats, in order.
    ///
    /// The vector is only preallocated for as many values as the remaining input can hold.
    pub fn read_f64_array(&mut self, count: usize) -> Vec<f64> {
        let mut values = Vec::with_capacity(count.min(self.input.len() / 8));
        for _ in 0..count {
            if self.fault.is_some() {
                break;
            }
            values.push(self.read_f64());
        }
        values
    }

    /// Returns the latched error, if any.
    ///
    /// The error stays latched: reads after a failed check remain no-ops, and checking again returns the same error.
    ///
    /// # Errors
    ///
    /// If any read has failed, the first failure is returned.
    pub fn check(&self) -> Result<(), SnapshotError> {
        match self.fault {
            Some(fault) => Err(fault.to_error()),
            None => Ok(()),
        }
    }

    /// Consumes the reader, returning the number of bytes read.
    ///
    /// # Errors
    ///
    /// If any read has failed, the first failure is returned.
    pub fn finish(self) -> Result<usize, SnapshotError> {
        self.check()?;
        Ok(self.offset)
    }

    fn take(&mut self, needed: usize) -> Option<&'a [u8]> {
        if self.fault.is_some() {
            return None;
        }

        if self.input.len() < needed {
            self.fault = Some(Fault::Truncated {
                offset: self.offset,
                needed,
                remaining: self.input.len(),
            });
            return None;
        }

        let (head, tail) = self.input.split_at(needed);
        self.input = tail;
        self.offset += needed;
        Some(head)
    }
}
