use std::io;

use snafu::Snafu;

/// Snapshot encoding or decoding error.
///
/// Every codec operation surfaces the first error it encounters and stops. Nothing is retried internally.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum SnapshotError {
    /// The input does not start with the snapshot magic tag.
    ///
    /// The input is not a snapshot at all: it was produced by something else, or its leading bytes are corrupted.
    #[snafu(display("invalid snapshot header {:?}", String::from_utf8_lossy(magic)))]
    Format {
        /// The bytes found where the magic tag was expected.
        magic: [u8; 8],
    },

    /// The magic tag matched, but the version tag is not one this crate can decode.
    ///
    /// There is no translation between format generations: a snapshot written by an incompatible encoder is rejected
    /// rather than decoded on a best-effort basis.
    #[snafu(display("unsupported snapshot version {}", version))]
    Version {
        /// The version tag found in the input.
        version: i16,
    },

    /// The input ended before a fixed-width field or a declared-length array could be fully read.
    #[snafu(display(
        "truncated snapshot at offset {} (needed {} bytes, but only {} bytes remaining)",
        offset,
        needed,
        remaining
    ))]
    Truncated {
        /// Offset of the read that could not be satisfied.
        offset: usize,

        /// Number of bytes the read required.
        needed: usize,

        /// Number of bytes left in the input.
        remaining: usize,
    },

    /// An array count prefix was negative.
    #[snafu(display("invalid count {} for {}", count, field))]
    InvalidCount {
        /// The array whose count prefix was invalid.
        field: &'static str,

        /// The count read from the input.
        count: i32,
    },

    /// A buffer capacity hint was negative.
    #[snafu(display("invalid capacity hint {} for {}", value, field))]
    InvalidCapacityHint {
        /// The capacity hint that was invalid.
        field: &'static str,

        /// The value read from the input.
        value: i32,
    },

    /// A streamed snapshot exceeded the configured maximum size.
    #[snafu(display("snapshot exceeds maximum size of {} bytes", limit))]
    TooLarge {
        /// The configured maximum snapshot size, in bytes.
        limit: u64,
    },

    /// The output sink failed while encoding.
    #[snafu(display("failed to write snapshot: {}", source))]
    Write {
        /// Error source.
        source: io::Error,
    },

    /// The input stream failed while reading a snapshot.
    #[snafu(display("failed to read snapshot: {}", source))]
    Read {
        /// Error source.
        source: io::Error,
    },
}

impl SnapshotError {
    /// Returns the broad category of this error.
    pub fn kind(&self) -> SnapshotErrorKind {
        match self {
            Self::Format { .. } => SnapshotErrorKind::Format,
            Self::Version { .. } => SnapshotErrorKind::Version,
            Self::Truncated { .. } => SnapshotErrorKind::Truncated,
            Self::InvalidCount { .. } | Self::InvalidCapacityHint { .. } | Self::TooLarge { .. } => {
                SnapshotErrorKind::Invalid
            }
            Self::Write { .. } => SnapshotErrorKind::Write,
            Self::Read { .. } => SnapshotErrorKind::Read,
        }
    }
}

/// Broad category of a [`SnapshotError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SnapshotErrorKind {
    /// Magic tag mismatch.
    Format,

    /// Unsupported version tag.
    Version,

    /// Input ended early.
    Truncated,

    /// Input was well-framed but carried an invalid value, or was too large to accept.
    Invalid,

    /// Output sink failure.
    Write,

    /// Input stream failure.
    Read,
}
