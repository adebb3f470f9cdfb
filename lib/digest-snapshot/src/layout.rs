//! Field order, widths, and version tags of the snapshot format.
//!
//! Everything in this module is frozen: changing any of these values changes the meaning of bytes already written to
//! disk or sent over the wire. Adding a new format generation means adding a new [`FormatVersion`] variant, not
//! editing an existing one.

/// Magic tag at the start of every snapshot.
pub const MAGIC: [u8; 8] = *b"tdigest!";

/// Version tag written by the current encoder.
pub const CURRENT_VERSION: i16 = 1;

/// Width of the magic tag.
pub const MAGIC_LEN: usize = MAGIC.len();

/// Width of the version tag.
pub const VERSION_LEN: usize = 2;

/// Width of the full header: magic tag and version tag.
pub const HEADER_LEN: usize = MAGIC_LEN + VERSION_LEN;

/// Width of the scalar block.
///
/// In order: compression (`f64`), max processed (`i32`), max unprocessed (`i32`), processed weight (`f64`), min
/// (`f64`), and max (`f64`).
pub const SCALARS_LEN: usize = 8 + 4 + 4 + 8 + 8 + 8;

/// Width of an array count prefix.
pub const COUNT_LEN: usize = 4;

/// Width of a single cumulative table entry.
pub const CUMULATIVE_ENTRY_LEN: usize = 8;

/// Width of a single centroid: mean and weight.
pub const CENTROID_LEN: usize = 16;

/// Smallest possible snapshot: header, scalars, and two zero count prefixes.
pub const MIN_ENCODED_LEN: usize = HEADER_LEN + SCALARS_LEN + 2 * COUNT_LEN;

/// Returns the exact encoded size of a snapshot with the given array lengths.
pub const fn encoded_len(cumulative_len: usize, processed_len: usize) -> usize {
    MIN_ENCODED_LEN + cumulative_len * CUMULATIVE_ENTRY_LEN + processed_len * CENTROID_LEN
}

/// A snapshot format generation.
///
/// This is the single dispatch point for version tags: the header codec maps the tag read from the wire to a variant
/// here, and the body codec matches on the variant to pick a field layout.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FormatVersion {
    /// The original layout: header, scalars, cumulative table, processed centroids.
    V1,
}

impl FormatVersion {
    /// The version written by the current encoder.
    pub const CURRENT: FormatVersion = FormatVersion::V1;

    /// Maps a version tag to a supported format version.
    ///
    /// Returns `None` if the tag is not a version this crate knows how to decode.
    pub const fn from_tag(tag: i16) -> Option<Self> {
        match tag {
            1 => Some(Self::V1),
            _ => None,
        }
    }

    /// Returns the version tag written on the wire.
    pub const fn tag(self) -> i16 {
        match self {
            Self::V1 => CURRENT_VERSION,
        }
    }
}
