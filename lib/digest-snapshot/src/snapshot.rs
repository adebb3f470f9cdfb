/// A single cluster of a digest's compressed sketch.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Centroid {
    /// Representative value of the cluster.
    pub mean: f64,

    /// Number of observations folded into the cluster.
    ///
    /// This can be fractional once weighted observations or merges are involved.
    pub weight: f64,
}

impl Centroid {
    /// Creates a new `Centroid`.
    pub const fn new(mean: f64, weight: f64) -> Self {
        Self { mean, weight }
    }
}

/// A borrowed view of a digest's committed state.
///
/// This is what the encoder reads. Digest engines hand it out from [`SnapshotDigest::snapshot_view`] after committing,
/// which avoids copying the centroid and cumulative arrays just to write them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapshotView<'a> {
    /// Compression (scale) parameter.
    pub compression: f64,

    /// Capacity hint for the processed centroid buffer.
    pub max_processed: i32,

    /// Capacity hint for the unprocessed centroid buffer.
    pub max_unprocessed: i32,

    /// Total weight of the processed centroids.
    pub processed_weight: f64,

    /// Smallest value observed.
    pub min: f64,

    /// Largest value observed.
    pub max: f64,

    /// Prefix-sum table aligned with `processed`.
    pub cumulative: &'a [f64],

    /// Committed centroids, in the order the engine keeps them.
    pub processed: &'a [Centroid],
}

/// The persisted state of a digest.
///
/// This is plain data: decoding fills one in field by field, and only a fully decoded snapshot is handed to
/// [`SnapshotDigest::restore`]. The engine's transient buffer of not-yet-merged points is deliberately absent.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DigestSnapshot {
    /// Compression (scale) parameter.
    pub compression: f64,

    /// Capacity hint for the processed centroid buffer.
    pub max_processed: i32,

    /// Capacity hint for the unprocessed centroid buffer.
    pub max_unprocessed: i32,

    /// Total weight of the processed centroids.
    pub processed_weight: f64,

    /// Smallest value observed.
    pub min: f64,

    /// Largest value observed.
    pub max: f64,

    /// Prefix-sum table aligned with `processed`.
    ///
    /// The codec does not require this to have any particular length relative to `processed`. Keeping the two in
    /// sync is the engine's job.
    pub cumulative: Vec<f64>,

    /// Committed centroids, in their original order.
    pub processed: Vec<Centroid>,
}

impl DigestSnapshot {
    /// Returns a borrowed view of this snapshot.
    pub fn as_view(&self) -> SnapshotView<'_> {
        SnapshotView {
            compression: self.compression,
            max_processed: self.max_processed,
            max_unprocessed: self.max_unprocessed,
            processed_weight: self.processed_weight,
            min: self.min,
            max: self.max,
            cumulative: &self.cumulative,
            processed: &self.processed,
        }
    }

    /// Returns `true` if every field of `self` and `other` has the same bit pattern.
    ///
    /// Unlike `==`, this treats two NaNs with the same payload as equal, and `0.0` and `-0.0` as different.
    pub fn bitwise_eq(&self, other: &Self) -> bool {
        fn same(a: f64, b: f64) -> bool {
            a.to_bits() == b.to_bits()
        }

        same(self.compression, other.compression)
            && self.max_processed == other.max_processed
            && self.max_unprocessed == other.max_unprocessed
            && same(self.processed_weight, other.processed_weight)
            && same(self.min, other.min)
            && same(self.max, other.max)
            && self.cumulative.len() == other.cumulative.len()
            && self.cumulative.iter().zip(&other.cumulative).all(|(a, b)| same(*a, *b))
            && self.processed.len() == other.processed.len()
            && self
                .processed
                .iter()
                .zip(&other.processed)
                .all(|(a, b)| same(a.mean, b.mean) && same(a.weight, b.weight))
    }
}

impl From<SnapshotView<'_>> for DigestSnapshot {
    fn from(view: SnapshotView<'_>) -> Self {
        Self {
            compression: view.compression,
            max_processed: view.max_processed,
            max_unprocessed: view.max_unprocessed,
            processed_weight: view.processed_weight,
            min: view.min,
            max: view.max,
            cumulative: view.cumulative.to_vec(),
            processed: view.processed.to_vec(),
        }
    }
}

/// A digest engine whose committed state can be snapshotted and restored.
///
/// Callers must hold exclusive access to the digest for the duration of an encode or decode. Nothing here is
/// synchronized.
pub trait SnapshotDigest {
    /// Folds any buffered, not-yet-merged observations into the committed state.
    ///
    /// This must be idempotent: committing an already committed digest changes nothing.
    fn commit(&mut self);

    /// Returns a view of the committed state.
    ///
    /// Buffered observations that have not been committed are not part of the view.
    fn snapshot_view(&self) -> SnapshotView<'_>;

    /// Replaces the committed state with the given snapshot.
    ///
    /// Implementations must reset their buffer of unmerged observations to empty, sized by the capacity hint
    /// `max_unprocessed + 1`.
    fn restore(&mut self, snapshot: DigestSnapshot);
}

/// Limits applied when decoding snapshots from a stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DecodeLimits {
    /// Maximum number of bytes read from the stream.
    pub max_snapshot_size: u64,
}

impl DecodeLimits {
    /// Default maximum snapshot size: 64 MiB.
    pub const DEFAULT_MAX_SNAPSHOT_SIZE: u64 = 64 * 1024 * 1024;

    /// Creates a new `DecodeLimits` with the given maximum snapshot size, in bytes.
    pub const fn with_max_snapshot_size(max_snapshot_size: u64) -> Self {
        Self { max_snapshot_size }
    }
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self::with_max_snapshot_size(Self::DEFAULT_MAX_SNAPSHOT_SIZE)
    }
}
