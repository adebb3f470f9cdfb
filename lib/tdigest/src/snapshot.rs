use digest_snapshot::{DigestSnapshot, SnapshotDigest, SnapshotError, SnapshotView};
use tracing::debug;

use crate::digest::{preallocated, sanitize_compression, MAX_PREALLOCATED_CENTROIDS};
use crate::TDigest;

impl SnapshotDigest for TDigest {
    fn commit(&mut self) {
        TDigest::commit(self);
    }

    fn snapshot_view(&self) -> SnapshotView<'_> {
        SnapshotView {
            compression: self.compression,
            max_processed: i32::try_from(self.max_processed).unwrap_or(i32::MAX),
            max_unprocessed: i32::try_from(self.max_unprocessed).unwrap_or(i32::MAX),
            processed_weight: self.processed_weight,
            min: self.min,
            max: self.max,
            cumulative: &self.cumulative,
            processed: &self.processed,
        }
    }

    fn restore(&mut self, snapshot: DigestSnapshot) {
        // The snapshot itself is decoded verbatim, but the engine only runs with a usable compression.
        self.compression = sanitize_compression(snapshot.compression);
        self.max_processed = usize::try_from(snapshot.max_processed).unwrap_or_default();
        self.max_unprocessed = usize::try_from(snapshot.max_unprocessed).unwrap_or_default();
        self.processed_weight = snapshot.processed_weight;
        self.unprocessed_weight = 0.0;
        self.min = snapshot.min;
        self.max = snapshot.max;
        self.cumulative = snapshot.cumulative;
        self.processed = snapshot.processed;

        let capacity = self.max_unprocessed.saturating_add(1);
        if capacity > MAX_PREALLOCATED_CENTROIDS {
            debug!(
                capacity_hint = capacity,
                capacity = MAX_PREALLOCATED_CENTROIDS,
                "Clamped unprocessed buffer capacity hint from snapshot."
            );
        }
        self.unprocessed = Vec::with_capacity(preallocated(capacity));
    }
}

impl TDigest {
    /// Commits any buffered observations and encodes the digest as a snapshot.
    ///
    /// # Errors
    ///
    /// If the digest cannot be represented as a snapshot, an error is returned.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, SnapshotError> {
        digest_snapshot::encode(self)
    }

    /// Decodes a digest from a snapshot.
    ///
    /// Empty input decodes to a new, empty digest with the default compression.
    ///
    /// # Errors
    ///
    /// If the snapshot cannot be decoded, an error is returned.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let mut digest = Self::new();
        digest.restore_from(bytes)?;
        Ok(digest)
    }

    /// Replaces the state of this digest with the state decoded from a snapshot.
    ///
    /// Empty input leaves the digest unchanged, as does any decoding failure. Observations buffered in this digest are
    /// discarded when a snapshot is adopted.
    ///
    /// # Errors
    ///
    /// If the snapshot cannot be decoded, an error is returned.
    pub fn restore_from(&mut self, bytes: &[u8]) -> Result<(), SnapshotError> {
        digest_snapshot::decode_into(bytes, self)
    }
}
