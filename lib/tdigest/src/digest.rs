use ordered_float::OrderedFloat;
use tracing::debug;

use crate::scale::{integrated_location, integrated_q, weighted_average};
use crate::Centroid;

const DEFAULT_COMPRESSION: f64 = 100.0;
const MIN_COMPRESSION: f64 = 1.0;
const MAX_COMPRESSION: f64 = 100_000.0;

// Largest buffer capacity a digest keeps. Capacities are persisted as `i32`.
pub(crate) const MAX_CAPACITY: usize = i32::MAX as usize;

// Upper bound on how many centroids a digest preallocates for a buffer. Past it, buffers grow on demand.
pub(crate) const MAX_PREALLOCATED_CENTROIDS: usize = 1 << 16;

/// A merging [t-digest][tdigest].
///
/// New observations land in an unprocessed buffer. Once either buffer outgrows its capacity, or whenever
/// [`commit`][Self::commit] is called, the buffered observations are sorted together with the existing centroids and
/// merged into a new list of processed centroids, such that no centroid spans more than one unit of the arcsine scale
/// function. A cumulative weight table is rebuilt alongside the processed centroids so that quantile queries can
/// binary search it.
///
/// The exact minimum and maximum observations are tracked separately from the centroids, as centroid means alone
/// would lose them.
///
/// [tdigest]: https://arxiv.org/abs/1902.04023
#[derive(Clone, Debug)]
pub struct TDigest {
    pub(crate) compression: f64,
    pub(crate) max_processed: usize,
    pub(crate) max_unprocessed: usize,
    pub(crate) processed: Vec<Centroid>,
    pub(crate) unprocessed: Vec<Centroid>,
    pub(crate) cumulative: Vec<f64>,
    pub(crate) processed_weight: f64,
    pub(crate) unprocessed_weight: f64,
    pub(crate) min: f64,
    pub(crate) max: f64,
}

impl TDigest {
    /// Creates a new `TDigest` with the default compression of 100.
    pub fn new() -> Self {
        Self::with_compression(DEFAULT_COMPRESSION)
    }

    /// Creates a new `TDigest` with the given compression.
    ///
    /// Buffer capacities are derived from the compression: `2 * ceil(compression)` processed centroids and
    /// `8 * ceil(compression)` unprocessed centroids. Compression is clamped to `[1, 100000]`, and a NaN compression
    /// falls back to the default.
    pub fn with_compression(compression: f64) -> Self {
        Self::with_sizes(compression, 0, 0)
    }

    /// Creates a new `TDigest` with the given compression and buffer capacities.
    ///
    /// A capacity of zero is derived from the compression, as in [`with_compression`][Self::with_compression].
    /// Capacities are capped at `i32::MAX`, the largest capacity a snapshot can hold.
    pub fn with_sizes(compression: f64, max_processed: usize, max_unprocessed: usize) -> Self {
        let compression = sanitize_compression(compression);

        // SAFETY: Compression is clamped above, so these products are small, positive, and whole.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let derived = |factor: f64| (factor * compression.ceil()) as usize;

        let max_processed = if max_processed == 0 { derived(2.0) } else { max_processed };
        let max_unprocessed = if max_unprocessed == 0 {
            derived(8.0)
        } else {
            max_unprocessed
        };
        let max_processed = max_processed.min(MAX_CAPACITY);
        let max_unprocessed = max_unprocessed.min(MAX_CAPACITY);

        Self {
            compression,
            max_processed,
            max_unprocessed,
            processed: Vec::with_capacity(preallocated(max_processed)),
            unprocessed: Vec::with_capacity(preallocated(max_unprocessed + 1)),
            cumulative: Vec::with_capacity(preallocated(max_processed + 1)),
            processed_weight: 0.0,
            unprocessed_weight: 0.0,
            min: f64::MAX,
            max: -f64::MAX,
        }
    }

    /// Returns the compression parameter.
    pub fn compression(&self) -> f64 {
        self.compression
    }

    /// Returns the total weight of all observations, committed or not.
    pub fn count(&self) -> f64 {
        self.processed_weight + self.unprocessed_weight
    }

    /// Whether or not this digest is empty.
    pub fn is_empty(&self) -> bool {
        self.processed.is_empty() && self.unprocessed.is_empty()
    }

    /// Minimum value seen by this digest.
    ///
    /// Returns `None` if the digest is empty.
    pub fn min(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.min)
        }
    }

    /// Maximum value seen by this digest.
    ///
    /// Returns `None` if the digest is empty.
    pub fn max(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.max)
        }
    }

    /// Returns the committed centroids, sorted by mean.
    ///
    /// Observations that have not been committed yet are not included.
    pub fn centroids(&self) -> &[Centroid] {
        &self.processed
    }

    /// Clears the digest, removing all observations. Compression and buffer capacities are kept.
    pub fn reset(&mut self) {
        self.processed.clear();
        self.unprocessed.clear();
        self.cumulative.clear();
        self.processed_weight = 0.0;
        self.unprocessed_weight = 0.0;
        self.min = f64::MAX;
        self.max = -f64::MAX;
    }

    /// Adds a single observation.
    pub fn add(&mut self, value: f64) {
        self.add_centroid(Centroid::new(value, 1.0));
    }

    /// Adds a single observation with the given weight.
    pub fn add_weighted(&mut self, value: f64, weight: f64) {
        self.add_centroid(Centroid::new(value, weight));
    }

    /// Adds a centroid, as if all of its weight had been observed at its mean.
    ///
    /// Centroids with a non-finite mean, or a weight that is not finite and positive, are ignored.
    pub fn add_centroid(&mut self, centroid: Centroid) {
        if !centroid.mean.is_finite() || !centroid.weight.is_finite() || centroid.weight <= 0.0 {
            return;
        }

        self.min = self.min.min(centroid.mean);
        self.max = self.max.max(centroid.mean);
        self.unprocessed.push(centroid);
        self.unprocessed_weight += centroid.weight;

        if self.processed.len() > self.max_processed || self.unprocessed.len() > self.max_unprocessed {
            self.commit();
        }
    }

    /// Merges all observations from another digest into this one.
    pub fn merge(&mut self, other: &TDigest) {
        for centroid in other.processed.iter().chain(&other.unprocessed) {
            self.add_centroid(*centroid);
        }

        // Centroid means lose the other digest's exact extremes, so carry them over directly.
        if !other.is_empty() {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
    }

    /// Merges buffered observations into the processed centroids.
    ///
    /// This is idempotent. If nothing is buffered and the processed centroids are within capacity, the pass is skipped.
    /// Otherwise, already merged centroids are merged again, which reproduces them exactly.
    pub fn commit(&mut self) {
        if self.unprocessed.is_empty() && self.processed.len() <= self.max_processed {
            return;
        }

        let mut merged = std::mem::take(&mut self.unprocessed);
        merged.extend_from_slice(&self.processed);
        merged.sort_by_key(|centroid| OrderedFloat(centroid.mean));

        self.processed.clear();
        self.processed_weight += self.unprocessed_weight;
        self.unprocessed_weight = 0.0;

        if let Some((first, rest)) = merged.split_first() {
            self.processed.push(*first);

            let mut so_far = first.weight;
            let mut limit = self.processed_weight * integrated_q(self.compression, 1.0);
            for centroid in rest {
                let projected = so_far + centroid.weight;
                if projected <= limit {
                    so_far = projected;
                    if let Some(last) = self.processed.last_mut() {
                        absorb(last, *centroid);
                    }
                } else {
                    let k = integrated_location(self.compression, so_far / self.processed_weight);
                    limit = self.processed_weight * integrated_q(self.compression, k + 1.0);
                    so_far = projected;
                    self.processed.push(*centroid);
                }
            }
        }

        self.update_cumulative();

        merged.clear();
        self.unprocessed = merged;
    }

    /// Estimates the value at the given quantile.
    ///
    /// Buffered observations are committed first. Returns NaN if the digest is empty or `q` is outside of `[0, 1]`.
    pub fn quantile(&mut self, q: f64) -> f64 {
        self.commit();

        if !(0.0..=1.0).contains(&q) {
            return f64::NAN;
        }

        let (first, last) = match (self.processed.first(), self.processed.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return f64::NAN,
        };

        if self.processed.len() == 1 {
            return first.mean;
        }

        // Left tail: the lower half of the first centroid, interpolated from the exact minimum.
        let index = q * self.processed_weight;
        if index <= first.weight / 2.0 {
            return self.min + 2.0 * index / first.weight * (first.mean - self.min);
        }

        let upper = self.cumulative.partition_point(|cumulative| *cumulative < index);
        if upper < self.processed.len() {
            let lower = match upper.checked_sub(1) {
                Some(lower) => lower,
                None => return f64::NAN,
            };

            return match (
                self.processed.get(lower),
                self.processed.get(upper),
                self.cumulative.get(lower),
                self.cumulative.get(upper),
            ) {
                (Some(left), Some(right), Some(left_cumulative), Some(right_cumulative)) => weighted_average(
                    left.mean,
                    right_cumulative - index,
                    right.mean,
                    index - left_cumulative,
                ),
                _ => f64::NAN,
            };
        }

        // Right tail: the upper half of the last centroid, interpolated towards the exact maximum.
        let start = self.processed_weight - last.weight / 2.0;
        weighted_average(last.mean, self.processed_weight - index, self.max, index - start)
    }

    /// Estimates the fraction of observations less than or equal to the given value.
    ///
    /// Buffered observations are committed first. Returns NaN if the digest is empty.
    pub fn cdf(&mut self, value: f64) -> f64 {
        self.commit();

        let (first, last) = match (self.processed.first(), self.processed.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return f64::NAN,
        };

        if value <= self.min {
            return 0.0;
        }
        if value >= self.max {
            return 1.0;
        }

        if self.processed.len() == 1 {
            return (value - self.min) / (self.max - self.min);
        }

        // Left tail.
        if value <= first.mean {
            if first.mean - self.min > 0.0 {
                return (value - self.min) / (first.mean - self.min) * first.weight / self.processed_weight / 2.0;
            }
            return 0.0;
        }

        // Right tail.
        if value >= last.mean {
            if self.max - last.mean > 0.0 {
                return 1.0 - (self.max - value) / (self.max - last.mean) * last.weight / self.processed_weight / 2.0;
            }
            return 1.0;
        }

        let upper = self.processed.partition_point(|centroid| centroid.mean <= value);
        let lower = match upper.checked_sub(1) {
            Some(lower) => lower,
            None => return f64::NAN,
        };

        match (
            self.processed.get(lower),
            self.processed.get(upper),
            self.cumulative.get(lower),
            self.cumulative.get(upper),
        ) {
            (Some(left), Some(right), Some(left_cumulative), Some(right_cumulative)) => {
                weighted_average(
                    *left_cumulative,
                    right.mean - value,
                    *right_cumulative,
                    value - left.mean,
                ) / self.processed_weight
            }
            _ => f64::NAN,
        }
    }

    fn update_cumulative(&mut self) {
        self.cumulative.clear();
        self.cumulative.reserve(self.processed.len() + 1);

        let mut prev = 0.0;
        for centroid in &self.processed {
            self.cumulative.push(prev + centroid.weight / 2.0);
            prev += centroid.weight;
        }
        self.cumulative.push(prev);
    }
}

impl Default for TDigest {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps a compression to one the engine can work with.
///
/// NaN falls back to the default, and everything else is clamped to `[1, 100000]`.
pub(crate) fn sanitize_compression(compression: f64) -> f64 {
    let sanitized = if compression.is_nan() {
        DEFAULT_COMPRESSION
    } else {
        compression.clamp(MIN_COMPRESSION, MAX_COMPRESSION)
    };

    if sanitized.to_bits() != compression.to_bits() {
        debug!(compression, sanitized, "Adjusted out-of-range compression.");
    }
    sanitized
}

pub(crate) fn preallocated(capacity: usize) -> usize {
    capacity.min(MAX_PREALLOCATED_CENTROIDS)
}

fn absorb(into: &mut Centroid, other: Centroid) {
    if into.weight != 0.0 {
        into.weight += other.weight;
        into.mean += other.weight * (other.mean - into.mean) / into.weight;
    } else {
        *into = other;
    }
}
