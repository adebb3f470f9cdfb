//! A merging t-digest whose committed state can be snapshotted with `digest-snapshot`.
//!
//! Observations are buffered and periodically merged into a compact, sorted list of centroids under the arcsine scale
//! function. The number of centroids kept is governed by the compression parameter: higher compression keeps more
//! centroids and gives more accurate quantiles.
//!
//! # Quick Start
//!
//! ```
//! use tdigest::TDigest;
//!
//! let mut digest = TDigest::with_compression(100.0);
//! for i in 0..1000 {
//!     digest.add(f64::from(i));
//! }
//!
//! let bytes = digest.to_bytes().unwrap();
//! let mut restored = TDigest::from_bytes(&bytes).unwrap();
//!
//! assert_eq!(restored.quantile(0.5), digest.quantile(0.5));
//! ```
#![deny(warnings)]
#![deny(missing_docs)]

pub use digest_snapshot::Centroid;

mod digest;
pub use self::digest::TDigest;

mod scale;

mod snapshot;
