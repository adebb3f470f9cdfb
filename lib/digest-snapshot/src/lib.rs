//! Versioned binary snapshots of streaming quantile digests.
//!
//! This crate persists and restores the committed state of a quantile digest (a t-digest, in practice) so that it can
//! survive process boundaries: files, network transfers, caches, and so on. It does not compute any statistics
//! itself. The digest engine is consumed through the [`SnapshotDigest`] trait, which exposes a commit operation, a
//! borrowed view of the committed state, and a way to adopt a decoded snapshot.
//!
//! # Format
//!
//! All values are fixed-width and little-endian:
//!
//! | field | type |
//! |---|---|
//! | magic | 8 raw bytes (`tdigest!`) |
//! | version | `i16` |
//! | compression | `f64` |
//! | max processed | `i32` |
//! | max unprocessed | `i32` |
//! | processed weight | `f64` |
//! | min | `f64` |
//! | max | `f64` |
//! | cumulative count (N) | `i32` |
//! | cumulative | `f64` x N |
//! | processed count (M) | `i32` |
//! | processed | (`f64` mean, `f64` weight) x M |
//!
//! # Quick Start
//!
//! ```
//! use digest_snapshot::{decode, encode_view, Centroid, SnapshotView};
//!
//! let processed = [Centroid::new(1.0, 2.0), Centroid::new(3.0, 1.0)];
//! let cumulative = [1.0, 2.5, 3.0];
//! let view = SnapshotView {
//!     compression: 100.0,
//!     max_processed: 200,
//!     max_unprocessed: 800,
//!     processed_weight: 3.0,
//!     min: 1.0,
//!     max: 3.0,
//!     cumulative: &cumulative,
//!     processed: &processed,
//! };
//!
//! let encoded = encode_view(&view, Vec::new()).unwrap();
//! let decoded = decode(&encoded).unwrap().expect("input is not empty");
//! assert_eq!(decoded.processed, processed);
//! ```
#![deny(warnings)]
#![deny(missing_docs)]

mod codec;
pub use self::codec::{decode, decode_from_reader, decode_into, encode, encode_to, encode_view};

mod error;
pub use self::error::{SnapshotError, SnapshotErrorKind};

pub mod header;

pub mod layout;
pub use self::layout::FormatVersion;

pub mod reader;
pub use self::reader::PrimitiveReader;

mod snapshot;
pub use self::snapshot::{Centroid, DecodeLimits, DigestSnapshot, SnapshotDigest, SnapshotView};

pub mod writer;
pub use self::writer::PrimitiveWriter;
