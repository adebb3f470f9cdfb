use std::io::{self, Read, Write};

use snafu::{ensure, ResultExt as _};
use tracing::{debug, trace};

use crate::error::{self, SnapshotError};
use crate::header::{read_header, write_header};
use crate::layout::{encoded_len, FormatVersion, CENTROID_LEN, CUMULATIVE_ENTRY_LEN};
use crate::{
    Centroid, DecodeLimits, DigestSnapshot, PrimitiveReader, PrimitiveWriter, SnapshotDigest, SnapshotView,
};

/// Commits the digest and encodes its state into a new buffer.
///
/// Observations still buffered in the digest are merged by the commit before anything is written, so nothing the
/// digest has seen is lost from the encoded form.
///
/// # Errors
///
/// If the digest's state cannot be represented in the format (a negative capacity hint, or an array with more than
/// `i32::MAX` entries), an error is returned.
pub fn encode<D>(digest: &mut D) -> Result<Vec<u8>, SnapshotError>
where
    D: SnapshotDigest + ?Sized,
{
    digest.commit();

    let view = digest.snapshot_view();
    let buf = Vec::with_capacity(encoded_len(view.cumulative.len(), view.processed.len()));
    encode_view(&view, buf)
}

/// Commits the digest and encodes its state into the given sink, returning the sink.
///
/// # Errors
///
/// If the sink fails, the first failure is returned. Bytes may already have been written to the sink by then.
pub fn encode_to<D, W>(digest: &mut D, sink: W) -> Result<W, SnapshotError>
where
    D: SnapshotDigest + ?Sized,
    W: Write,
{
    digest.commit();
    encode_view(&digest.snapshot_view(), sink)
}

/// Encodes a view of committed state into the given sink, returning the sink.
///
/// No commit happens here: the view is written exactly as given.
///
/// # Errors
///
/// If the view cannot be represented in the format, an error is returned before anything is written. If the sink
/// fails, the first failure is returned.
pub fn encode_view<W: Write>(view: &SnapshotView<'_>, sink: W) -> Result<W, SnapshotError> {
    ensure_capacity_hint("max_processed", view.max_processed)?;
    ensure_capacity_hint("max_unprocessed", view.max_unprocessed)?;
    let cumulative_count = array_count("cumulative", view.cumulative.len())?;
    let processed_count = array_count("processed", view.processed.len())?;

    let mut writer = PrimitiveWriter::new(sink);
    let version = FormatVersion::CURRENT;
    write_header(&mut writer, version);

    match version {
        FormatVersion::V1 => {
            writer.write_f64(view.compression);
            writer.write_i32(view.max_processed);
            writer.write_i32(view.max_unprocessed);
            writer.write_f64(view.processed_weight);
            writer.write_f64(view.min);
            writer.write_f64(view.max);
            trace!(bytes_written = writer.bytes_written(), "Wrote snapshot scalars.");

            writer.write_i32(cumulative_count);
            for value in view.cumulative {
                writer.write_f64(*value);
            }

            writer.write_i32(processed_count);
            for centroid in view.processed {
                writer.write_f64(centroid.mean);
                writer.write_f64(centroid.weight);
            }
        }
    }

    let bytes_written = writer.bytes_written();
    let sink = writer.finish()?;

    debug!(
        bytes_written,
        cumulative_len = view.cumulative.len(),
        processed_len = view.processed.len(),
        "Encoded digest snapshot."
    );

    Ok(sink)
}

/// Decodes a snapshot.
///
/// Empty input is not an error: it decodes to `None`, meaning "no saved state". Any bytes after the end of the
/// snapshot are ignored.
///
/// # Errors
///
/// If the header is not a snapshot header, or names an unsupported version, or if the input ends before the snapshot
/// does, or if a count prefix or capacity hint is invalid, an error is returned.
pub fn decode(input: &[u8]) -> Result<Option<DigestSnapshot>, SnapshotError> {
    if input.is_empty() {
        trace!("Empty input. Nothing to decode.");
        return Ok(None);
    }

    let mut reader = PrimitiveReader::new(input);
    let version = read_header(&mut reader)?;
    let snapshot = match version {
        FormatVersion::V1 => read_v1(&mut reader)?,
    };

    if !reader.is_at_end() {
        debug!(
            trailing_bytes = reader.remaining(),
            "Ignoring trailing bytes after snapshot."
        );
    }

    debug!(
        bytes_read = reader.offset(),
        cumulative_len = snapshot.cumulative.len(),
        processed_len = snapshot.processed.len(),
        "Decoded digest snapshot."
    );

    Ok(Some(snapshot))
}

/// Decodes a snapshot and, if successful, has the target digest adopt it.
///
/// Empty input leaves the target untouched. The target is also left untouched if decoding fails at any point: the
/// snapshot is fully decoded before the target sees any of it.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_into<D>(input: &[u8], target: &mut D) -> Result<(), SnapshotError>
where
    D: SnapshotDigest + ?Sized,
{
    if let Some(snapshot) = decode(input)? {
        target.restore(snapshot);
    }

    Ok(())
}

/// Reads a snapshot from a stream, up to the configured maximum size, and decodes it.
///
/// An empty stream decodes to `None`.
///
/// # Errors
///
/// If reading from the stream fails, or the stream holds more than `limits.max_snapshot_size` bytes, an error is
/// returned without decoding anything. Otherwise, see [`decode`].
pub fn decode_from_reader<R: Read>(reader: R, limits: &DecodeLimits) -> Result<Option<DigestSnapshot>, SnapshotError> {
    // Read one byte past the limit so an oversized stream is distinguishable from one that is exactly at the limit.
    let mut buf = Vec::new();
    reader
        .take(limits.max_snapshot_size.saturating_add(1))
        .read_to_end(&mut buf)
        .context(error::Read)?;

    ensure!(
        buf.len() as u64 <= limits.max_snapshot_size,
        error::TooLarge {
            limit: limits.max_snapshot_size
        }
    );

    decode(&buf)
}

fn read_v1(reader: &mut PrimitiveReader<'_>) -> Result<DigestSnapshot, SnapshotError> {
    let compression = reader.read_f64();
    let max_processed = reader.read_i32();
    let max_unprocessed = reader.read_i32();
    let processed_weight = reader.read_f64();
    let min = reader.read_f64();
    let max = reader.read_f64();
    reader.check()?;

    ensure_capacity_hint("max_processed", max_processed)?;
    ensure_capacity_hint("max_unprocessed", max_unprocessed)?;
    trace!(bytes_read = reader.offset(), "Read snapshot scalars.");

    let cumulative_len = reader.read_count("cumulative", CUMULATIVE_ENTRY_LEN);
    let cumulative = reader.read_f64_array(cumulative_len);
    reader.check()?;
    trace!(cumulative_len, "Read cumulative table.");

    let processed_len = reader.read_count("processed", CENTROID_LEN);
    let mut processed = Vec::with_capacity(processed_len);
    for _ in 0..processed_len {
        let mean = reader.read_f64();
        let weight = reader.read_f64();
        processed.push(Centroid::new(mean, weight));
    }
    reader.check()?;
    trace!(processed_len, "Read processed centroids.");

    Ok(DigestSnapshot {
        compression,
        max_processed,
        max_unprocessed,
        processed_weight,
        min,
        max,
        cumulative,
        processed,
    })
}

fn ensure_capacity_hint(field: &'static str, value: i32) -> Result<(), SnapshotError> {
    ensure!(value >= 0, error::InvalidCapacityHint { field, value });
    Ok(())
}

fn array_count(field: &'static str, len: usize) -> Result<i32, SnapshotError> {
    i32::try_from(len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("{} has too many entries ({})", field, len)))
        .context(error::Write)
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::layout::{HEADER_LEN, MIN_ENCODED_LEN};
    use crate::writer::tests::LimitedSink;
    use crate::SnapshotErrorKind;

    /// A minimal stand-in for a digest engine.
    ///
    /// Committing folds pending centroids onto the end of the processed list, which is enough to observe whether the
    /// codec commits before encoding.
    #[derive(Clone, Debug, Default, PartialEq)]
    struct FakeDigest {
        state: DigestSnapshot,
        pending: Vec<Centroid>,
        commits: usize,
        unprocessed_capacity: usize,
    }

    impl SnapshotDigest for FakeDigest {
        fn commit(&mut self) {
            self.commits += 1;
            for centroid in self.pending.drain(..) {
                self.state.processed_weight += centroid.weight;
                self.state.processed.push(centroid);
                self.state.cumulative.push(self.state.processed_weight);
            }
        }

        fn snapshot_view(&self) -> SnapshotView<'_> {
            self.state.as_view()
        }

        fn restore(&mut self, snapshot: DigestSnapshot) {
            self.unprocessed_capacity = snapshot.max_unprocessed as usize + 1;
            self.pending = Vec::with_capacity(self.unprocessed_capacity);
            self.state = snapshot;
        }
    }

    fn scenario_snapshot() -> DigestSnapshot {
        DigestSnapshot {
            compression: 100.0,
            max_processed: 220,
            max_unprocessed: 500,
            processed_weight: 1000.0,
            min: -3.5,
            max: 99.2,
            cumulative: vec![0.0, 10.0, 1000.0],
            processed: vec![
                Centroid::new(-3.5, 5.0),
                Centroid::new(50.0, 990.0),
                Centroid::new(99.2, 5.0),
            ],
        }
    }

    fn encode_snapshot(snapshot: &DigestSnapshot) -> Vec<u8> {
        encode_view(&snapshot.as_view(), Vec::new()).expect("in-memory encode should not fail")
    }

    #[test]
    fn scenario_layout() {
        let snapshot = scenario_snapshot();
        let encoded = encode_snapshot(&snapshot);
        assert_eq!(encoded.len(), 130);
        assert_eq!(encoded.len(), encoded_len(3, 3));

        assert_eq!(&encoded[0..8], b"tdigest!");
        assert_eq!(&encoded[8..10], &1i16.to_le_bytes());
        assert_eq!(&encoded[10..18], &100.0f64.to_le_bytes());
        assert_eq!(&encoded[18..22], &220i32.to_le_bytes());
        assert_eq!(&encoded[22..26], &500i32.to_le_bytes());
        assert_eq!(&encoded[26..34], &1000.0f64.to_le_bytes());
        assert_eq!(&encoded[34..42], &(-3.5f64).to_le_bytes());
        assert_eq!(&encoded[42..50], &99.2f64.to_le_bytes());
        assert_eq!(&encoded[50..54], &3i32.to_le_bytes());
        assert_eq!(&encoded[54..62], &0.0f64.to_le_bytes());
        assert_eq!(&encoded[78..82], &3i32.to_le_bytes());
        assert_eq!(&encoded[82..90], &(-3.5f64).to_le_bytes());
        assert_eq!(&encoded[90..98], &5.0f64.to_le_bytes());
        assert_eq!(&encoded[122..130], &5.0f64.to_le_bytes());

        let decoded = decode(&encoded).expect("snapshot is valid").expect("input is not empty");
        assert_eq!(decoded, snapshot);
        assert!(decoded.bitwise_eq(&snapshot));
    }

    #[test]
    fn encode_commits_first() {
        let mut digest = FakeDigest {
            state: scenario_snapshot(),
            pending: vec![Centroid::new(120.0, 1.0)],
            ..Default::default()
        };

        let encoded = encode(&mut digest).expect("in-memory encode should not fail");
        assert_eq!(digest.commits, 1);
        assert!(digest.pending.is_empty());
        assert_eq!(encoded.len(), encoded_len(4, 4));

        let decoded = decode(&encoded).expect("snapshot is valid").expect("input is not empty");
        assert_eq!(decoded.processed.last(), Some(&Centroid::new(120.0, 1.0)));
        assert_eq!(decoded.processed_weight, 1001.0);

        // Committing an already committed digest is harmless, and re-encoding gives the same bytes.
        let again = encode(&mut digest).expect("in-memory encode should not fail");
        assert_eq!(digest.commits, 2);
        assert_eq!(again, encoded);
    }

    #[test]
    fn encode_to_sink() {
        let mut digest = FakeDigest {
            state: scenario_snapshot(),
            ..Default::default()
        };

        let sink = encode_to(&mut digest, io::Cursor::new(Vec::new())).expect("in-memory encode should not fail");
        assert_eq!(sink.into_inner(), encode_snapshot(&scenario_snapshot()));
    }

    #[test]
    fn empty_input_is_noop() {
        assert!(decode(&[]).expect("empty input is not an error").is_none());

        let mut target = FakeDigest {
            state: scenario_snapshot(),
            pending: vec![Centroid::new(1.0, 1.0)],
            ..Default::default()
        };
        let before = target.clone();

        decode_into(&[], &mut target).expect("empty input is not an error");
        assert_eq!(target, before);
    }

    #[test]
    fn decode_into_restores_and_resets_buffer() {
        let encoded = encode_snapshot(&scenario_snapshot());
        let mut target = FakeDigest {
            pending: vec![Centroid::new(1.0, 1.0)],
            ..Default::default()
        };

        decode_into(&encoded, &mut target).expect("snapshot is valid");
        assert_eq!(target.state, scenario_snapshot());
        assert!(target.pending.is_empty());
        assert_eq!(target.unprocessed_capacity, 501);
    }

    #[test]
    fn failed_decode_leaves_target_untouched() {
        let encoded = encode_snapshot(&scenario_snapshot());
        let mut target = FakeDigest {
            state: DigestSnapshot {
                compression: 42.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let before = target.clone();

        // Cut the input inside the processed array, well after every scalar has been read.
        let err = decode_into(&encoded[..120], &mut target).expect_err("truncated input should fail");
        assert_eq!(err.kind(), SnapshotErrorKind::Truncated);
        assert_eq!(target, before);
    }

    #[test]
    fn corrupted_magic_is_format_error() {
        let encoded = encode_snapshot(&scenario_snapshot());
        for idx in 0..8 {
            for mask in [0x01, 0x20, 0x80, 0xFF] {
                let mut corrupted = encoded.clone();
                corrupted[idx] ^= mask;

                let err = decode(&corrupted).expect_err("corrupted magic should fail");
                assert_eq!(err.kind(), SnapshotErrorKind::Format, "byte {} mask {:#x}", idx, mask);
            }
        }
    }

    #[test]
    fn unsupported_version_is_version_error() {
        let mut encoded = encode_snapshot(&scenario_snapshot());
        for version in [0i16, 2, -1, 256] {
            encoded[8..10].copy_from_slice(&version.to_le_bytes());
            match decode(&encoded) {
                Err(SnapshotError::Version { version: actual }) => assert_eq!(actual, version),
                other => panic!("expected version error, got {:?}", other),
            }
        }
    }

    #[test]
    fn every_strict_prefix_is_truncated() {
        let encoded = encode_snapshot(&scenario_snapshot());
        for len in 1..encoded.len() {
            let err = decode(&encoded[..len]).expect_err("strict prefix should fail");
            assert_eq!(err.kind(), SnapshotErrorKind::Truncated, "prefix length {}", len);
        }
    }

    #[test]
    fn empty_arrays_round_trip() {
        let snapshot = DigestSnapshot {
            compression: 50.0,
            max_processed: 100,
            max_unprocessed: 400,
            min: f64::MAX,
            max: -f64::MAX,
            ..Default::default()
        };

        let encoded = encode_snapshot(&snapshot);
        assert_eq!(encoded.len(), MIN_ENCODED_LEN);

        let decoded = decode(&encoded).expect("snapshot is valid").expect("input is not empty");
        assert!(decoded.cumulative.is_empty());
        assert!(decoded.processed.is_empty());
        assert!(decoded.bitwise_eq(&snapshot));
    }

    #[test]
    fn array_lengths_are_independent() {
        let mut snapshot = scenario_snapshot();
        snapshot.cumulative = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        snapshot.processed.truncate(1);

        let encoded = encode_snapshot(&snapshot);
        assert_eq!(encoded.len(), encoded_len(5, 1));

        let decoded = decode(&encoded).expect("snapshot is valid").expect("input is not empty");
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut encoded = encode_snapshot(&scenario_snapshot());
        encoded.extend_from_slice(b"trailer");

        let decoded = decode(&encoded).expect("snapshot is valid").expect("input is not empty");
        assert_eq!(decoded, scenario_snapshot());
    }

    #[test]
    fn negative_capacity_hint_is_rejected() {
        let mut encoded = encode_snapshot(&scenario_snapshot());
        encoded[HEADER_LEN + 12..HEADER_LEN + 16].copy_from_slice(&(-5i32).to_le_bytes());

        match decode(&encoded) {
            Err(SnapshotError::InvalidCapacityHint { field, value }) => {
                assert_eq!(field, "max_unprocessed");
                assert_eq!(value, -5);
            }
            other => panic!("expected invalid capacity hint, got {:?}", other),
        }

        let mut snapshot = scenario_snapshot();
        snapshot.max_processed = -1;
        let err = encode_view(&snapshot.as_view(), Vec::new()).expect_err("negative hint should not encode");
        assert_eq!(err.kind(), SnapshotErrorKind::Invalid);
    }

    #[test]
    fn hostile_count_is_truncation() {
        let mut encoded = encode_snapshot(&scenario_snapshot());
        encoded[50..54].copy_from_slice(&i32::MAX.to_le_bytes());

        let err = decode(&encoded).expect_err("count exceeds input");
        assert_eq!(err.kind(), SnapshotErrorKind::Truncated);
    }

    #[test]
    fn sink_failure_is_write_error() {
        let snapshot = scenario_snapshot();
        for limit in [0, 5, HEADER_LEN, 64, 129] {
            let err = encode_view(&snapshot.as_view(), LimitedSink::new(limit)).expect_err("sink should fail");
            assert_eq!(err.kind(), SnapshotErrorKind::Write, "sink limit {}", limit);
        }

        assert!(encode_view(&snapshot.as_view(), LimitedSink::new(130)).is_ok());
    }

    #[test]
    fn stream_within_limit() {
        let encoded = encode_snapshot(&scenario_snapshot());
        let limits = DecodeLimits::with_max_snapshot_size(encoded.len() as u64);

        let decoded = decode_from_reader(encoded.as_slice(), &limits)
            .expect("snapshot is valid")
            .expect("input is not empty");
        assert_eq!(decoded, scenario_snapshot());

        let empty: &[u8] = &[];
        assert!(decode_from_reader(empty, &limits).expect("empty stream").is_none());
    }

    #[test]
    fn stream_over_limit() {
        let encoded = encode_snapshot(&scenario_snapshot());
        let limits = DecodeLimits::with_max_snapshot_size(encoded.len() as u64 - 1);

        match decode_from_reader(encoded.as_slice(), &limits) {
            Err(SnapshotError::TooLarge { limit }) => assert_eq!(limit, 129),
            other => panic!("expected size limit error, got {:?}", other),
        }
    }

    #[test]
    fn stream_read_failure() {
        struct BrokenStream;

        impl io::Read for BrokenStream {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away"))
            }
        }

        let err = decode_from_reader(BrokenStream, &DecodeLimits::default()).expect_err("stream should fail");
        assert_eq!(err.kind(), SnapshotErrorKind::Read);
    }
}
