//! Snapshot header: magic tag and version tag.

use std::io::Write;

use snafu::ensure;
use tracing::trace;

use crate::error::{self, SnapshotError};
use crate::layout::{FormatVersion, MAGIC};
use crate::{PrimitiveReader, PrimitiveWriter};

/// Writes the magic tag followed by the tag for the given format version.
pub fn write_header<W: Write>(writer: &mut PrimitiveWriter<W>, version: FormatVersion) {
    writer.write_bytes(&MAGIC);
    writer.write_i16(version.tag());
}

/// Reads and validates a snapshot header.
///
/// # Errors
///
/// If the input ends within the header, a truncation error is returned. If the magic tag does not match, a format error
/// carrying the bytes found is returned. If the version tag is not a supported version, a version error carrying the
/// tag found is returned.
pub fn read_header(reader: &mut PrimitiveReader<'_>) -> Result<FormatVersion, SnapshotError> {
    let magic = reader.read_array::<8>();
    reader.check()?;
    ensure!(magic == MAGIC, error::Format { magic });

    let tag = reader.read_i16();
    reader.check()?;
    let version = FormatVersion::from_tag(tag).ok_or_else(|| error::Version { version: tag }.build())?;

    trace!(?version, "Validated snapshot header.");
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::HEADER_LEN;
    use crate::SnapshotErrorKind;

    fn encoded_header(version: i16) -> Vec<u8> {
        let mut writer = PrimitiveWriter::with_capacity(HEADER_LEN);
        writer.write_bytes(&MAGIC);
        writer.write_i16(version);
        writer.finish().expect("in-memory writes should not fail")
    }

    #[test]
    fn basic() {
        let mut writer = PrimitiveWriter::with_capacity(HEADER_LEN);
        write_header(&mut writer, FormatVersion::CURRENT);
        let buf = writer.finish().expect("in-memory writes should not fail");
        assert_eq!(buf, b"tdigest!\x01\x00");

        let mut reader = PrimitiveReader::new(&buf);
        assert_eq!(read_header(&mut reader).expect("header is valid"), FormatVersion::V1);
        assert!(reader.is_at_end());
    }

    #[test]
    fn magic_mismatch_carries_offending_bytes() {
        let mut buf = encoded_header(1);
        buf[..8].copy_from_slice(b"ddsketch");

        let mut reader = PrimitiveReader::new(&buf);
        match read_header(&mut reader) {
            Err(SnapshotError::Format { magic }) => assert_eq!(&magic, b"ddsketch"),
            other => panic!("expected format error, got {:?}", other),
        }

        // The version tag is never looked at once the magic tag fails.
        assert_eq!(reader.offset(), 8);
    }

    #[test]
    fn unsupported_version() {
        for tag in [0, 2, -1, i16::MAX] {
            let buf = encoded_header(tag);
            let mut reader = PrimitiveReader::new(&buf);
            match read_header(&mut reader) {
                Err(SnapshotError::Version { version }) => assert_eq!(version, tag),
                other => panic!("expected version error, got {:?}", other),
            }
        }
    }

    #[test]
    fn truncated_within_header() {
        let buf = encoded_header(1);
        for len in 1..HEADER_LEN {
            let mut reader = PrimitiveReader::new(&buf[..len]);
            let err = read_header(&mut reader).expect_err("partial header should fail");
            assert_eq!(err.kind(), SnapshotErrorKind::Truncated, "prefix length {}", len);
        }
    }
}
