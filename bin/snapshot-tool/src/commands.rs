use std::{fs::File, io::Write, path::Path};

use anyhow::{Context as _, Error as GenericError};
use digest_snapshot::{DigestSnapshot, SnapshotDigest as _};
use tdigest::TDigest;
use tracing::{debug, info};

use crate::{
    cli::{EncodeCommand, InspectCommand, QuantilesCommand},
    config::{validate_compression, validate_quantile, Config},
    values::parse_values,
};

/// Builds a digest from a values file and writes it out as a snapshot.
pub fn encode(config: &Config, cmd: &EncodeCommand) -> Result<(), GenericError> {
    let compression = cmd.compression.unwrap_or(config.compression);
    validate_compression(compression)?;

    let raw = std::fs::read_to_string(&cmd.input)
        .with_context(|| format!("Failed to read values file '{}'.", cmd.input.display()))?;
    let observations = parse_values(&raw)?;

    let mut digest = TDigest::with_compression(compression);
    for observation in &observations {
        digest.add_weighted(observation.value, observation.weight);
    }

    let bytes = digest.to_bytes().context("Failed to encode digest.")?;
    std::fs::write(&cmd.output, &bytes)
        .with_context(|| format!("Failed to write snapshot file '{}'.", cmd.output.display()))?;

    info!(
        observations = observations.len(),
        centroids = digest.centroids().len(),
        snapshot_len = bytes.len(),
        output = %cmd.output.display(),
        "Wrote snapshot."
    );

    Ok(())
}

/// Prints the contents of a snapshot.
pub fn inspect<W: Write>(config: &Config, cmd: &InspectCommand, out: &mut W) -> Result<(), GenericError> {
    let snapshot = read_snapshot(config, &cmd.snapshot)?;

    if cmd.json {
        serde_json::to_writer_pretty(&mut *out, &snapshot).context("Failed to serialize snapshot.")?;
        writeln!(out)?;
        return Ok(());
    }

    match snapshot {
        None => writeln!(out, "empty snapshot")?,
        Some(snapshot) => {
            writeln!(out, "compression:      {}", snapshot.compression)?;
            writeln!(out, "max processed:    {}", snapshot.max_processed)?;
            writeln!(out, "max unprocessed:  {}", snapshot.max_unprocessed)?;
            writeln!(out, "processed weight: {}", snapshot.processed_weight)?;
            writeln!(out, "min:              {}", snapshot.min)?;
            writeln!(out, "max:              {}", snapshot.max)?;
            writeln!(out, "cumulative:       {} entries", snapshot.cumulative.len())?;
            writeln!(out, "centroids:        {}", snapshot.processed.len())?;
            for centroid in &snapshot.processed {
                writeln!(out, "  mean={} weight={}", centroid.mean, centroid.weight)?;
            }
        }
    }

    Ok(())
}

/// Restores a digest from a snapshot and prints quantile estimates.
pub fn quantiles<W: Write>(config: &Config, cmd: &QuantilesCommand, out: &mut W) -> Result<(), GenericError> {
    let quantiles = if cmd.quantiles.is_empty() {
        &config.quantiles
    } else {
        &cmd.quantiles
    };
    for quantile in quantiles {
        validate_quantile(*quantile)?;
    }

    let mut digest = TDigest::new();
    if let Some(snapshot) = read_snapshot(config, &cmd.snapshot)? {
        digest.restore(snapshot);
    }

    for quantile in quantiles {
        writeln!(out, "q{}\t{}", quantile, digest.quantile(*quantile))?;
    }

    Ok(())
}

fn read_snapshot(config: &Config, path: &Path) -> Result<Option<DigestSnapshot>, GenericError> {
    let file = File::open(path).with_context(|| format!("Failed to open snapshot file '{}'.", path.display()))?;
    let snapshot = digest_snapshot::decode_from_reader(file, &config.decode_limits())
        .with_context(|| format!("Failed to decode snapshot file '{}'.", path.display()))?;
    debug!(path = %path.display(), empty = snapshot.is_none(), "Read snapshot.");
    Ok(snapshot)
}
