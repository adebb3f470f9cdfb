use std::path::Path;

use anyhow::{ensure, Context as _, Error as GenericError};
use bytesize::ByteSize;
use digest_snapshot::DecodeLimits;
use serde::Deserialize;

const fn default_max_snapshot_size() -> ByteSize {
    ByteSize::b(DecodeLimits::DEFAULT_MAX_SNAPSHOT_SIZE)
}

const fn default_compression() -> f64 {
    100.0
}

fn default_quantiles() -> Vec<f64> {
    vec![0.5, 0.9, 0.95, 0.99]
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Maximum size of a snapshot file that will be read.
    ///
    /// Defaults to 64 MiB.
    #[serde(default = "default_max_snapshot_size")]
    pub max_snapshot_size: ByteSize,

    /// Compression used when building a digest from raw values.
    ///
    /// Defaults to 100.
    #[serde(default = "default_compression")]
    pub compression: f64,

    /// Quantiles reported by the `quantiles` command when none are given on the command line.
    ///
    /// Defaults to the median, p90, p95, and p99.
    #[serde(default = "default_quantiles")]
    pub quantiles: Vec<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_snapshot_size: default_max_snapshot_size(),
            compression: default_compression(),
            quantiles: default_quantiles(),
        }
    }
}

impl Config {
    /// Loads the configuration from the given file.
    pub fn try_from_file<P>(config_path: P) -> Result<Self, GenericError>
    where
        P: AsRef<Path>,
    {
        let config_file_raw =
            std::fs::read_to_string(config_path).context("Failed to read configuration file.")?;
        Self::try_from_yaml(&config_file_raw)
    }

    /// Loads the configuration from the given file, if any, and otherwise uses the defaults.
    pub fn from_optional_file(config_path: Option<&Path>) -> Result<Self, GenericError> {
        match config_path {
            Some(path) => Self::try_from_file(path),
            None => Ok(Self::default()),
        }
    }

    fn try_from_yaml(raw: &str) -> Result<Self, GenericError> {
        let config: Self = serde_yaml::from_str(raw).context("Failed to parse configuration file.")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), GenericError> {
        validate_compression(self.compression)?;
        for quantile in &self.quantiles {
            validate_quantile(*quantile)?;
        }
        Ok(())
    }

    /// Returns the limits to apply when reading snapshot files.
    pub fn decode_limits(&self) -> DecodeLimits {
        DecodeLimits::with_max_snapshot_size(self.max_snapshot_size.as_u64())
    }
}

/// Checks that the given compression can be used to build a digest.
pub fn validate_compression(compression: f64) -> Result<(), GenericError> {
    ensure!(
        compression.is_finite() && compression > 0.0,
        "compression must be a positive, finite number (got {})",
        compression
    );
    Ok(())
}

/// Checks that the given value is a quantile.
pub fn validate_quantile(quantile: f64) -> Result<(), GenericError> {
    ensure!(
        (0.0..=1.0).contains(&quantile),
        "quantile must be between 0 and 1 (got {})",
        quantile
    );
    Ok(())
}
