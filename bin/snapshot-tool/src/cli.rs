use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "snapshot-tool", version, about = "Encodes, inspects, and queries t-digest snapshots.")]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config_file: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub action: Action,
}

#[derive(Subcommand)]
pub enum Action {
    /// Builds a digest from a file of values and writes it out as a snapshot.
    Encode(EncodeCommand),

    /// Prints the contents of a snapshot.
    Inspect(InspectCommand),

    /// Restores a digest from a snapshot and prints quantile estimates.
    Quantiles(QuantilesCommand),
}

#[derive(Args)]
pub struct EncodeCommand {
    /// File of values, one per line, optionally as `value,weight`.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Snapshot file to write.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Compression to build the digest with. Overrides the configured compression.
    #[arg(long)]
    pub compression: Option<f64>,
}

#[derive(Args)]
pub struct InspectCommand {
    /// Snapshot file to read.
    pub snapshot: PathBuf,

    /// Print the full snapshot as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct QuantilesCommand {
    /// Snapshot file to read.
    pub snapshot: PathBuf,

    /// Quantile to estimate. Can be given multiple times. Overrides the configured quantiles.
    #[arg(short = 'q', long = "quantile")]
    pub quantiles: Vec<f64>,
}
