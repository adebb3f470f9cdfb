//! Encodes values into t-digest snapshots, and inspects and queries existing snapshots.

#![deny(warnings)]
#![deny(missing_docs)]

use anyhow::Error as GenericError;
use clap::Parser as _;
use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

mod cli;
use self::cli::{Action, Cli};

mod commands;

mod config;
use self::config::Config;

mod values;

fn main() {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(true)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => {}
        Err(e) => {
            error!("{:?}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<(), GenericError> {
    let config = Config::from_optional_file(cli.config_file.as_deref())?;
    info!(
        max_snapshot_size = %config.max_snapshot_size,
        compression = config.compression,
        "Loaded configuration."
    );

    let mut stdout = std::io::stdout().lock();
    match cli.action {
        Action::Encode(cmd) => commands::encode(&config, &cmd),
        Action::Inspect(cmd) => commands::inspect(&config, &cmd, &mut stdout),
        Action::Quantiles(cmd) => commands::quantiles(&config, &cmd, &mut stdout),
    }
}
