//! `sheetcfg` command-line interface
//!
//! This binary converts workbooks into FlatBuffers or Protocol Buffers
//! schemas and data.

use clap::Parser;
use sheetcfg_service::cli::{self, Cli};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    cli::run(cli)
}
