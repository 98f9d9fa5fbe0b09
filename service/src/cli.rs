//! Command-line interface for sheet conversion.
//!
//! This module provides the `sheetcfg` commands:
//! - `encode`: infer schemas and write schema texts plus encoded data
//! - `dump`: read a sheet's encoded data back as JSON
//! - `report`: compare FlatBuffers and Protocol Buffers output sizes

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use sheetcfg_core::{BinaryFormat, FieldAccess, SheetCfgConfig};

use crate::decoder::{DecodeOptions, decode_sheet};
use crate::inference::infer_schema;
use crate::loader::ExcelLoader;
use crate::pipeline::{Pipeline, SheetStatus, data_filename};
use crate::registry::EnumRegistry;
use crate::report::SizeReport;

/// Spreadsheet to FlatBuffers / Protocol Buffers converter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Configuration file; flags override its values
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Output location and format shared by `encode` and `dump`
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Output directory
    #[arg(short = 'w', long)]
    pub workspace: Option<PathBuf>,

    /// Use Protocol Buffers instead of FlatBuffers
    #[arg(long)]
    pub protobuf: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert workbooks into schema texts and encoded data
    Encode {
        /// Workbook files
        #[arg(short = 'f', long = "file", required = true, num_args = 1..)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,

        /// Schema namespace or package
        #[arg(short = 'n', long)]
        namespace: Option<String>,

        /// Time zone of date cells, in hours east of UTC
        #[arg(short = 'z', long, allow_negative_numbers = true)]
        time_zone: Option<f64>,

        /// Add a `NONE` default case to new enums
        #[arg(short = 'c', long)]
        auto_default_case: bool,

        /// Export scope: default, client or server
        #[arg(short = 'a', long)]
        access: Option<FieldAccess>,

        /// Encode `float` fields as fixed-point records
        #[arg(long)]
        fixed32: bool,

        /// Fraction bits of `float` fixed-point records
        #[arg(long, requires = "fixed32")]
        fixed32_fraction_bits: Option<u32>,

        /// Encode `double` fields as fixed-point records
        #[arg(long)]
        fixed64: bool,

        /// Fraction bits of `double` fixed-point records
        #[arg(long, requires = "fixed64")]
        fixed64_fraction_bits: Option<u32>,

        /// Store fixed-point memory as unsigned integers
        #[arg(long)]
        unsigned_encoding: bool,

        /// Stop at the first failing sheet
        #[arg(long = "error")]
        halt_on_error: bool,
    },

    /// Print a sheet's encoded data as JSON
    Dump {
        /// Workbook the data was encoded from
        #[arg(short = 'f', long = "file")]
        file: PathBuf,

        /// Sheet name
        #[arg(long)]
        sheet: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Compare output sizes of both formats
    Report {
        /// Directory holding `.fpb` and `.ppb` files
        #[arg(short = 'w', long)]
        workspace: PathBuf,

        /// Render a Markdown table
        #[arg(long)]
        markdown: bool,
    },
}

impl OutputArgs {
    fn apply(&self, config: &mut SheetCfgConfig) {
        if let Some(workspace) = &self.workspace {
            config.workspace.clone_from(workspace);
        }
        if self.protobuf {
            config.format = BinaryFormat::Protobuf;
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SheetCfgConfig> {
    match path {
        Some(path) => SheetCfgConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display())),
        None => Ok(SheetCfgConfig::default()),
    }
}

/// Run a parsed command line
///
/// # Errors
///
/// Returns an error if configuration, loading or any sheet fails
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_ref())?;
    match cli.command {
        Commands::Encode {
            files,
            output,
            namespace,
            time_zone,
            auto_default_case,
            access,
            fixed32,
            fixed32_fraction_bits,
            fixed64,
            fixed64_fraction_bits,
            unsigned_encoding,
            halt_on_error,
        } => {
            output.apply(&mut config);
            if let Some(namespace) = namespace {
                config.namespace = namespace;
            }
            if let Some(time_zone) = time_zone {
                config.time_zone = time_zone;
            }
            if let Some(access) = access {
                config.access = access;
            }
            if fixed32 {
                config.fixed32.enabled = true;
                config.fixed32.fraction_bits = fixed32_fraction_bits.or(config.fixed32.fraction_bits);
            }
            if fixed64 {
                config.fixed64.enabled = true;
                config.fixed64.fraction_bits = fixed64_fraction_bits.or(config.fixed64.fraction_bits);
            }
            config.auto_default_case |= auto_default_case;
            config.unsigned_encoding |= unsigned_encoding;
            config.halt_on_error |= halt_on_error;
            encode(config, &files)
        }
        Commands::Dump { file, sheet, output } => {
            output.apply(&mut config);
            dump(&config, &file, &sheet)
        }
        Commands::Report {
            workspace,
            markdown,
        } => {
            let report = SizeReport::scan(&workspace)
                .with_context(|| format!("Failed to scan {}", workspace.display()))?;
            let rendered = if markdown {
                report.to_markdown()?
            } else {
                report.to_text()?
            };
            print!("{rendered}");
            Ok(())
        }
    }
}

fn encode(config: SheetCfgConfig, files: &[PathBuf]) -> anyhow::Result<()> {
    let mut pipeline = Pipeline::new(config)?;
    let mut failed = 0_usize;
    for file in files {
        let outcomes = pipeline
            .run_workbook(file)
            .with_context(|| format!("Failed to convert {}", file.display()))?;
        for outcome in outcomes {
            match &outcome.status {
                SheetStatus::Written { files, records } => {
                    info!("{}: {} records, {} files", outcome.sheet, records, files.len());
                }
                SheetStatus::Skipped(reason) => info!("{}: skipped, {}", outcome.sheet, reason),
                SheetStatus::Failed(_) => failed += 1,
            }
        }
    }
    if failed > 0 {
        bail!("{failed} sheet(s) failed to convert");
    }
    Ok(())
}

fn dump(config: &SheetCfgConfig, file: &Path, sheet: &str) -> anyhow::Result<()> {
    config.validate()?;
    let mut registry = EnumRegistry::load(&config.enum_registry_path())?;
    let grid = ExcelLoader::open(file)?.load_sheet(sheet)?;
    let schema = infer_schema(&grid, &mut registry, config)?;

    let data_path = config.workspace.join(data_filename(sheet, config.format));
    let bytes = fs::read(&data_path).with_context(|| format!("Failed to read {}", data_path.display()))?;
    let value = decode_sheet(
        &schema,
        &registry,
        DecodeOptions::from_config(config)?,
        config.format,
        &bytes,
    )?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_encode_flags() {
        let cli = Cli::try_parse_from([
            "sheetcfg", "encode", "-f", "a.xlsx", "b.xlsx", "--protobuf", "-w", "out", "-z", "-5",
            "-a", "client", "--fixed32", "--fixed32-fraction-bits", "12",
        ])
        .unwrap();
        let Commands::Encode {
            files,
            output,
            time_zone,
            access,
            fixed32_fraction_bits,
            ..
        } = cli.command
        else {
            panic!("expected encode");
        };
        assert_eq!(files.len(), 2);
        assert!(output.protobuf);
        assert_eq!(time_zone, Some(-5.0));
        assert_eq!(access, Some(FieldAccess::Client));
        assert_eq!(fixed32_fraction_bits, Some(12));
    }

    #[test]
    fn test_fraction_bits_require_fixed() {
        let result = Cli::try_parse_from(["sheetcfg", "encode", "-f", "a.xlsx", "--fixed64-fraction-bits", "8"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_output_args_override_config() {
        let mut config = SheetCfgConfig::default();
        OutputArgs {
            workspace: Some(PathBuf::from("target/out")),
            protobuf: true,
        }
        .apply(&mut config);
        assert_eq!(config.workspace, PathBuf::from("target/out"));
        assert_eq!(config.format, BinaryFormat::Protobuf);
    }
}
