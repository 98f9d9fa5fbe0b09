//! Batch driver: workbooks in, schema text and encoded data out
//!
//! Each sheet is handled all-or-nothing. Its schema is inferred (updating
//! the shared enum registry, which is saved right away so later sheets and
//! later runs see the same ordinals), then every artifact is built in memory
//! and only written once the whole sheet succeeded.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use sheetcfg_core::{Grid, Result, Schema, SheetCfgConfig, SheetCfgError};

use crate::encoder::{EncodeOptions, encode_sheet};
use crate::generator::{GeneratorOptions, generator_for};
use crate::inference::infer_schema;
use crate::loader::{ExcelLoader, is_export_sheet};
use crate::registry::EnumRegistry;

/// A file ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

/// What happened to one sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetStatus {
    /// Artifacts were written
    Written {
        files: Vec<PathBuf>,
        records: usize,
    },
    /// The sheet had nothing to export
    Skipped(String),
    /// The sheet was rejected; nothing was written for it
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetOutcome {
    pub sheet: String,
    pub status: SheetStatus,
}

impl SheetOutcome {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.status, SheetStatus::Failed(_))
    }
}

/// Runs sheets through inference, generation and encoding
pub struct Pipeline {
    config: SheetCfgConfig,
    registry: EnumRegistry,
    registry_path: PathBuf,
}

impl Pipeline {
    /// Validate the configuration and load the enum registry
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::ConfigError` for invalid settings and
    /// registry loading errors
    pub fn new(config: SheetCfgConfig) -> Result<Self> {
        config.validate()?;
        let registry_path = config.enum_registry_path();
        let registry = EnumRegistry::load(&registry_path)?;
        Ok(Self {
            config,
            registry,
            registry_path,
        })
    }

    #[must_use]
    pub fn config(&self) -> &SheetCfgConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &EnumRegistry {
        &self.registry
    }

    /// Process every export sheet of a workbook
    ///
    /// # Errors
    ///
    /// Returns the first sheet error when `halt_on_error` is set, and I/O
    /// errors in any case; other sheet errors are recorded in the outcomes
    pub fn run_workbook(&mut self, path: &Path) -> Result<Vec<SheetOutcome>> {
        let mut loader = ExcelLoader::open(path)?;
        info!("Processing workbook {}", path.display());
        let mut outcomes = Vec::new();
        for sheet_name in loader.sheet_names() {
            if !is_export_sheet(&sheet_name, self.config.uppercase_sheets_only) {
                continue;
            }
            let outcome = match loader.load_sheet(&sheet_name) {
                Ok(grid) => self.run_sheet(&grid)?,
                Err(e) => self.reject(&sheet_name, e)?,
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Process one sheet
    ///
    /// # Errors
    ///
    /// Same policy as [`run_workbook`](Self::run_workbook)
    pub fn run_sheet<G: Grid + ?Sized>(&mut self, grid: &G) -> Result<SheetOutcome> {
        let sheet = grid.sheet_name().to_string();
        let schema = match infer_schema(grid, &mut self.registry, &self.config) {
            Ok(schema) => schema,
            Err(e) => return self.reject(&sheet, e),
        };
        self.registry.save(&self.registry_path)?;

        let root = schema.root()?;
        if schema.exported_members(root, self.config.access).is_empty() {
            info!("Sheet {} has no fields for {} access", sheet, self.config.access);
            return Ok(SheetOutcome {
                sheet,
                status: SheetStatus::Skipped(format!("no fields for {} access", self.config.access)),
            });
        }

        let artifacts = match self.build_artifacts(&schema, grid) {
            Ok(artifacts) => artifacts,
            Err(e) => return self.reject(&sheet, e),
        };
        let files = write_artifacts(&artifacts)?;
        Ok(SheetOutcome {
            sheet,
            status: SheetStatus::Written {
                files,
                records: grid.data_rows().len(),
            },
        })
    }

    /// Schema text files and the encoded data file of one sheet
    ///
    /// # Errors
    ///
    /// Returns generation and encoding errors
    pub fn build_artifacts<G: Grid + ?Sized>(&self, schema: &Schema, grid: &G) -> Result<Vec<Artifact>> {
        let workspace = &self.config.workspace;
        let format = self.config.format;
        let generator = generator_for(format, GeneratorOptions::from_config(&self.config));
        let mut artifacts: Vec<Artifact> = generator
            .generate_all(schema, &self.registry)?
            .into_iter()
            .map(|file| Artifact {
                path: workspace.join(file.filename),
                contents: file.content.into_bytes(),
            })
            .collect();

        let options = EncodeOptions::from_config(&self.config)?;
        let data = encode_sheet(schema, grid, &self.registry, options, format)?;
        artifacts.push(Artifact {
            path: workspace.join(data_filename(schema.sheet_name(), format)),
            contents: data,
        });
        Ok(artifacts)
    }

    fn reject(&self, sheet: &str, error: SheetCfgError) -> Result<SheetOutcome> {
        if self.config.halt_on_error || !error.is_sheet_local() {
            return Err(error);
        }
        warn!("Skipping sheet {sheet}: {error}");
        Ok(SheetOutcome {
            sheet: sheet.to_string(),
            status: SheetStatus::Failed(error.to_string()),
        })
    }
}

/// Name of a sheet's encoded data file, such as `item.fpb`
#[must_use]
pub fn data_filename(sheet_name: &str, format: sheetcfg_core::BinaryFormat) -> String {
    format!("{}.{}", sheet_name.to_lowercase(), format.data_extension())
}

/// Write every artifact or none of them
///
/// Files are first written next to their targets with a `.tmp` suffix and
/// only renamed into place once all of them were written.
fn write_artifacts(artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
    let mut staged: Vec<(PathBuf, &Artifact)> = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        match stage(artifact) {
            Ok(tmp) => staged.push((tmp, artifact)),
            Err(e) => {
                discard(staged.iter().map(|(tmp, _)| tmp));
                return Err(e);
            }
        }
    }

    let mut written = Vec::with_capacity(staged.len());
    for (i, (tmp, artifact)) in staged.iter().enumerate() {
        if let Err(e) = fs::rename(tmp, &artifact.path) {
            discard(staged[i..].iter().map(|(tmp, _)| tmp));
            return Err(e.into());
        }
        info!(
            "Wrote {} ({} bytes)",
            artifact.path.display(),
            artifact.contents.len()
        );
        written.push(artifact.path.clone());
    }
    Ok(written)
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn stage(artifact: &Artifact) -> Result<PathBuf> {
    if let Some(parent) = artifact.path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = staging_path(&artifact.path);
    fs::write(&tmp, &artifact.contents)?;
    Ok(tmp)
}

fn discard<'a>(paths: impl Iterator<Item = &'a PathBuf>) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to remove {}: {e}", path.display());
        }
    }
}
