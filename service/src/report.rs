//! Size comparison of FlatBuffers and Protocol Buffers outputs
//!
//! A workspace that has been encoded in both formats holds `<sheet>.fpb` and
//! `<sheet>.ppb` side by side; the report pairs them by stem.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::fs;
use std::path::Path;

use sheetcfg_core::{BinaryFormat, Result};

/// Sizes of one sheet's two encodings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeRow {
    pub name: String,
    pub flatbuffers: u64,
    pub protobuf: u64,
}

impl SizeRow {
    /// FlatBuffers size minus Protocol Buffers size
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn difference(&self) -> i64 {
        self.flatbuffers as i64 - self.protobuf as i64
    }

    /// Difference relative to the Protocol Buffers size, in percent
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self) -> f64 {
        if self.protobuf == 0 {
            0.0
        } else {
            self.difference() as f64 * 100.0 / self.protobuf as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeReport {
    pub rows: Vec<SizeRow>,
}

impl SizeReport {
    /// Pair the data files of a workspace
    ///
    /// Sheets encoded in only one format are left out.
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::IoError` if the directory cannot be read
    pub fn scan(workspace: &Path) -> Result<Self> {
        let fpb = BinaryFormat::Flatbuffers.data_extension();
        let ppb = BinaryFormat::Protobuf.data_extension();
        let mut sizes: BTreeMap<String, (Option<u64>, Option<u64>)> = BTreeMap::new();
        for entry in fs::read_dir(workspace)? {
            let entry = entry?;
            let path = entry.path();
            let (Some(stem), Some(ext)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.extension().and_then(|e| e.to_str()),
            ) else {
                continue;
            };
            let size = entry.metadata()?.len();
            let slot = sizes.entry(stem.to_string()).or_default();
            if ext == fpb {
                slot.0 = Some(size);
            } else if ext == ppb {
                slot.1 = Some(size);
            }
        }

        let mut rows: Vec<SizeRow> = sizes
            .into_iter()
            .filter_map(|(name, pair)| match pair {
                (Some(flatbuffers), Some(protobuf)) => Some(SizeRow {
                    name,
                    flatbuffers,
                    protobuf,
                }),
                _ => None,
            })
            .collect();
        rows.sort_by(|a, b| a.flatbuffers.cmp(&b.flatbuffers).then_with(|| a.name.cmp(&b.name)));
        Ok(Self { rows })
    }

    /// Totals over all rows
    #[must_use]
    pub fn summary(&self) -> SizeRow {
        SizeRow {
            name: "SUMMARY".to_string(),
            flatbuffers: self.rows.iter().map(|r| r.flatbuffers).sum(),
            protobuf: self.rows.iter().map(|r| r.protobuf).sum(),
        }
    }

    fn all_rows(&self) -> impl Iterator<Item = SizeRow> + '_ {
        self.rows.iter().cloned().chain(std::iter::once(self.summary()))
    }

    /// Aligned plain-text table
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::GenerationError` if formatting fails
    pub fn to_text(&self) -> Result<String> {
        let width = self
            .all_rows()
            .map(|r| r.name.len())
            .max()
            .unwrap_or_default()
            .max("NAME".len());
        let mut out = String::new();
        writeln!(
            out,
            "{:<width$}  {:>12}  {:>12}  {:>12}  {:>9}",
            "NAME", "FLATBUFFERS", "PROTOBUF", "DIFF", "PERCENT"
        )?;
        for row in self.all_rows() {
            writeln!(
                out,
                "{:<width$}  {:>12}  {:>12}  {:>12}  {:>8.2}%",
                row.name,
                row.flatbuffers,
                row.protobuf,
                row.difference(),
                row.percentage()
            )?;
        }
        Ok(out)
    }

    /// Markdown table
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::GenerationError` if formatting fails
    pub fn to_markdown(&self) -> Result<String> {
        let mut out = String::new();
        writeln!(out, "| Name | FlatBuffers | Protobuf | Diff | Percent |")?;
        writeln!(out, "|------|------------:|---------:|-----:|--------:|")?;
        for row in self.all_rows() {
            writeln!(
                out,
                "| {} | {} | {} | {} | {:.2}% |",
                row.name,
                row.flatbuffers,
                row.protobuf,
                row.difference(),
                row.percentage()
            )?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_pairs_and_sorts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("hero.fpb"), vec![0_u8; 300]).unwrap();
        fs::write(dir.path().join("hero.ppb"), vec![0_u8; 200]).unwrap();
        fs::write(dir.path().join("item.fpb"), vec![0_u8; 100]).unwrap();
        fs::write(dir.path().join("item.ppb"), vec![0_u8; 100]).unwrap();
        fs::write(dir.path().join("lonely.fpb"), vec![0_u8; 10]).unwrap();
        fs::write(dir.path().join("hero.fbs"), "table X {}").unwrap();

        let report = SizeReport::scan(dir.path()).unwrap();
        let names: Vec<&str> = report.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["item", "hero"]);
        assert_eq!(report.rows[1].difference(), 100);
        assert!((report.rows[1].percentage() - 50.0).abs() < 1e-9);

        let summary = report.summary();
        assert_eq!((summary.flatbuffers, summary.protobuf), (400, 300));
    }

    #[test]
    fn test_rendering() {
        let report = SizeReport {
            rows: vec![SizeRow {
                name: "item".to_string(),
                flatbuffers: 120,
                protobuf: 100,
            }],
        };
        let text = report.to_text().unwrap();
        assert!(text.lines().next().unwrap().starts_with("NAME"));
        assert!(text.contains("20.00%"));
        assert_eq!(text.lines().count(), 3);

        let markdown = report.to_markdown().unwrap();
        assert!(markdown.contains("| item | 120 | 100 | 20 | 20.00% |"));
        assert!(markdown.contains("| SUMMARY | 120 | 100 | 20 | 20.00% |"));
    }
}
