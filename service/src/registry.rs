//! Persistent enum registry
//!
//! Maps every enum name to its case names and ordinals. Ordinals are
//! append-only: once a case has been written into encoded data its number
//! never changes, so the registry is loaded before a batch and saved after
//! every sheet.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use sheetcfg_core::{EnumRepr, Result, SheetCfgError};

/// Case name to ordinal
pub type CaseMap = IndexMap<String, u32>;

/// Enum name to case map, shared by every sheet of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnumRegistry {
    enums: IndexMap<String, CaseMap>,
}

impl EnumRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the registry, starting empty when the file does not exist
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::IoError` if the file exists but cannot be read
    /// Returns `SheetCfgError::SerializationError` if it is not a registry document
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No enum registry at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let contents = std::fs::read_to_string(path)?;
        let registry: Self = serde_json::from_str(&contents)?;
        info!(
            "Loaded {} enums from {}",
            registry.enums.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Write the registry as pretty-printed JSON, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::IoError` if the file cannot be written
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        debug!("Saved {} enums to {}", self.enums.len(), path.display());
        Ok(())
    }

    /// Make sure an enum exists, even without cases yet
    pub fn ensure(&mut self, enum_name: &str) {
        self.enums.entry(enum_name.to_string()).or_default();
    }

    #[must_use]
    pub fn contains(&self, enum_name: &str) -> bool {
        self.enums.contains_key(enum_name)
    }

    #[must_use]
    pub fn cases(&self, enum_name: &str) -> Option<&CaseMap> {
        self.enums.get(enum_name)
    }

    /// All enums in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CaseMap)> {
        self.enums.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.enums.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enums.is_empty()
    }

    /// Merge newly discovered case names into an enum
    ///
    /// An enum seen for the first time gets a default case at ordinal 0 when
    /// `auto_default` is set: `preferred_default` if given, otherwise
    /// `XY_NONE` built from the first two capitals of the enum name. New
    /// names are appended after the highest existing ordinal; known names keep
    /// their number. Returns the resolved default case, if any.
    pub fn import_cases<S: AsRef<str>>(
        &mut self,
        enum_name: &str,
        discovered: &[S],
        auto_default: bool,
        preferred_default: &str,
    ) -> Option<String> {
        let cases = self.enums.entry(enum_name.to_string()).or_default();
        let mut next = cases.values().max().map_or(0, |m| m + 1);
        if cases.is_empty() && auto_default {
            let default = if preferred_default.is_empty() {
                none_case_name(enum_name)
            } else {
                preferred_default.to_string()
            };
            cases.insert(default, next);
            next += 1;
        }
        let explicit = (!preferred_default.is_empty()).then_some(preferred_default);
        for name in discovered.iter().map(AsRef::as_ref).chain(explicit) {
            if !name.is_empty() && !cases.contains_key(name) {
                debug!("enum {enum_name}: new case {name} = {next}");
                cases.insert(name.to_string(), next);
                next += 1;
            }
        }
        if preferred_default.is_empty() {
            self.hook_default(enum_name)
        } else {
            Some(preferred_default.to_string())
        }
    }

    /// Case with the lowest ordinal
    #[must_use]
    pub fn hook_default(&self, enum_name: &str) -> Option<String> {
        self.enums
            .get(enum_name)?
            .iter()
            .min_by_key(|(_, ordinal)| **ordinal)
            .map(|(name, _)| name.clone())
    }

    #[must_use]
    pub fn ordinal(&self, enum_name: &str, case_name: &str) -> Option<u32> {
        self.enums.get(enum_name)?.get(case_name).copied()
    }

    /// Case name carrying `ordinal`
    #[must_use]
    pub fn case_name(&self, enum_name: &str, ordinal: u32) -> Option<&str> {
        self.enums
            .get(enum_name)?
            .iter()
            .find(|(_, o)| **o == ordinal)
            .map(|(name, _)| name.as_str())
    }

    /// Cases sorted by ordinal
    #[must_use]
    pub fn sorted_cases(&self, enum_name: &str) -> Vec<(&str, u32)> {
        let mut cases = self
            .enums
            .get(enum_name)
            .map(|c| c.iter().map(|(k, v)| (k.as_str(), *v)).collect::<Vec<_>>())
            .unwrap_or_default();
        cases.sort_by_key(|(_, ordinal)| *ordinal);
        cases
    }

    /// Storage width of an enum in FlatBuffers data
    #[must_use]
    pub fn repr(&self, enum_name: &str) -> EnumRepr {
        EnumRepr::for_case_count(self.enums.get(enum_name).map_or(0, IndexMap::len))
    }

    /// Ordinal of a case, failing on names the registry has never seen
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::MalformedLiteral` for unknown case names
    pub fn require_ordinal(&self, enum_name: &str, case_name: &str) -> Result<u32> {
        self.ordinal(enum_name, case_name)
            .ok_or_else(|| SheetCfgError::malformed(case_name, format!("case of enum {enum_name}")))
    }
}

/// `XY_NONE` from the first two capitals of `FooBarBaz`
fn none_case_name(enum_name: &str) -> String {
    let mut abbr: String = enum_name
        .chars()
        .filter(char::is_ascii_uppercase)
        .take(2)
        .collect();
    if abbr.is_empty() {
        abbr = enum_name.chars().take(2).collect::<String>().to_ascii_uppercase();
    }
    format!("{abbr}_NONE")
}
