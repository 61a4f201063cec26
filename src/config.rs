// ABOUTME: Foreign-key rule configuration loaded from an optional TOML file
// ABOUTME: Lists columns that must always (or never) be offset during the merge

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Overrides for foreign-key columns the naming convention gets wrong.
///
/// `include_fks` are always offset even when the referenced table cannot be
/// resolved as tenanted; `exclude_fks` are always left alone. Both default
/// to empty.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FkRules {
    #[serde(default)]
    pub include_fks: Vec<String>,
    #[serde(default)]
    pub exclude_fks: Vec<String>,
}

impl FkRules {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse rules file {}", path.display()))
    }

    pub fn includes(&self, column: &str) -> bool {
        self.include_fks.iter().any(|c| c == column)
    }

    pub fn excludes(&self, column: &str) -> bool {
        self.exclude_fks.iter().any(|c| c == column)
    }
}
