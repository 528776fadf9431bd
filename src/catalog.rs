//! Query catalog for tickit-report.
//!
//! A catalog is an ordered list of `QuerySpec`s loaded from TOML. The ten
//! TICKIT queries ship embedded in the binary; `--queries` swaps in another
//! file without recompiling.

use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The built-in catalog source.
const BUILTIN_CATALOG: &str = include_str!("../queries/tickit.toml");

/// Maximum characters of SQL used as a fallback label.
const FALLBACK_LABEL_LEN: usize = 60;

/// A single unit of work: SQL text plus an optional display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// SQL text, executed verbatim.
    pub sql: String,

    /// Label shown in the console banner.
    #[serde(default)]
    pub label: Option<String>,
}

impl QuerySpec {
    /// Creates a new query spec.
    pub fn new(sql: impl Into<String>, label: Option<&str>) -> Self {
        Self {
            sql: sql.into(),
            label: label.map(String::from),
        }
    }

    /// Returns the label, or a condensed form of the SQL when there is none.
    pub fn display_label(&self) -> String {
        if let Some(label) = self.label.as_deref().filter(|l| !l.trim().is_empty()) {
            return label.to_string();
        }

        let condensed = self.sql.split_whitespace().collect::<Vec<_>>().join(" ");
        if condensed.chars().count() > FALLBACK_LABEL_LEN {
            let truncated: String = condensed.chars().take(FALLBACK_LABEL_LEN).collect();
            format!("{truncated}…")
        } else {
            condensed
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    queries: Vec<QuerySpec>,
}

/// An ordered, validated list of queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCatalog {
    queries: Vec<QuerySpec>,
}

impl QueryCatalog {
    /// Returns the embedded TICKIT catalog.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_CATALOG, "built-in catalog")
    }

    /// Loads a catalog from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReportError::config(format!(
                "Failed to read query catalog {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Parses and validates a catalog. `source` names it in error messages.
    pub fn from_toml_str(content: &str, source: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content).map_err(|e| {
            ReportError::config(format!("Invalid query catalog in {source}:\n  {e}"))
        })?;

        if file.queries.is_empty() {
            return Err(ReportError::config(format!(
                "Query catalog {source} contains no [[queries]] entries"
            )));
        }

        if let Some(pos) = file.queries.iter().position(|q| q.sql.trim().is_empty()) {
            return Err(ReportError::config(format!(
                "Query #{} in {source} has empty SQL",
                pos + 1
            )));
        }

        Ok(Self {
            queries: file.queries,
        })
    }

    /// Returns the queries in catalog order.
    pub fn queries(&self) -> &[QuerySpec] {
        &self.queries
    }

    /// Finds a query by its label.
    pub fn find(&self, label: &str) -> Option<&QuerySpec> {
        self.queries
            .iter()
            .find(|q| q.label.as_deref() == Some(label))
    }

    /// Selects queries by 1-based index, keeping catalog order.
    ///
    /// An empty selection returns the whole catalog.
    pub fn select(&self, indices: &[usize]) -> Result<Vec<QuerySpec>> {
        if indices.is_empty() {
            return Ok(self.queries.clone());
        }

        if let Some(bad) = indices
            .iter()
            .find(|&&i| i == 0 || i > self.queries.len())
        {
            return Err(ReportError::config(format!(
                "Query index {bad} is out of range (1..={})",
                self.queries.len()
            )));
        }

        Ok(self
            .queries
            .iter()
            .enumerate()
            .filter(|(i, _)| indices.contains(&(i + 1)))
            .map(|(_, q)| q.clone())
            .collect())
    }
}
