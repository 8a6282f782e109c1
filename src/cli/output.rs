//! Output formatting for command results
//!
//! `plain` joins entries with commas on one line, `lines` prints one entry per
//! line and `json` emits a JSON array (or object for versions).

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Plain,
    Lines,
    Json,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_names<S: AsRef<str>>(&self, names: &[S]) -> Result<String> {
        let names: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
        match self.format {
            OutputFormat::Plain => Ok(names.join(",")),
            OutputFormat::Lines => Ok(names.join("\n")),
            OutputFormat::Json => {
                serde_json::to_string_pretty(&names).context("Failed to serialize names to JSON")
            }
        }
    }

    pub fn format_paths(&self, paths: &[PathBuf]) -> Result<String> {
        let rendered: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(paths).context("Failed to serialize paths to JSON")
            }
            _ => self.format_names(&rendered),
        }
    }

    /// Modules without a version render as `name=` in the text formats and
    /// `null` in JSON.
    pub fn format_versions(&self, versions: &BTreeMap<String, Option<String>>) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(versions)
                .context("Failed to serialize versions to JSON"),
            _ => {
                let entries: Vec<String> = versions
                    .iter()
                    .map(|(name, version)| format!("{}={}", name, version.as_deref().unwrap_or("")))
                    .collect();
                self.format_names(&entries)
            }
        }
    }
}
