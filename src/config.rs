//! Configuration loading (pinpoint.toml)
//!
//! # Example pinpoint.toml
//!
//! ```toml
//! coverage = "coverage.json"
//! outcomes = "report.json"
//! select = "all"
//! format = "text"
//! csv_out = "pinpoint.csv"
//! metrics = ["ochiai", "dstar"]
//! show_counts = true
//! ```
//!
//! Precedence: command line > configuration file > defaults.

use crate::cli::{Cli, OutputFormat};
use crate::formulas::Metric;
use crate::selection::Selection;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "pinpoint.toml";

/// Effective settings for one run
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PinpointConfig {
    /// coverage.py JSON export
    pub coverage: PathBuf,
    /// Test report
    pub outcomes: PathBuf,
    pub select: Selection,
    pub format: OutputFormat,
    /// Append-only CSV persistence target
    pub csv_out: Option<PathBuf>,
    /// Metrics used for display and selection; empty means all
    pub metrics: Vec<Metric>,
    pub show_counts: bool,
}

impl Default for PinpointConfig {
    fn default() -> Self {
        Self {
            coverage: PathBuf::from("coverage.json"),
            outcomes: PathBuf::from("test-results.json"),
            select: Selection::Top,
            format: OutputFormat::Text,
            csv_out: None,
            metrics: Metric::ALL.to_vec(),
            show_counts: false,
        }
    }
}

impl PinpointConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        Ok(config.normalized())
    }

    /// Explicit file (must exist), else `pinpoint.toml` in `dir` if present,
    /// else defaults
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            return Self::from_file(path);
        }

        let implicit = dir.join(DEFAULT_CONFIG_FILE);
        if implicit.is_file() {
            tracing::debug!("Using {}", implicit.display());
            Self::from_file(&implicit)
        } else {
            Ok(Self::default())
        }
    }

    /// Override with every option given on the command line
    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        if let Some(coverage) = &cli.coverage {
            self.coverage = coverage.clone();
        }
        if let Some(outcomes) = &cli.outcomes {
            self.outcomes = outcomes.clone();
        }
        if let Some(select) = cli.select {
            self.select = select;
        }
        if let Some(format) = cli.format {
            self.format = format;
        }
        if let Some(csv_out) = &cli.csv_out {
            self.csv_out = Some(csv_out.clone());
        }
        if !cli.metrics.is_empty() {
            self.metrics = cli.metrics.clone();
        }
        if cli.show_counts {
            self.show_counts = true;
        }
        self.normalized()
    }

    /// Deduplicate metrics (first occurrence wins); empty means all
    fn normalized(mut self) -> Self {
        let mut seen = Vec::with_capacity(self.metrics.len());
        for metric in self.metrics {
            if !seen.contains(&metric) {
                seen.push(metric);
            }
        }
        self.metrics = if seen.is_empty() {
            Metric::ALL.to_vec()
        } else {
            seen
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = PinpointConfig::default();
        assert_eq!(config.coverage, PathBuf::from("coverage.json"));
        assert_eq!(config.select, Selection::Top);
        assert_eq!(config.format, OutputFormat::Text);
        assert_eq!(config.metrics, Metric::ALL.to_vec());
        assert!(config.csv_out.is_none());
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
            coverage = "cov.json"
            outcomes = "report.json"
            select = "all"
            format = "json"
            csv_out = "out.csv"
            metrics = ["ochiai", "dstar", "ochiai"]
            show_counts = true
        "#;
        let config = PinpointConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.coverage, PathBuf::from("cov.json"));
        assert_eq!(config.select, Selection::All);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.csv_out, Some(PathBuf::from("out.csv")));
        assert_eq!(config.metrics, vec![Metric::Ochiai, Metric::DStar]);
        assert!(config.show_counts);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = PinpointConfig::from_toml_str(r#"select = "bottom""#).unwrap();
        assert_eq!(config.select, Selection::Bottom);
        assert_eq!(config.outcomes, PathBuf::from("test-results.json"));
    }

    #[test]
    fn test_empty_metrics_means_all() {
        let config = PinpointConfig::from_toml_str("metrics = []").unwrap();
        assert_eq!(config.metrics.len(), 5);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(PinpointConfig::from_toml_str("colour = true").is_err());
    }

    #[test]
    fn test_unknown_metric_rejected() {
        assert!(PinpointConfig::from_toml_str(r#"metrics = ["jaccard"]"#).is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let config = PinpointConfig::from_toml_str(
            r#"
            select = "all"
            format = "json"
            metrics = ["ochiai"]
        "#,
        )
        .unwrap();
        let cli = Cli::parse_from(["pinpoint", "--format", "csv", "--metric", "op2"]);
        let merged = config.apply_cli(&cli);
        assert_eq!(merged.select, Selection::All);
        assert_eq!(merged.format, OutputFormat::Csv);
        assert_eq!(merged.metrics, vec![Metric::Op2]);
    }

    #[test]
    fn test_discover_explicit_missing_is_error() {
        let tmp_dir = TempDir::new().unwrap();
        let missing = tmp_dir.path().join("nope.toml");
        assert!(PinpointConfig::discover(Some(&missing), tmp_dir.path()).is_err());
    }

    #[test]
    fn test_discover_implicit_file() {
        let tmp_dir = TempDir::new().unwrap();
        fs::write(tmp_dir.path().join(DEFAULT_CONFIG_FILE), r#"select = "all""#).unwrap();
        let config = PinpointConfig::discover(None, tmp_dir.path()).unwrap();
        assert_eq!(config.select, Selection::All);
    }

    #[test]
    fn test_discover_without_file_is_default() {
        let tmp_dir = TempDir::new().unwrap();
        let config = PinpointConfig::discover(None, tmp_dir.path()).unwrap();
        assert_eq!(config, PinpointConfig::default());
    }
}
