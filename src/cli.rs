//! CLI argument parsing for Pinpoint

use crate::formulas::Metric;
use crate::selection::Selection;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output format for the ranked report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format (default)
    #[default]
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "pinpoint")]
#[command(version)]
#[command(about = "Spectrum-based fault localization from test outcomes and per-test coverage", long_about = None)]
pub struct Cli {
    /// coverage.py JSON export with contexts (coverage json --show-contexts)
    #[arg(long = "coverage", value_name = "PATH")]
    pub coverage: Option<PathBuf>,

    /// Test report: {"failed": [...], "passed": [...]} or pytest-json-report output
    #[arg(long = "outcomes", value_name = "PATH")]
    pub outcomes: Option<PathBuf>,

    /// Which ranked lines to show
    #[arg(long = "select", value_enum)]
    pub select: Option<Selection>,

    /// Output format (text, json or csv)
    #[arg(long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Append displayed rankings to this CSV file
    #[arg(long = "csv-out", value_name = "PATH")]
    pub csv_out: Option<PathBuf>,

    /// Restrict display and selection to these metrics (repeatable)
    #[arg(long = "metric", value_enum, value_delimiter = ',')]
    pub metrics: Vec<Metric>,

    /// Configuration file (default: ./pinpoint.toml when present)
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Show per-line failed/passed execution counts in text output
    #[arg(long = "show-counts")]
    pub show_counts: bool,

    /// Enable debug logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
