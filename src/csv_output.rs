//! CSV output for ranked lines
//!
//! One row per displayed record:
//!
//! ```text
//! File,Line,Tarantula_rank,Tarantula_exam,Ochiai_rank,Ochiai_exam,...
//! ```
//!
//! [`CsvOutput::open_append`] and [`CsvOutput::write_to`] persist rows
//! append-only; the header is only written when the target is new or empty.

use crate::formulas::Metric;
use crate::ranking::ScoreRecord;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// CSV row for a single ranked line
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRanking {
    pub file: String,
    pub line: u32,
    /// (rank, exam) per metric, in [`Metric::ALL`] order
    pub positions: [(usize, f64); 5],
}

impl From<&ScoreRecord> for CsvRanking {
    fn from(record: &ScoreRecord) -> Self {
        let mut positions = [(0, 0.0); 5];
        for metric in Metric::ALL {
            positions[metric.index()] = (record.rank(metric), record.exam(metric));
        }
        Self {
            file: record.file.clone(),
            line: record.line_number,
            positions,
        }
    }
}

/// CSV output formatter
#[derive(Debug, Default)]
pub struct CsvOutput {
    rows: Vec<CsvRanking>,
}

impl CsvOutput {
    /// Create a new CSV output formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row to the output
    pub fn add_row(&mut self, row: CsvRanking) {
        self.rows.push(row);
    }

    /// Add every record of an iterator
    pub fn extend<'a, I: IntoIterator<Item = &'a ScoreRecord>>(&mut self, records: I) {
        self.rows.extend(records.into_iter().map(CsvRanking::from));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Generate CSV header row
    pub fn header() -> String {
        let mut headers = vec!["File".to_string(), "Line".to_string()];
        for metric in Metric::ALL {
            headers.push(format!("{}_rank", metric.name()));
            headers.push(format!("{}_exam", metric.name()));
        }
        headers.join(",")
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    /// Format a row without trailing newline
    fn format_row(row: &CsvRanking) -> String {
        let mut fields = vec![Self::escape_field(&row.file), row.line.to_string()];
        for (rank, exam) in row.positions {
            fields.push(rank.to_string());
            fields.push(exam.to_string());
        }
        fields.join(",")
    }

    /// Rows only, one per line
    fn rows_csv(&self) -> String {
        let mut output = String::new();
        for row in &self.rows {
            output.push_str(&Self::format_row(row));
            output.push('\n');
        }
        output
    }

    /// Generate CSV output as string, header included
    pub fn to_csv(&self) -> String {
        let mut output = Self::header();
        output.push('\n');
        output.push_str(&self.rows_csv());
        output
    }

    /// Open `path` for appending, creating it when missing
    pub fn open_append(path: &Path) -> Result<CsvSink> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open {} for appending", path.display()))?;

        let needs_header = file
            .metadata()
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len()
            == 0;

        Ok(CsvSink {
            file,
            path: path.to_path_buf(),
            needs_header,
        })
    }

    /// Write rows to an opened sink, header only for a new or empty file
    pub fn write_to(&self, sink: &mut CsvSink) -> Result<()> {
        let mut output = String::new();
        if sink.needs_header {
            output.push_str(&Self::header());
            output.push('\n');
        }
        output.push_str(&self.rows_csv());

        sink.file
            .write_all(output.as_bytes())
            .with_context(|| format!("Failed to write {}", sink.path.display()))?;
        sink.needs_header = false;
        tracing::info!("Appended {} rows to {}", self.rows.len(), sink.path.display());
        Ok(())
    }
}

/// Append-only CSV target opened ahead of rendering
#[derive(Debug)]
pub struct CsvSink {
    file: File,
    path: PathBuf,
    needs_header: bool,
}
