//! Line aggregator
//!
//! Cross-references the coverage store against the outcome index and folds
//! the result into per-file line tables:
//!
//! 1. [`correlate`] walks every `(line, context)` pair of every measured file
//!    and records the line on the outcome owning that context.
//! 2. [`build_table`] groups outcomes by the production file key derived from
//!    their test identifier and counts, per line, how many failing and
//!    passing outcomes executed it.
//!
//! All state lives in the returned [`SpectrumTable`]; nothing survives
//! between runs.

use crate::coverage_store::{canonical_test_id, CoverageStore};
use crate::outcomes::{OutcomeIndex, TestOutcome, Verdict};
use std::collections::HashMap;

/// Execution counts for one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineStat {
    pub line_number: u32,
    pub failed_count: u32,
    pub passed_count: u32,
    /// Measured file the line was first attributed to
    pub source_file_path: String,
}

impl LineStat {
    pub fn new(line_number: u32, source_file_path: impl Into<String>) -> Self {
        Self {
            line_number,
            failed_count: 0,
            passed_count: 0,
            source_file_path: source_file_path.into(),
        }
    }

    /// Total executions (failed + passed)
    pub fn executions(&self) -> u32 {
        self.failed_count + self.passed_count
    }
}

/// Line table for one production file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub file_key: String,
    /// Lines in first-seen order
    pub lines: Vec<LineStat>,
    /// Instrumented line count used as the EXAM denominator
    pub total_lines: usize,
}

impl SourceFile {
    pub fn new(file_key: impl Into<String>) -> Self {
        Self {
            file_key: file_key.into(),
            lines: Vec::new(),
            total_lines: 0,
        }
    }

    /// Add one outcome's executed lines to the table
    fn tally(&mut self, outcome: &TestOutcome, index: &mut HashMap<u32, usize>) {
        let path = outcome.attribution_path().unwrap_or_default();
        for &line in &outcome.executed_lines {
            let slot = *index.entry(line).or_insert_with(|| {
                self.lines.push(LineStat::new(line, path));
                self.lines.len() - 1
            });
            let stat = &mut self.lines[slot];
            match outcome.verdict {
                Verdict::Fail => stat.failed_count += 1,
                Verdict::Pass => stat.passed_count += 1,
            }
        }
    }
}

/// Aggregated spectrum for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpectrumTable {
    pub files: Vec<SourceFile>,
    /// Sum of `failed_count` over every line of every file
    pub total_failed_executions: u64,
    /// Sum of `passed_count` over every line of every file
    pub total_passed_executions: u64,
}

impl SpectrumTable {
    /// Number of lines across all files
    pub fn line_count(&self) -> usize {
        self.files.iter().map(|f| f.lines.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Record every covered line on the outcome owning its context
pub fn correlate<S: CoverageStore + ?Sized>(store: &S, outcomes: &mut OutcomeIndex) {
    for file in store.measured_files() {
        let contexts = match store.contexts_by_line(file) {
            Some(contexts) if !contexts.is_empty() => contexts,
            _ => {
                tracing::debug!("No context data for {}, skipping", file);
                continue;
            }
        };

        for (&raw_line, line_contexts) in contexts {
            let Ok(line) = u32::try_from(raw_line.unsigned_abs()) else {
                tracing::warn!("Line number {} out of range in {}", raw_line, file);
                continue;
            };

            for context in line_contexts {
                let Some(test_id) = canonical_test_id(context) else {
                    continue;
                };
                if let Some(outcome) = outcomes.owner_mut(test_id) {
                    outcome.record_hit(line, file);
                }
            }
        }
    }
}

/// Fold correlated outcomes into per-file line tables
pub fn build_table<S: CoverageStore + ?Sized>(store: &S, outcomes: &OutcomeIndex) -> SpectrumTable {
    let mut files: Vec<SourceFile> = Vec::new();
    let mut by_key: HashMap<&str, usize> = HashMap::new();
    for outcome in outcomes.iter() {
        let key = outcome.file_key();
        by_key.entry(key).or_insert_with(|| {
            files.push(SourceFile::new(key));
            files.len() - 1
        });
    }

    let mut line_index: Vec<HashMap<u32, usize>> = vec![HashMap::new(); files.len()];
    for list in [outcomes.failed(), outcomes.passed()] {
        for outcome in list {
            if let Some(&slot) = by_key.get(outcome.file_key()) {
                files[slot].tally(outcome, &mut line_index[slot]);
            }
        }
    }

    files.retain(|file| {
        if file.lines.is_empty() {
            tracing::debug!("No executed lines mapped to {}, omitting", file.file_key);
        }
        !file.lines.is_empty()
    });

    for file in &mut files {
        file.total_lines = instrumented_line_count(store, file);
    }

    let total_failed_executions = files
        .iter()
        .flat_map(|f| f.lines.iter())
        .map(|l| u64::from(l.failed_count))
        .sum();
    let total_passed_executions = files
        .iter()
        .flat_map(|f| f.lines.iter())
        .map(|l| u64::from(l.passed_count))
        .sum();

    tracing::info!(
        "Aggregated {} files: F={} P={}",
        files.len(),
        total_failed_executions,
        total_passed_executions
    );

    SpectrumTable {
        files,
        total_failed_executions,
        total_passed_executions,
    }
}

/// Correlate and fold in one step
pub fn aggregate<S: CoverageStore + ?Sized>(store: &S, outcomes: &mut OutcomeIndex) -> SpectrumTable {
    correlate(store, outcomes);
    build_table(store, outcomes)
}

/// Instrumented line count of the measured file backing `file`
///
/// Prefers the measured file named by the key itself, then the path the
/// first line was attributed to, then the table's own line count.
fn instrumented_line_count<S: CoverageStore + ?Sized>(store: &S, file: &SourceFile) -> usize {
    let suffix = format!("/{}", file.file_key);
    let by_key = store
        .measured_files()
        .into_iter()
        .find(|m| *m == file.file_key || m.ends_with(&suffix))
        .and_then(|m| store.lines_for(m))
        .map(|lines| lines.len());

    let by_attribution = || {
        file.lines
            .first()
            .and_then(|l| store.lines_for(&l.source_file_path))
            .map(|lines| lines.len())
    };

    by_key
        .filter(|&n| n > 0)
        .or_else(|| by_attribution().filter(|&n| n > 0))
        .unwrap_or(file.lines.len())
}
