//! JSON output format for ranked lines

use crate::engine::SbflReport;
use crate::formulas::Metric;
use crate::ranking::{RankedScore, ScoreRecord};
use serde::Serialize;
use std::collections::BTreeMap;

/// Format version identifier
const FORMAT_VERSION: &str = "1.0";

/// A single ranked line
#[derive(Debug, Clone, Serialize)]
pub struct JsonRecord {
    pub line: u32,
    /// Measured file the line was attributed to
    pub source: String,
    pub failed: u32,
    pub passed: u32,
    /// Metric name -> score/rank/exam
    pub scores: BTreeMap<&'static str, RankedScore>,
}

impl JsonRecord {
    fn from_record(record: &ScoreRecord, metrics: &[Metric]) -> Self {
        Self {
            line: record.line_number,
            source: record.source_file_path.clone(),
            failed: record.failed_count,
            passed: record.passed_count,
            scores: metrics
                .iter()
                .map(|&m| (m.name(), *record.metric(m)))
                .collect(),
        }
    }
}

/// Ranked lines of one file
#[derive(Debug, Clone, Serialize)]
pub struct JsonFile {
    pub file: String,
    pub total_lines: usize,
    pub records: Vec<JsonRecord>,
}

/// Summary statistics for the run
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    pub total_failed_executions: u64,
    pub total_passed_executions: u64,
    pub files: usize,
    pub records: usize,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    pub version: String,
    pub format: String,
    pub summary: JsonSummary,
    pub files: Vec<JsonFile>,
}

impl JsonOutput {
    pub fn new(report: &SbflReport, metrics: &[Metric]) -> Self {
        let files = report
            .files
            .iter()
            .map(|file| JsonFile {
                file: file.file.clone(),
                total_lines: file.total_lines,
                records: file
                    .records
                    .iter()
                    .map(|r| JsonRecord::from_record(r, metrics))
                    .collect(),
            })
            .collect();

        Self {
            version: FORMAT_VERSION.to_string(),
            format: "pinpoint-sbfl".to_string(),
            summary: JsonSummary {
                total_failed_executions: report.total_failed_executions,
                total_passed_executions: report.total_passed_executions,
                files: report.files.len(),
                records: report.record_count(),
            },
            files,
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{LineStat, SourceFile};
    use crate::ranking::rank_file;

    fn report() -> SbflReport {
        let source = SourceFile {
            file_key: "mod.py".to_string(),
            lines: vec![LineStat {
                line_number: 4,
                failed_count: 2,
                passed_count: 1,
                source_file_path: "src/mod.py".to_string(),
            }],
            total_lines: 10,
        };
        SbflReport {
            total_failed_executions: 3,
            total_passed_executions: 5,
            files: vec![rank_file(&source, 3, 5)],
        }
    }

    #[test]
    fn test_json_structure() {
        let output = JsonOutput::new(&report(), &Metric::ALL);
        let json = output.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["format"], "pinpoint-sbfl");
        assert_eq!(value["summary"]["total_failed_executions"], 3);
        assert_eq!(value["summary"]["records"], 1);
        assert_eq!(value["files"][0]["file"], "mod.py");
        assert_eq!(value["files"][0]["records"][0]["line"], 4);
        assert_eq!(value["files"][0]["records"][0]["scores"]["DStar"]["score"], 2.0);
        assert_eq!(value["files"][0]["records"][0]["scores"]["Op2"]["rank"], 1);
    }

    #[test]
    fn test_json_metric_subset() {
        let output = JsonOutput::new(&report(), &[Metric::Ochiai]);
        let scores = &output.files[0].records[0].scores;
        assert_eq!(scores.len(), 1);
        assert!(scores.contains_key("Ochiai"));
    }

    #[test]
    fn test_json_empty_report() {
        let output = JsonOutput::new(&SbflReport::default(), &Metric::ALL);
        assert!(output.files.is_empty());
        assert_eq!(output.summary.records, 0);
    }
}
