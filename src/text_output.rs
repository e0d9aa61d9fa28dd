//! Human-readable report

use crate::engine::SbflReport;
use crate::formulas::Metric;
use crate::ranking::ScoreRecord;

const RULE: &str = "──────────────────────────────────────────";

/// Text renderer options
#[derive(Debug, Clone)]
pub struct TextOutput {
    metrics: Vec<Metric>,
    show_counts: bool,
}

impl TextOutput {
    pub fn new(metrics: &[Metric], show_counts: bool) -> Self {
        Self {
            metrics: metrics.to_vec(),
            show_counts,
        }
    }

    fn format_score(score: f64) -> String {
        if score == f64::MAX {
            "inf".to_string()
        } else {
            format!("{:.4}", score)
        }
    }

    fn table_header(&self) -> String {
        let mut header = format!("  {:>6}", "Line");
        if self.show_counts {
            header.push_str(&format!(" {:>6} {:>6}", "Failed", "Passed"));
        }
        for metric in &self.metrics {
            header.push_str(&format!(" | {:>22}", format!("{} score/rank/exam", metric)));
        }
        header
    }

    fn format_record(&self, record: &ScoreRecord) -> String {
        let mut row = format!("  {:>6}", record.line_number);
        if self.show_counts {
            row.push_str(&format!(
                " {:>6} {:>6}",
                record.failed_count, record.passed_count
            ));
        }
        for &metric in &self.metrics {
            let ranked = record.metric(metric);
            row.push_str(&format!(
                " | {:>9} {:>5} {:>6.3}",
                Self::format_score(ranked.score),
                ranked.rank,
                ranked.exam
            ));
        }
        row
    }

    /// Render the whole report
    pub fn render(&self, report: &SbflReport) -> String {
        let mut output = String::new();
        output.push_str("=== Pinpoint Fault Localization ===\n");
        output.push_str(&format!(
            "Executions: {} failed, {} passed\n",
            report.total_failed_executions, report.total_passed_executions
        ));

        if report.is_empty() {
            output.push_str("No suspicious lines found\n");
            return output;
        }

        for file in &report.files {
            output.push_str(RULE);
            output.push('\n');
            output.push_str(&format!(
                "File: {} ({} lines shown, {} executable)\n",
                file.file,
                file.records.len(),
                file.total_lines
            ));
            output.push_str(&self.table_header());
            output.push('\n');
            for record in &file.records {
                output.push_str(&self.format_record(record));
                output.push('\n');
            }
        }
        output.push_str(RULE);
        output.push('\n');

        output
    }
}
