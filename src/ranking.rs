//! Per-file ranking of suspiciousness scores
//!
//! For every metric independently, lines are ordered by score descending.
//! Ties are broken by insertion order: the line that appeared first in the
//! file's line table gets the smaller (more suspicious) rank. Ranks are
//! 1-based positions in that order, so each metric's ranks are always a
//! permutation of `1..=N`.
//!
//! The EXAM score normalizes a rank by the file's instrumented line count:
//! `exam = rank / total_lines`. Lower is better.

use crate::aggregator::{SourceFile, SpectrumTable};
use crate::formulas::{Metric, Scores, Spectrum};
use serde::Serialize;
use std::cmp::Ordering;

/// Score, rank and EXAM value of one line under one metric
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RankedScore {
    pub score: f64,
    pub rank: usize,
    pub exam: f64,
}

/// Fully ranked line
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub file: String,
    pub line_number: u32,
    pub source_file_path: String,
    pub total_lines: usize,
    pub failed_count: u32,
    pub passed_count: u32,
    metrics: [RankedScore; 5],
}

impl ScoreRecord {
    pub fn metric(&self, metric: Metric) -> &RankedScore {
        &self.metrics[metric.index()]
    }

    pub fn score(&self, metric: Metric) -> f64 {
        self.metric(metric).score
    }

    pub fn rank(&self, metric: Metric) -> usize {
        self.metric(metric).rank
    }

    pub fn exam(&self, metric: Metric) -> f64 {
        self.metric(metric).exam
    }
}

/// Ranked records of one file, in line-table order
#[derive(Debug, Clone, PartialEq)]
pub struct RankedFile {
    pub file: String,
    pub total_lines: usize,
    pub records: Vec<ScoreRecord>,
}

/// Rank of each input position, ties resolved by position
///
/// `rank_positions(&[0.5, 0.9, 0.5])` is `[2, 1, 3]`.
pub fn rank_positions(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<(f64, usize)> = scores.iter().copied().zip(0..).collect();
    order.sort_by(|a, b| match b.0.total_cmp(&a.0) {
        Ordering::Equal => a.1.cmp(&b.1),
        other => other,
    });

    let mut ranks = vec![0; scores.len()];
    for (position, &(_, idx)) in order.iter().enumerate() {
        ranks[idx] = position + 1;
    }
    ranks
}

/// Score and rank every line of one file
pub fn rank_file(file: &SourceFile, total_failed: u64, total_passed: u64) -> RankedFile {
    let total_lines = if file.total_lines > 0 {
        file.total_lines
    } else {
        file.lines.len()
    };

    let scores: Vec<Scores> = file
        .lines
        .iter()
        .map(|line| {
            Scores::compute(&Spectrum::new(
                u64::from(line.failed_count),
                u64::from(line.passed_count),
                total_failed,
                total_passed,
            ))
        })
        .collect();

    let mut metrics = vec![[RankedScore::default(); 5]; scores.len()];
    for metric in Metric::ALL {
        let values: Vec<f64> = scores.iter().map(|s| s.get(metric)).collect();
        for (idx, rank) in rank_positions(&values).into_iter().enumerate() {
            metrics[idx][metric.index()] = RankedScore {
                score: values[idx],
                rank,
                exam: rank as f64 / total_lines as f64,
            };
        }
    }

    let records = file
        .lines
        .iter()
        .zip(metrics)
        .map(|(line, metrics)| ScoreRecord {
            file: file.file_key.clone(),
            line_number: line.line_number,
            source_file_path: line.source_file_path.clone(),
            total_lines,
            failed_count: line.failed_count,
            passed_count: line.passed_count,
            metrics,
        })
        .collect();

    RankedFile {
        file: file.file_key.clone(),
        total_lines,
        records,
    }
}

/// Rank every file of an aggregated table
pub fn rank_table(table: &SpectrumTable) -> Vec<RankedFile> {
    table
        .files
        .iter()
        .map(|file| {
            rank_file(
                file,
                table.total_failed_executions,
                table.total_passed_executions,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::LineStat;

    fn line(n: u32, failed: u32, passed: u32) -> LineStat {
        LineStat {
            line_number: n,
            failed_count: failed,
            passed_count: passed,
            source_file_path: "src/mod.py".to_string(),
        }
    }

    fn file(lines: Vec<LineStat>, total_lines: usize) -> SourceFile {
        SourceFile {
            file_key: "mod.py".to_string(),
            lines,
            total_lines,
        }
    }

    #[test]
    fn test_rank_positions_descending() {
        assert_eq!(rank_positions(&[0.1, 0.9, 0.5]), vec![3, 1, 2]);
    }

    #[test]
    fn test_rank_positions_ties_by_insertion() {
        assert_eq!(rank_positions(&[0.5, 0.9, 0.5]), vec![2, 1, 3]);
        assert_eq!(rank_positions(&[0.0, 0.0, 0.0]), vec![1, 2, 3]);
    }

    #[test]
    fn test_rank_positions_empty() {
        assert!(rank_positions(&[]).is_empty());
    }

    #[test]
    fn test_rank_file_single_line_scenario() {
        let ranked = rank_file(&file(vec![line(7, 2, 1)], 10), 3, 5);
        let record = &ranked.records[0];
        assert!((record.score(Metric::Tarantula) - 0.7692).abs() < 1e-4);
        assert_eq!(record.score(Metric::DStar), 2.0);
        for metric in Metric::ALL {
            assert_eq!(record.rank(metric), 1);
            assert!((record.exam(metric) - 0.1).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rank_file_tied_tarantula_keeps_insertion_order() {
        // Lines 10 and 20 share f/p, so every metric ties between them
        let ranked = rank_file(
            &file(vec![line(20, 1, 1), line(10, 1, 1), line(30, 2, 0)], 5),
            4,
            2,
        );
        let by_line = |n: u32| {
            ranked
                .records
                .iter()
                .find(|r| r.line_number == n)
                .unwrap()
                .rank(Metric::Tarantula)
        };
        assert_eq!(by_line(30), 1);
        assert_eq!(by_line(20), 2);
        assert_eq!(by_line(10), 3);
    }

    #[test]
    fn test_rank_file_exam_uses_total_lines() {
        let ranked = rank_file(&file(vec![line(1, 1, 0), line(2, 0, 1)], 4), 1, 1);
        assert_eq!(ranked.total_lines, 4);
        assert_eq!(ranked.records[1].exam(Metric::Ochiai), 0.5);
    }

    #[test]
    fn test_rank_file_zero_total_falls_back() {
        let ranked = rank_file(&file(vec![line(1, 1, 0), line(2, 1, 0)], 0), 2, 0);
        assert_eq!(ranked.total_lines, 2);
        assert_eq!(ranked.records[1].exam(Metric::Op2), 1.0);
    }

    #[test]
    fn test_rank_table_uses_global_totals() {
        let table = SpectrumTable {
            files: vec![file(vec![line(1, 2, 1)], 3)],
            total_failed_executions: 3,
            total_passed_executions: 5,
        };
        let ranked = rank_table(&table);
        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].records[0].score(Metric::Op2) - 1.8333).abs() < 1e-4);
    }
}
