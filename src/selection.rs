//! Report selection: which ranked records get displayed or persisted

use crate::formulas::Metric;
use crate::ranking::{RankedFile, ScoreRecord};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Number of positions kept at either end of a ranking
pub const EDGE_WINDOW: usize = 3;

/// Which records of each file to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    /// Records ranked 1-3 under any metric (default)
    #[default]
    Top,
    /// Records ranked in the last three positions under any metric
    Bottom,
    /// Every record
    All,
}

impl Selection {
    /// Whether a record of a file with `line_count` records is kept
    pub fn keeps(self, record: &ScoreRecord, line_count: usize, metrics: &[Metric]) -> bool {
        match self {
            Selection::All => true,
            Selection::Top => metrics
                .iter()
                .any(|&m| (1..=EDGE_WINDOW).contains(&record.rank(m))),
            Selection::Bottom => {
                let floor = line_count.saturating_sub(EDGE_WINDOW);
                metrics.iter().any(|&m| record.rank(m) > floor)
            }
        }
    }
}

/// Filter ranked files, keeping record order; files left empty are dropped
///
/// A record is kept when *any* of `metrics` places it inside the window
/// (union across metrics, not intersection).
pub fn select(files: &[RankedFile], selection: Selection, metrics: &[Metric]) -> Vec<RankedFile> {
    files
        .iter()
        .filter_map(|file| {
            let line_count = file.records.len();
            let records: Vec<ScoreRecord> = file
                .records
                .iter()
                .filter(|r| selection.keeps(r, line_count, metrics))
                .cloned()
                .collect();

            if records.is_empty() {
                None
            } else {
                Some(RankedFile {
                    file: file.file.clone(),
                    total_lines: file.total_lines,
                    records,
                })
            }
        })
        .collect()
}
