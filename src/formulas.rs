//! Suspiciousness formulas
//!
//! Each formula is a pure function of four counts:
//!
//! ```text
//! f = failed executions of the line     F = failed executions, all lines
//! p = passed executions of the line     P = passed executions, all lines
//! t = f + p
//!
//! Tarantula = (f/F) / ((f/F) + (p/P))
//! Ochiai    = f / sqrt(F * t)
//! Op2       = max(0, f - p/(P + 1))
//! Barinel   = 1 - p/t
//! DStar     = f^2 / (p + F - f)
//! ```
//!
//! Undefined ratios never escape: they are replaced by 0 (or `f64::MAX` for
//! a DStar line that is the only failing evidence and has no passing hits).

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Suspiciousness metric
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Tarantula,
    Ochiai,
    Op2,
    Barinel,
    #[value(name = "dstar")]
    DStar,
}

impl Metric {
    /// All metrics in report order
    pub const ALL: [Metric; 5] = [
        Metric::Tarantula,
        Metric::Ochiai,
        Metric::Op2,
        Metric::Barinel,
        Metric::DStar,
    ];

    /// Position in [`Metric::ALL`]
    pub fn index(self) -> usize {
        match self {
            Metric::Tarantula => 0,
            Metric::Ochiai => 1,
            Metric::Op2 => 2,
            Metric::Barinel => 3,
            Metric::DStar => 4,
        }
    }

    /// Display name, also used for CSV column prefixes
    pub fn name(self) -> &'static str {
        match self {
            Metric::Tarantula => "Tarantula",
            Metric::Ochiai => "Ochiai",
            Metric::Op2 => "Op2",
            Metric::Barinel => "Barinel",
            Metric::DStar => "DStar",
        }
    }

    /// Evaluate this metric for a spectrum
    pub fn score(self, spectrum: &Spectrum) -> f64 {
        match self {
            Metric::Tarantula => tarantula(spectrum),
            Metric::Ochiai => ochiai(spectrum),
            Metric::Op2 => op2(spectrum),
            Metric::Barinel => barinel(spectrum),
            Metric::DStar => dstar(spectrum),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inputs to every formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Spectrum {
    /// Failing executions of this line (f)
    pub failed: u64,
    /// Passing executions of this line (p)
    pub passed: u64,
    /// Failing executions across all lines (F)
    pub total_failed: u64,
    /// Passing executions across all lines (P)
    pub total_passed: u64,
}

impl Spectrum {
    pub fn new(failed: u64, passed: u64, total_failed: u64, total_passed: u64) -> Self {
        Self {
            failed,
            passed,
            total_failed,
            total_passed,
        }
    }

    /// t = f + p
    pub fn executions(&self) -> u64 {
        self.failed + self.passed
    }
}

pub fn tarantula(s: &Spectrum) -> f64 {
    if s.total_failed == 0 || s.total_passed == 0 {
        return 0.0;
    }

    let failed_ratio = s.failed as f64 / s.total_failed as f64;
    let passed_ratio = s.passed as f64 / s.total_passed as f64;

    if failed_ratio + passed_ratio == 0.0 {
        return 0.0;
    }

    failed_ratio / (failed_ratio + passed_ratio)
}

pub fn ochiai(s: &Spectrum) -> f64 {
    let denom = (s.total_failed as f64 * s.executions() as f64).sqrt();
    if denom > 0.0 {
        s.failed as f64 / denom
    } else {
        0.0
    }
}

pub fn op2(s: &Spectrum) -> f64 {
    let score = s.failed as f64 - s.passed as f64 / (s.total_passed as f64 + 1.0);
    score.max(0.0)
}

pub fn barinel(s: &Spectrum) -> f64 {
    let t = s.executions();
    if t == 0 {
        return 0.0;
    }
    1.0 - s.passed as f64 / t as f64
}

pub fn dstar(s: &Spectrum) -> f64 {
    if s.failed == 0 {
        return 0.0;
    }

    let f = s.failed as f64;
    let denom = s.passed as f64 + (s.total_failed as f64 - f);
    if denom > 0.0 {
        (f * f) / denom
    } else {
        f64::MAX
    }
}

/// The five scores of one line, indexed by [`Metric`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Scores([f64; 5]);

impl Scores {
    /// Evaluate every metric for one spectrum
    pub fn compute(spectrum: &Spectrum) -> Self {
        let mut values = [0.0; 5];
        for metric in Metric::ALL {
            values[metric.index()] = metric.score(spectrum);
        }
        Self(values)
    }

    pub fn get(&self, metric: Metric) -> f64 {
        self.0[metric.index()]
    }
}
