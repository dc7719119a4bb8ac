//! Scoring stored predictions against final results

use std::collections::BTreeMap;
use std::fmt;

use crate::{PredictionKind, ReconcileConfig};

/// Realized value and correctness of one prediction given the final score
pub fn evaluate(
    kind: PredictionKind,
    predicted: f64,
    home_score: u16,
    away_score: u16,
    tolerances: &ReconcileConfig,
) -> (f64, bool) {
    let (home, away) = (home_score as f64, away_score as f64);
    match kind {
        PredictionKind::Winner => {
            let home_won = home > away;
            let actual = if home_won { 1.0 } else { 0.0 };
            (actual, (predicted > 0.5) == home_won)
        }
        PredictionKind::Spread => {
            let actual = home - away;
            (actual, (predicted - actual).abs() <= tolerances.spread_tolerance)
        }
        PredictionKind::Total => {
            let actual = home + away;
            (actual, (predicted - actual).abs() <= tolerances.total_tolerance)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindTally {
    pub reconciled: usize,
    pub correct: usize,
}

/// Counts from one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub by_kind: BTreeMap<PredictionKind, KindTally>,
    /// Rows another writer reconciled first
    pub skipped: usize,
    pub failed: usize,
}

impl ReconcileReport {
    pub fn record(&mut self, kind: PredictionKind, correct: bool) {
        let tally = self.by_kind.entry(kind).or_default();
        tally.reconciled += 1;
        tally.correct += usize::from(correct);
    }

    pub fn reconciled(&self) -> usize {
        self.by_kind.values().map(|t| t.reconciled).sum()
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<8} {:>10} {:>8} {:>9}", "Kind", "Reconciled", "Correct", "Accuracy")?;
        for (kind, tally) in &self.by_kind {
            let accuracy = if tally.reconciled == 0 {
                0.0
            } else {
                tally.correct as f64 / tally.reconciled as f64 * 100.0
            };
            writeln!(
                f,
                "{:<8} {:>10} {:>8} {:>8.1}%",
                kind.as_str(),
                tally.reconciled,
                tally.correct,
                accuracy
            )?;
        }
        write!(f, "Skipped: {}, failed: {}", self.skipped, self.failed)
    }
}
