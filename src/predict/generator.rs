//! Batch prediction for upcoming games and the accuracy backfill

use chrono::{Duration, NaiveDate};

use crate::data::GameStore;
use crate::predict::manager::ModelManager;
use crate::predict::reconcile::{evaluate, ReconcileReport};
use crate::{DateRange, ReconcileConfig, Result};

/// Counts from one batch prediction run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub found: usize,
    pub stored: usize,
    pub failed: usize,
}

pub struct PredictionGenerator<'a, S: GameStore> {
    manager: &'a ModelManager<S>,
    tolerances: ReconcileConfig,
}

impl<'a, S: GameStore> PredictionGenerator<'a, S> {
    pub fn new(manager: &'a ModelManager<S>, tolerances: ReconcileConfig) -> Self {
        PredictionGenerator {
            manager,
            tolerances,
        }
    }

    /// Predict every scheduled game from `today` through `today + days_ahead` and store the rows.
    ///
    /// A game whose rows cannot be written is counted as failed and skipped.
    pub fn generate_upcoming(&self, today: NaiveDate, days_ahead: i64) -> Result<BatchReport> {
        let store = self.manager.store();
        let range = DateRange::new(Some(today), Some(today + Duration::days(days_ahead)));
        let games = store.scheduled_games(range)?;

        let mut report = BatchReport {
            found: games.len(),
            ..Default::default()
        };
        log::info!("Found {} scheduled games ({})", games.len(), range);

        for game in &games {
            let prediction = self.manager.predict_game(game.home_team, game.away_team);
            let stored = prediction
                .to_records(game.id)
                .iter()
                .try_for_each(|record| store.upsert_prediction(record));

            match stored {
                Ok(()) => {
                    log::debug!(
                        "{} on {}: p(home)={:.3} spread={:.1} total={:.1}",
                        game.id,
                        game.date,
                        prediction.home_win_probability,
                        prediction.predicted_spread,
                        prediction.predicted_total
                    );
                    report.stored += 1;
                }
                Err(e) => {
                    log::warn!("Failed to store predictions for {}: {}", game.id, e);
                    report.failed += 1;
                }
            }
        }

        log::info!(
            "Stored predictions for {}/{} games ({} failed)",
            report.stored,
            report.found,
            report.failed
        );
        Ok(report)
    }

    /// Fill in actual values and correctness for predictions whose games have finished
    pub fn reconcile(&self) -> Result<ReconcileReport> {
        let store = self.manager.store();
        let pending = store.pending_outcomes()?;
        log::info!("Reconciling {} predictions", pending.len());

        let mut report = ReconcileReport::default();
        for outcome in &pending {
            let p = &outcome.prediction;
            let (actual, correct) = evaluate(
                p.kind,
                p.predicted_value,
                outcome.home_score,
                outcome.away_score,
                &self.tolerances,
            );

            match store.record_outcome(p.game_id, &p.model_name, p.kind, actual, correct) {
                Ok(true) => report.record(p.kind, correct),
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    log::warn!("Failed to reconcile {} {}: {}", p.game_id, p.kind, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}
