//! Read/write interface between the pipeline and the game store

use chrono::NaiveDate;

use crate::{DateRange, GameId, GameRecord, PredictionKind, PredictionRecord, Result, TeamId};

/// A prediction whose game has finished but whose actual value is not yet recorded
#[derive(Debug, Clone)]
pub struct PendingOutcome {
    pub prediction: PredictionRecord,
    pub home_score: u16,
    pub away_score: u16,
}

/// Queries the pipeline issues against committed game rows.
///
/// Every game returned by the `*_completed_*` queries has status completed and
/// both scores present.
pub trait GameStore {
    /// Most recent completed games involving `team`, newest first.
    /// With `before`, only games strictly earlier than that date are considered.
    fn recent_completed_games(
        &self,
        team: TeamId,
        limit: usize,
        before: Option<NaiveDate>,
    ) -> Result<Vec<GameRecord>>;

    /// Most recent completed meetings between two teams in either venue order, newest first
    fn head_to_head_games(
        &self,
        first: TeamId,
        second: TeamId,
        limit: usize,
        before: Option<NaiveDate>,
    ) -> Result<Vec<GameRecord>>;

    /// Completed games in the range, oldest first
    fn completed_games(&self, range: DateRange) -> Result<Vec<GameRecord>>;

    /// Scheduled games in the range, oldest first
    fn scheduled_games(&self, range: DateRange) -> Result<Vec<GameRecord>>;

    /// Insert a prediction or overwrite the row with the same (game, model name, kind)
    fn upsert_prediction(&self, record: &PredictionRecord) -> Result<()>;

    /// Predictions lacking an actual value whose game is now completed
    fn pending_outcomes(&self) -> Result<Vec<PendingOutcome>>;

    /// Record the realized value once. Returns false if the row already had one.
    fn record_outcome(
        &self,
        game_id: GameId,
        model_name: &str,
        kind: PredictionKind,
        actual_value: f64,
        is_correct: bool,
    ) -> Result<bool>;
}
