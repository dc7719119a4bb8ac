//! Game outcome forecasting from historical results
//!
//! Builds statistical feature vectors from completed games, trains three
//! independent models (winner, spread, total points) and merges their outputs
//! into a single prediction per scheduled game.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::data::training_set::FeatureWindow;
use crate::features::StatsDefaults;

/// Unique identifier for a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team({})", self.0)
    }
}

/// Unique identifier for a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameId(pub i64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Game({})", self.0)
    }
}

/// Lifecycle status of a game as recorded by ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Scheduled,
    InProgress,
    Completed,
    Postponed,
    Cancelled,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Scheduled => "scheduled",
            GameStatus::InProgress => "in_progress",
            GameStatus::Completed => "completed",
            GameStatus::Postponed => "postponed",
            GameStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "scheduled" => Some(GameStatus::Scheduled),
            "in_progress" | "live" => Some(GameStatus::InProgress),
            "completed" | "final" => Some(GameStatus::Completed),
            "postponed" => Some(GameStatus::Postponed),
            "cancelled" | "canceled" => Some(GameStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A team as known to the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub abbreviation: String,
    pub city: Option<String>,
    pub aliases: Vec<String>,
}

impl Team {
    pub fn matches_name(&self, name: &str) -> bool {
        let name_lower = name.trim().to_lowercase();
        self.name.to_lowercase() == name_lower
            || self.abbreviation.to_lowercase() == name_lower
            || self.aliases.iter().any(|a| a.to_lowercase() == name_lower)
    }
}

/// A single game row, scheduled or played
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    pub date: NaiveDate,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub home_score: Option<u16>,
    pub away_score: Option<u16>,
    pub status: GameStatus,
    pub season: Option<String>,
}

impl GameRecord {
    /// Final score (home, away) if the game is completed with both scores recorded
    pub fn final_score(&self) -> Option<(u16, u16)> {
        match (self.status, self.home_score, self.away_score) {
            (GameStatus::Completed, Some(home), Some(away)) => Some((home, away)),
            _ => None,
        }
    }

    /// Whether this game counts as history for statistics and training
    pub fn is_completed(&self) -> bool {
        self.final_score().is_some()
    }

    /// Returns the score margin (positive = home win)
    pub fn margin(&self) -> Option<i32> {
        self.final_score()
            .map(|(home, away)| home as i32 - away as i32)
    }

    /// Check if a team was playing at home
    pub fn is_home(&self, team: TeamId) -> Option<bool> {
        if team == self.home_team {
            Some(true)
        } else if team == self.away_team {
            Some(false)
        } else {
            None
        }
    }

    /// Get (score for, score against) from a team's perspective
    pub fn scores_for(&self, team: TeamId) -> Option<(u16, u16)> {
        let (home, away) = self.final_score()?;
        match self.is_home(team)? {
            true => Some((home, away)),
            false => Some((away, home)),
        }
    }

    /// Check if the given team won this game
    pub fn did_win(&self, team: TeamId) -> Option<bool> {
        self.scores_for(team).map(|(scored, allowed)| scored > allowed)
    }
}

/// Closed date range, either end optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        DateRange { start, end }
    }

    /// Unbounded range covering every game
    pub fn all() -> Self {
        Self::default()
    }

    /// The `days` days leading up to and including `end`
    pub fn trailing_days(end: NaiveDate, days: i64) -> Self {
        DateRange {
            start: Some(end - chrono::Duration::days(days)),
            end: Some(end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (Some(s), Some(e)) => write!(f, "{} to {}", s, e),
            (Some(s), None) => write!(f, "from {}", s),
            (None, Some(e)) => write!(f, "until {}", e),
            (None, None) => write!(f, "all dates"),
        }
    }
}

/// Kind of value a prediction row carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionKind {
    /// Home win probability
    Winner,
    /// Home score minus away score
    Spread,
    /// Combined score
    Total,
}

impl PredictionKind {
    pub const ALL: [PredictionKind; 3] = [
        PredictionKind::Winner,
        PredictionKind::Spread,
        PredictionKind::Total,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionKind::Winner => "winner",
            PredictionKind::Spread => "spread",
            PredictionKind::Total => "total",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "winner" => Some(PredictionKind::Winner),
            "spread" => Some(PredictionKind::Spread),
            "total" => Some(PredictionKind::Total),
            _ => None,
        }
    }
}

impl fmt::Display for PredictionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored prediction, unique per (game, model name, kind)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub game_id: GameId,
    pub model_name: String,
    pub kind: PredictionKind,
    pub predicted_value: f64,
    pub confidence: f64,
    pub actual_value: Option<f64>,
    pub is_correct: Option<bool>,
}

/// Merged output of the three models for one matchup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamePrediction {
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub home_win_probability: f32,
    pub away_win_probability: f32,
    pub predicted_spread: f32,
    pub predicted_total: f32,
    pub confidence: BTreeMap<PredictionKind, f32>,
    pub model_name: String,
    pub generated_at: DateTime<Utc>,
}

impl GamePrediction {
    /// Fully neutral bundle used when no model output is available
    pub fn neutral(home_team: TeamId, away_team: TeamId, model_name: &str) -> Self {
        GamePrediction {
            home_team,
            away_team,
            home_win_probability: 0.5,
            away_win_probability: 0.5,
            predicted_spread: 0.0,
            predicted_total: 220.0,
            confidence: PredictionKind::ALL.iter().map(|k| (*k, 0.0)).collect(),
            model_name: model_name.to_string(),
            generated_at: Utc::now(),
        }
    }

    /// Get the predicted winner (home on a coin flip)
    pub fn predicted_winner(&self) -> TeamId {
        if self.home_win_probability >= 0.5 {
            self.home_team
        } else {
            self.away_team
        }
    }

    pub fn confidence_for(&self, kind: PredictionKind) -> f32 {
        self.confidence.get(&kind).copied().unwrap_or(0.0)
    }

    /// Split into one stored row per prediction kind
    pub fn to_records(&self, game_id: GameId) -> Vec<PredictionRecord> {
        PredictionKind::ALL
            .iter()
            .map(|&kind| {
                let predicted_value = match kind {
                    PredictionKind::Winner => self.home_win_probability,
                    PredictionKind::Spread => self.predicted_spread,
                    PredictionKind::Total => self.predicted_total,
                };
                PredictionRecord {
                    game_id,
                    model_name: self.model_name.clone(),
                    kind,
                    predicted_value: predicted_value as f64,
                    confidence: self.confidence_for(kind) as f64,
                    actual_value: None,
                    is_correct: None,
                }
            })
            .collect()
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum ApexError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("Training failed for {model}: {message}")]
    Training { model: String, message: String },

    #[error("Model artifact error for {model}: {message}")]
    Persistence { model: String, message: String },

    #[error("Inference failed: {0}")]
    Inference(String),
}

pub type Result<T> = std::result::Result<T, ApexError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub features: FeatureConfig,
    pub training: TrainingConfig,
    pub prediction: PredictionConfig,
    pub reconcile: ReconcileConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub database_path: String,
    pub models_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            database_path: "data/apex.db".to_string(),
            models_dir: "models".to_string(),
        }
    }
}

/// Window sizes and "no information" profiles for the aggregators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Recent completed games per team
    pub team_window: usize,
    /// Games counted as recent form
    pub form_window: usize,
    /// Most recent meetings between two teams
    pub head_to_head_window: usize,
    pub defaults: StatsDefaults,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            team_window: 10,
            form_window: 5,
            head_to_head_window: 5,
            defaults: StatsDefaults::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    /// Fraction of rows held out for evaluation
    pub held_out_fraction: f32,
    /// Seed for the train/held-out split and weight initialisation
    pub seed: u64,
    pub feature_window: FeatureWindow,
    /// Default training range when none is given on the command line
    pub lookback_days: i64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            epochs: 300,
            learning_rate: 0.05,
            held_out_fraction: 0.2,
            seed: 42,
            feature_window: FeatureWindow::Current,
            lookback_days: 730,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Name stored with every prediction row
    pub model_name: String,
    pub days_ahead: i64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        PredictionConfig {
            model_name: "apex_ml".to_string(),
            days_ahead: 7,
        }
    }
}

/// Tolerance bands for marking predictions correct
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub spread_tolerance: f64,
    pub total_tolerance: f64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        ReconcileConfig {
            spread_tolerance: 3.0,
            total_tolerance: 5.0,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ApexError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| ApexError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ApexError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(home_score: Option<u16>, away_score: Option<u16>, status: GameStatus) -> GameRecord {
        GameRecord {
            id: GameId(1),
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            home_team: TeamId(1),
            away_team: TeamId(2),
            home_score,
            away_score,
            status,
            season: None,
        }
    }

    #[test]
    fn test_final_score_requires_completed_status() {
        assert_eq!(
            game(Some(100), Some(90), GameStatus::Completed).final_score(),
            Some((100, 90))
        );
        assert_eq!(game(Some(100), Some(90), GameStatus::InProgress).final_score(), None);
        assert_eq!(game(Some(100), None, GameStatus::Completed).final_score(), None);
    }

    #[test]
    fn test_perspective_helpers() {
        let g = game(Some(95), Some(101), GameStatus::Completed);
        assert_eq!(g.scores_for(TeamId(2)), Some((101, 95)));
        assert_eq!(g.did_win(TeamId(1)), Some(false));
        assert_eq!(g.did_win(TeamId(3)), None);
        assert_eq!(g.margin(), Some(-6));
    }

    #[test]
    fn test_prediction_records_cover_every_kind() {
        let prediction = GamePrediction::neutral(TeamId(1), TeamId(2), "apex_ml");
        let records = prediction.to_records(GameId(7));
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].kind, PredictionKind::Total);
        assert_eq!(records[2].predicted_value, 220.0);
        assert!(records.iter().all(|r| r.confidence == 0.0));
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.features.team_window, 10);
        assert_eq!(parsed.training.feature_window, FeatureWindow::Current);
        assert_eq!(parsed.reconcile.spread_tolerance, 3.0);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str("[training]\nepochs = 50\n").unwrap();
        assert_eq!(parsed.training.epochs, 50);
        assert_eq!(parsed.training.seed, 42);
        assert_eq!(parsed.data.models_dir, "models");
    }

    #[test]
    fn test_single_default_profile_field_can_be_overridden() {
        let text = "[features.defaults.team]\navg_points_scored = 100.0\n\n\
                    [features.defaults.head_to_head]\navg_total_points = 200.0\n";
        let parsed: Config = toml::from_str(text).unwrap();

        let team = parsed.features.defaults.team;
        assert_eq!(team.avg_points_scored, 100.0);
        assert_eq!(team.avg_points_allowed, 110.0);
        assert_eq!(team.win_percentage, 0.5);

        let h2h = parsed.features.defaults.head_to_head;
        assert_eq!(h2h.avg_total_points, 200.0);
        assert_eq!(h2h.win_pct, 0.5);
    }
}
