//! Training set assembly
//!
//! One row per completed game: the matchup feature vector plus the realized
//! labels every model trains against.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::GameStore;
use crate::features::{FeatureBuilder, FeatureVector};
use crate::{DateRange, GameId, GameRecord, Result};

/// Which games feed the rolling windows of a training row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureWindow {
    /// Each team's latest form at assembly time, regardless of the row's date.
    /// Rows may see games played after them.
    #[default]
    Current,
    /// Only games strictly before the row's own date
    PointInTime,
}

/// Realized result of a completed game
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Labels {
    pub home_score: f32,
    pub away_score: f32,
    pub total_points: f32,
    /// Home minus away
    pub point_spread: f32,
    /// 1.0 when the home team won
    pub home_win: f32,
}

impl Labels {
    pub fn from_game(game: &GameRecord) -> Option<Self> {
        let (home, away) = game.final_score()?;
        let (home, away) = (home as f32, away as f32);
        Some(Labels {
            home_score: home,
            away_score: away,
            total_points: home + away,
            point_spread: home - away,
            home_win: if home > away { 1.0 } else { 0.0 },
        })
    }

    pub fn get(&self, label: Label) -> f32 {
        match label {
            Label::HomeScore => self.home_score,
            Label::AwayScore => self.away_score,
            Label::TotalPoints => self.total_points,
            Label::PointSpread => self.point_spread,
            Label::HomeWin => self.home_win,
        }
    }
}

/// Target column selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    HomeScore,
    AwayScore,
    TotalPoints,
    PointSpread,
    HomeWin,
}

impl Label {
    pub fn name(&self) -> &'static str {
        match self {
            Label::HomeScore => "home_score",
            Label::AwayScore => "away_score",
            Label::TotalPoints => "total_points",
            Label::PointSpread => "point_spread",
            Label::HomeWin => "home_win",
        }
    }
}

/// A single training example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    pub game_id: GameId,
    pub game_date: NaiveDate,
    pub features: FeatureVector,
    pub labels: Labels,
}

/// Rows in ascending date order
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    rows: Vec<TrainingRow>,
}

impl TrainingSet {
    pub fn new(rows: Vec<TrainingRow>) -> Self {
        TrainingSet { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[TrainingRow] {
        &self.rows
    }

    /// Target values for `label`, or None when the set is empty or any value is non-finite
    pub fn label_column(&self, label: Label) -> Option<Vec<f32>> {
        if self.rows.is_empty() {
            return None;
        }
        let values: Vec<f32> = self.rows.iter().map(|r| r.labels.get(label)).collect();
        values.iter().all(|v| v.is_finite()).then_some(values)
    }
}

/// Builds a [`TrainingSet`] from stored history
pub struct TrainingSetAssembler<'a> {
    builder: &'a FeatureBuilder,
    window: FeatureWindow,
}

impl<'a> TrainingSetAssembler<'a> {
    pub fn new(builder: &'a FeatureBuilder, window: FeatureWindow) -> Self {
        TrainingSetAssembler { builder, window }
    }

    /// One row per completed game in `range`, oldest first
    pub fn assemble<S: GameStore + ?Sized>(
        &self,
        store: &S,
        range: DateRange,
    ) -> Result<TrainingSet> {
        let games = store.completed_games(range)?;
        log::info!("Assembling training set from {} games ({})", games.len(), range);

        let mut rows = Vec::with_capacity(games.len());
        for game in &games {
            let Some(labels) = Labels::from_game(game) else {
                continue;
            };
            let as_of = match self.window {
                FeatureWindow::Current => None,
                FeatureWindow::PointInTime => Some(game.date),
            };
            let features = self
                .builder
                .build_as_of(store, game.home_team, game.away_team, as_of)?;
            rows.push(TrainingRow {
                game_id: game.id,
                game_date: game.date,
                features,
                labels,
            });
        }

        if rows.is_empty() {
            log::warn!("No completed games found for {}", range);
        }

        Ok(TrainingSet::new(rows))
    }
}
