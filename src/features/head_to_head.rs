//! Pairwise history between two teams

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::GameStore;
use crate::features::Aggregate;
use crate::{GameRecord, Result, TeamId};

/// Head-to-head record from the first team's perspective
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadToHeadStats {
    /// Share of meetings the first team won
    pub win_pct: f32,
    /// Average combined points per meeting
    pub avg_total_points: f32,
    /// Average margin, positive when the first team outscored the second
    pub avg_margin: f32,
}

impl HeadToHeadStats {
    pub const NO_HISTORY: HeadToHeadStats = HeadToHeadStats {
        win_pct: 0.5,
        avg_total_points: 220.0,
        avg_margin: 0.0,
    };

    /// Compute from meetings between `first` and its opponent. Venue does not matter.
    pub fn from_games(games: &[GameRecord], first: TeamId) -> Option<Self> {
        let meetings: Vec<(f32, f32)> = games
            .iter()
            .filter_map(|g| g.scores_for(first))
            .map(|(scored, allowed)| (scored as f32, allowed as f32))
            .collect();

        if meetings.is_empty() {
            return None;
        }

        let n = meetings.len() as f32;
        let wins = meetings.iter().filter(|(s, a)| s > a).count();

        Some(HeadToHeadStats {
            win_pct: wins as f32 / n,
            avg_total_points: meetings.iter().map(|(s, a)| s + a).sum::<f32>() / n,
            avg_margin: meetings.iter().map(|(s, a)| s - a).sum::<f32>() / n,
        })
    }
}

impl Default for HeadToHeadStats {
    fn default() -> Self {
        Self::NO_HISTORY
    }
}

/// Computes head-to-head statistics from the store
pub struct HeadToHeadAggregator {
    window: usize,
    default_profile: HeadToHeadStats,
}

impl HeadToHeadAggregator {
    pub fn new(window: usize, default_profile: HeadToHeadStats) -> Self {
        HeadToHeadAggregator {
            window,
            default_profile,
        }
    }

    /// Statistics over the last `window` meetings of the pair, in either venue order
    pub fn compute<S: GameStore + ?Sized>(
        &self,
        store: &S,
        first: TeamId,
        second: TeamId,
        as_of: Option<NaiveDate>,
    ) -> Result<Aggregate<HeadToHeadStats>> {
        let games = store.head_to_head_games(first, second, self.window, as_of)?;
        Ok(match HeadToHeadStats::from_games(&games, first) {
            Some(value) => Aggregate::Observed {
                value,
                games: games.len(),
            },
            None => Aggregate::Unavailable,
        })
    }

    pub fn stats_or_default<S: GameStore + ?Sized>(
        &self,
        store: &S,
        first: TeamId,
        second: TeamId,
        as_of: Option<NaiveDate>,
    ) -> Result<HeadToHeadStats> {
        Ok(self
            .compute(store, first, second, as_of)?
            .unwrap_or(self.default_profile))
    }
}

impl Default for HeadToHeadAggregator {
    fn default() -> Self {
        HeadToHeadAggregator::new(5, HeadToHeadStats::NO_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::database::{Database, NewGame};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_no_meetings_yields_defaults() {
        let db = Database::in_memory().unwrap();
        let a = db.get_or_create_team("Suns", "PHX").unwrap().id;
        let b = db.get_or_create_team("Jazz", "UTA").unwrap().id;
        let c = db.get_or_create_team("Kings", "SAC").unwrap().id;
        db.upsert_game(&NewGame::completed(date(1), a, c, 100, 90)).unwrap();

        let aggregator = HeadToHeadAggregator::default();
        assert_eq!(aggregator.compute(&db, a, b, None).unwrap(), Aggregate::Unavailable);

        let stats = aggregator.stats_or_default(&db, a, b, None).unwrap();
        assert_eq!(stats.win_pct, 0.5);
        assert_eq!(stats.avg_total_points, 220.0);
        assert_eq!(stats.avg_margin, 0.0);
    }

    #[test]
    fn test_perspective_ignores_venue() {
        let db = Database::in_memory().unwrap();
        let a = db.get_or_create_team("Suns", "PHX").unwrap().id;
        let b = db.get_or_create_team("Jazz", "UTA").unwrap().id;
        // A wins at home by 10, A wins away by 4, A loses at home by 6
        db.upsert_game(&NewGame::completed(date(1), a, b, 110, 100)).unwrap();
        db.upsert_game(&NewGame::completed(date(2), b, a, 96, 100)).unwrap();
        db.upsert_game(&NewGame::completed(date(3), a, b, 94, 100)).unwrap();

        let aggregator = HeadToHeadAggregator::default();
        let from_a = aggregator.stats_or_default(&db, a, b, None).unwrap();
        assert!((from_a.win_pct - 2.0 / 3.0).abs() < 1e-6);
        assert!((from_a.avg_margin - 8.0 / 3.0).abs() < 1e-4);
        assert!((from_a.avg_total_points - 200.0).abs() < 1e-4);

        let from_b = aggregator.stats_or_default(&db, b, a, None).unwrap();
        assert!((from_b.win_pct - 1.0 / 3.0).abs() < 1e-6);
        assert!((from_b.avg_margin + 8.0 / 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_window_and_cutoff() {
        let db = Database::in_memory().unwrap();
        let a = db.get_or_create_team("Suns", "PHX").unwrap().id;
        let b = db.get_or_create_team("Jazz", "UTA").unwrap().id;
        for day in 1..=8 {
            db.upsert_game(&NewGame::completed(date(day), a, b, 100, 90)).unwrap();
        }

        let aggregator = HeadToHeadAggregator::default();
        assert_eq!(aggregator.compute(&db, a, b, None).unwrap().games(), 5);
        assert_eq!(aggregator.compute(&db, a, b, Some(date(3))).unwrap().games(), 2);
        assert_eq!(
            aggregator.compute(&db, a, b, Some(date(1))).unwrap(),
            Aggregate::Unavailable
        );
    }
}
