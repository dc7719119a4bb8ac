//! Team statistics computation
//!
//! Rolling performance metrics for one team over its most recent completed games.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::GameStore;
use crate::features::Aggregate;
use crate::{GameRecord, Result, TeamId};

/// Rolling statistics for a team
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamStats {
    /// Average points scored per game
    pub avg_points_scored: f32,
    /// Average points allowed per game
    pub avg_points_allowed: f32,
    /// Scored minus allowed
    pub avg_point_differential: f32,
    /// Wins over games in the window (0-1)
    pub win_percentage: f32,
    /// Win fraction in home games only
    pub home_win_pct: f32,
    /// Win fraction in away games only
    pub away_win_pct: f32,
    /// Win fraction over the most recent games
    pub recent_form: f32,
    /// 1 / (std dev of points scored + 1), in (0, 1]
    pub scoring_consistency: f32,
}

impl TeamStats {
    /// Profile used for a team with no completed games
    pub const NO_HISTORY: TeamStats = TeamStats {
        avg_points_scored: 110.0,
        avg_points_allowed: 110.0,
        avg_point_differential: 0.0,
        win_percentage: 0.5,
        home_win_pct: 0.5,
        away_win_pct: 0.5,
        recent_form: 0.5,
        scoring_consistency: 0.5,
    };

    /// Compute statistics from a team's games, newest first.
    ///
    /// Returns None when none of the games is a completed game involving `team`.
    pub fn from_games(games: &[GameRecord], team: TeamId, form_window: usize) -> Option<Self> {
        // (scored, allowed, at home)
        let results: Vec<(f32, f32, bool)> = games
            .iter()
            .filter_map(|g| {
                let (scored, allowed) = g.scores_for(team)?;
                Some((scored as f32, allowed as f32, g.home_team == team))
            })
            .collect();

        if results.is_empty() {
            return None;
        }

        let n = results.len() as f32;
        let scored: Vec<f32> = results.iter().map(|r| r.0).collect();
        let avg_scored = scored.iter().sum::<f32>() / n;
        let avg_allowed = results.iter().map(|r| r.1).sum::<f32>() / n;

        let wins = results.iter().filter(|r| r.0 > r.1).count();

        let venue_win_pct = |home: bool| -> f32 {
            let (played, won) = results
                .iter()
                .filter(|r| r.2 == home)
                .fold((0usize, 0usize), |(p, w), r| (p + 1, w + usize::from(r.0 > r.1)));
            if played == 0 {
                0.5
            } else {
                won as f32 / played as f32
            }
        };

        let recent: Vec<_> = results.iter().take(form_window.max(1)).collect();
        let recent_wins = recent.iter().filter(|r| r.0 > r.1).count();

        // Population standard deviation
        let variance = scored.iter().map(|s| (s - avg_scored).powi(2)).sum::<f32>() / n;

        Some(TeamStats {
            avg_points_scored: avg_scored,
            avg_points_allowed: avg_allowed,
            avg_point_differential: avg_scored - avg_allowed,
            win_percentage: wins as f32 / n,
            home_win_pct: venue_win_pct(true),
            away_win_pct: venue_win_pct(false),
            recent_form: recent_wins as f32 / recent.len() as f32,
            scoring_consistency: 1.0 / (variance.sqrt() + 1.0),
        })
    }
}

impl Default for TeamStats {
    fn default() -> Self {
        Self::NO_HISTORY
    }
}

/// Computes rolling statistics for a team from the store
pub struct TeamStatsAggregator {
    /// Number of recent games considered
    window: usize,
    /// Games counted as recent form
    form_window: usize,
    /// Substituted when a team has no history
    default_profile: TeamStats,
}

impl TeamStatsAggregator {
    pub fn new(window: usize, form_window: usize, default_profile: TeamStats) -> Self {
        TeamStatsAggregator {
            window,
            form_window,
            default_profile,
        }
    }

    /// Statistics over the team's last `window` completed games.
    ///
    /// With `as_of`, only games strictly before that date count.
    pub fn compute<S: GameStore + ?Sized>(
        &self,
        store: &S,
        team: TeamId,
        as_of: Option<NaiveDate>,
    ) -> Result<Aggregate<TeamStats>> {
        let games = store.recent_completed_games(team, self.window, as_of)?;
        Ok(match TeamStats::from_games(&games, team, self.form_window) {
            Some(value) => Aggregate::Observed {
                value,
                games: games.len(),
            },
            None => Aggregate::Unavailable,
        })
    }

    /// Statistics for the team, or the default profile when it has no history
    pub fn stats_or_default<S: GameStore + ?Sized>(
        &self,
        store: &S,
        team: TeamId,
        as_of: Option<NaiveDate>,
    ) -> Result<TeamStats> {
        let aggregate = self.compute(store, team, as_of)?;
        if !aggregate.is_observed() {
            log::debug!("No completed games for {}, using default profile", team);
        }
        Ok(aggregate.unwrap_or(self.default_profile))
    }
}

impl Default for TeamStatsAggregator {
    fn default() -> Self {
        TeamStatsAggregator::new(10, 5, TeamStats::NO_HISTORY)
    }
}
