//! Matchup feature vector
//!
//! Combines both teams' rolling statistics and their head-to-head record into
//! one flat, named feature set. Every model projects this onto its own subset.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::GameStore;
use crate::features::{HeadToHeadAggregator, HeadToHeadStats, TeamStats, TeamStatsAggregator};
use crate::{FeatureConfig, Result, TeamId};

/// Names of every feature in a [`FeatureVector`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    HomeAvgScored,
    HomeAvgAllowed,
    AwayAvgScored,
    AwayAvgAllowed,
    HomePointDiff,
    AwayPointDiff,
    PointDiffAdvantage,
    HomeWinPct,
    AwayWinPct,
    WinPctAdvantage,
    HomeCourtAdvantage,
    HomeRecentForm,
    AwayRecentForm,
    FormAdvantage,
    H2hWinPct,
    H2hAvgTotal,
    H2hAvgMargin,
    HomeConsistency,
    AwayConsistency,
    ProjectedHomeScore,
    ProjectedAwayScore,
    ProjectedTotal,
    ProjectedSpread,
}

impl Feature {
    pub const ALL: [Feature; 23] = [
        Feature::HomeAvgScored,
        Feature::HomeAvgAllowed,
        Feature::AwayAvgScored,
        Feature::AwayAvgAllowed,
        Feature::HomePointDiff,
        Feature::AwayPointDiff,
        Feature::PointDiffAdvantage,
        Feature::HomeWinPct,
        Feature::AwayWinPct,
        Feature::WinPctAdvantage,
        Feature::HomeCourtAdvantage,
        Feature::HomeRecentForm,
        Feature::AwayRecentForm,
        Feature::FormAdvantage,
        Feature::H2hWinPct,
        Feature::H2hAvgTotal,
        Feature::H2hAvgMargin,
        Feature::HomeConsistency,
        Feature::AwayConsistency,
        Feature::ProjectedHomeScore,
        Feature::ProjectedAwayScore,
        Feature::ProjectedTotal,
        Feature::ProjectedSpread,
    ];

    /// Column name, as stored in model artifacts
    pub fn name(&self) -> &'static str {
        match self {
            Feature::HomeAvgScored => "home_avg_scored",
            Feature::HomeAvgAllowed => "home_avg_allowed",
            Feature::AwayAvgScored => "away_avg_scored",
            Feature::AwayAvgAllowed => "away_avg_allowed",
            Feature::HomePointDiff => "home_point_diff",
            Feature::AwayPointDiff => "away_point_diff",
            Feature::PointDiffAdvantage => "point_diff_advantage",
            Feature::HomeWinPct => "home_win_pct",
            Feature::AwayWinPct => "away_win_pct",
            Feature::WinPctAdvantage => "win_pct_advantage",
            Feature::HomeCourtAdvantage => "home_court_advantage",
            Feature::HomeRecentForm => "home_recent_form",
            Feature::AwayRecentForm => "away_recent_form",
            Feature::FormAdvantage => "form_advantage",
            Feature::H2hWinPct => "h2h_win_pct",
            Feature::H2hAvgTotal => "h2h_avg_total",
            Feature::H2hAvgMargin => "h2h_avg_margin",
            Feature::HomeConsistency => "home_consistency",
            Feature::AwayConsistency => "away_consistency",
            Feature::ProjectedHomeScore => "projected_home_score",
            Feature::ProjectedAwayScore => "projected_away_score",
            Feature::ProjectedTotal => "projected_total",
            Feature::ProjectedSpread => "projected_spread",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

/// Features for one home/away matchup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    // Team strength
    pub home_avg_scored: f32,
    pub home_avg_allowed: f32,
    pub away_avg_scored: f32,
    pub away_avg_allowed: f32,

    // Differentials
    pub home_point_diff: f32,
    pub away_point_diff: f32,
    /// home_point_diff - away_point_diff
    pub point_diff_advantage: f32,

    // Win percentage
    pub home_win_pct: f32,
    pub away_win_pct: f32,
    pub win_pct_advantage: f32,
    /// Home team's home win pct minus away team's away win pct
    pub home_court_advantage: f32,

    // Recent form
    pub home_recent_form: f32,
    pub away_recent_form: f32,
    pub form_advantage: f32,

    // Head-to-head, home team perspective
    pub h2h_win_pct: f32,
    pub h2h_avg_total: f32,
    pub h2h_avg_margin: f32,

    pub home_consistency: f32,
    pub away_consistency: f32,

    // Projections
    pub projected_home_score: f32,
    pub projected_away_score: f32,
    pub projected_total: f32,
    pub projected_spread: f32,
}

impl FeatureVector {
    pub const DIM: usize = Feature::ALL.len();

    /// Derive the full feature set from both teams' stats and their head-to-head record
    pub fn from_stats(home: &TeamStats, away: &TeamStats, h2h: &HeadToHeadStats) -> Self {
        let projected_home_score = (home.avg_points_scored + away.avg_points_allowed) / 2.0;
        let projected_away_score = (away.avg_points_scored + home.avg_points_allowed) / 2.0;

        FeatureVector {
            home_avg_scored: home.avg_points_scored,
            home_avg_allowed: home.avg_points_allowed,
            away_avg_scored: away.avg_points_scored,
            away_avg_allowed: away.avg_points_allowed,
            home_point_diff: home.avg_point_differential,
            away_point_diff: away.avg_point_differential,
            point_diff_advantage: home.avg_point_differential - away.avg_point_differential,
            home_win_pct: home.win_percentage,
            away_win_pct: away.win_percentage,
            win_pct_advantage: home.win_percentage - away.win_percentage,
            home_court_advantage: home.home_win_pct - away.away_win_pct,
            home_recent_form: home.recent_form,
            away_recent_form: away.recent_form,
            form_advantage: home.recent_form - away.recent_form,
            h2h_win_pct: h2h.win_pct,
            h2h_avg_total: h2h.avg_total_points,
            h2h_avg_margin: h2h.avg_margin,
            home_consistency: home.scoring_consistency,
            away_consistency: away.scoring_consistency,
            projected_home_score,
            projected_away_score,
            projected_total: projected_home_score + projected_away_score,
            projected_spread: projected_home_score - projected_away_score,
        }
    }

    pub fn get(&self, feature: Feature) -> f32 {
        match feature {
            Feature::HomeAvgScored => self.home_avg_scored,
            Feature::HomeAvgAllowed => self.home_avg_allowed,
            Feature::AwayAvgScored => self.away_avg_scored,
            Feature::AwayAvgAllowed => self.away_avg_allowed,
            Feature::HomePointDiff => self.home_point_diff,
            Feature::AwayPointDiff => self.away_point_diff,
            Feature::PointDiffAdvantage => self.point_diff_advantage,
            Feature::HomeWinPct => self.home_win_pct,
            Feature::AwayWinPct => self.away_win_pct,
            Feature::WinPctAdvantage => self.win_pct_advantage,
            Feature::HomeCourtAdvantage => self.home_court_advantage,
            Feature::HomeRecentForm => self.home_recent_form,
            Feature::AwayRecentForm => self.away_recent_form,
            Feature::FormAdvantage => self.form_advantage,
            Feature::H2hWinPct => self.h2h_win_pct,
            Feature::H2hAvgTotal => self.h2h_avg_total,
            Feature::H2hAvgMargin => self.h2h_avg_margin,
            Feature::HomeConsistency => self.home_consistency,
            Feature::AwayConsistency => self.away_consistency,
            Feature::ProjectedHomeScore => self.projected_home_score,
            Feature::ProjectedAwayScore => self.projected_away_score,
            Feature::ProjectedTotal => self.projected_total,
            Feature::ProjectedSpread => self.projected_spread,
        }
    }

    /// Values of the given features, in order
    pub fn select(&self, features: &[Feature]) -> Vec<f32> {
        features.iter().map(|f| self.get(*f)).collect()
    }

    /// Convert to a flat vector in [`Feature::ALL`] order
    pub fn to_vec(&self) -> Vec<f32> {
        self.select(&Feature::ALL)
    }
}

impl Default for FeatureVector {
    /// Vector for two teams without any history
    fn default() -> Self {
        FeatureVector::from_stats(
            &TeamStats::NO_HISTORY,
            &TeamStats::NO_HISTORY,
            &HeadToHeadStats::NO_HISTORY,
        )
    }
}

/// Builds matchup feature vectors from stored history
pub struct FeatureBuilder {
    team_stats: TeamStatsAggregator,
    head_to_head: HeadToHeadAggregator,
}

impl FeatureBuilder {
    pub fn new(config: &FeatureConfig) -> Self {
        FeatureBuilder {
            team_stats: TeamStatsAggregator::new(
                config.team_window,
                config.form_window,
                config.defaults.team,
            ),
            head_to_head: HeadToHeadAggregator::new(
                config.head_to_head_window,
                config.defaults.head_to_head,
            ),
        }
    }

    /// Features for a matchup using each team's current form
    pub fn build<S: GameStore + ?Sized>(
        &self,
        store: &S,
        home: TeamId,
        away: TeamId,
    ) -> Result<FeatureVector> {
        self.build_as_of(store, home, away, None)
    }

    /// Features for a matchup using only games strictly before `as_of` when given
    pub fn build_as_of<S: GameStore + ?Sized>(
        &self,
        store: &S,
        home: TeamId,
        away: TeamId,
        as_of: Option<NaiveDate>,
    ) -> Result<FeatureVector> {
        let home_stats = self.team_stats.stats_or_default(store, home, as_of)?;
        let away_stats = self.team_stats.stats_or_default(store, away, as_of)?;
        let h2h = self.head_to_head.stats_or_default(store, home, away, as_of)?;

        Ok(FeatureVector::from_stats(&home_stats, &away_stats, &h2h))
    }
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        FeatureBuilder::new(&FeatureConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::database::{Database, NewGame};

    fn seeded_db() -> (Database, TeamId, TeamId) {
        let db = Database::in_memory().unwrap();
        let a = db.get_or_create_team("Warriors", "GSW").unwrap().id;
        let b = db.get_or_create_team("Bucks", "MIL").unwrap().id;
        let c = db.get_or_create_team("Nuggets", "DEN").unwrap().id;
        let scores = [(118, 104), (99, 107), (121, 119), (95, 88), (110, 112), (130, 101)];
        for (i, (hs, aws)) in scores.iter().enumerate() {
            let date = NaiveDate::from_ymd_opt(2024, 2, 1 + i as u32).unwrap();
            let (home, away) = match i % 3 {
                0 => (a, b),
                1 => (b, c),
                _ => (c, a),
            };
            db.upsert_game(&NewGame::completed(date, home, away, *hs, *aws)).unwrap();
        }
        (db, a, b)
    }

    #[test]
    fn test_default_vector_projections() {
        let v = FeatureVector::default();
        assert_eq!(v.projected_home_score, 110.0);
        assert_eq!(v.projected_total, 220.0);
        assert_eq!(v.projected_spread, 0.0);
        assert_eq!(v.h2h_avg_total, 220.0);
        assert_eq!(v.home_court_advantage, 0.0);
    }

    #[test]
    fn test_derived_features() {
        let home = TeamStats {
            avg_points_scored: 115.0,
            avg_points_allowed: 105.0,
            avg_point_differential: 10.0,
            win_percentage: 0.7,
            home_win_pct: 0.8,
            away_win_pct: 0.6,
            recent_form: 0.6,
            scoring_consistency: 0.2,
        };
        let away = TeamStats {
            avg_points_scored: 108.0,
            avg_points_allowed: 111.0,
            avg_point_differential: -3.0,
            win_percentage: 0.4,
            home_win_pct: 0.5,
            away_win_pct: 0.25,
            recent_form: 0.2,
            scoring_consistency: 0.1,
        };
        let v = FeatureVector::from_stats(&home, &away, &HeadToHeadStats::NO_HISTORY);

        assert_eq!(v.point_diff_advantage, 13.0);
        assert!((v.home_court_advantage - 0.55).abs() < 1e-6);
        assert!((v.form_advantage - 0.4).abs() < 1e-6);
        assert_eq!(v.projected_home_score, 113.0);
        assert_eq!(v.projected_away_score, 106.5);
        assert_eq!(v.projected_total, 219.5);
        assert_eq!(v.projected_spread, 6.5);
    }

    #[test]
    fn test_feature_names_round_trip() {
        for feature in Feature::ALL {
            assert_eq!(Feature::from_name(feature.name()), Some(feature));
        }
        assert_eq!(Feature::from_name("elo_rating"), None);
        assert_eq!(FeatureVector::default().to_vec().len(), FeatureVector::DIM);
    }

    #[test]
    fn test_builder_is_deterministic() {
        let (db, a, b) = seeded_db();
        let builder = FeatureBuilder::default();

        let first = builder.build(&db, a, b).unwrap();
        let second = builder.build(&db, a, b).unwrap();

        let bits = |v: &FeatureVector| v.to_vec().iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&first), bits(&second));
        assert!(first.to_vec().iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_builder_unknown_teams_use_defaults() {
        let (db, _, _) = seeded_db();
        let builder = FeatureBuilder::default();
        let v = builder.build(&db, TeamId(900), TeamId(901)).unwrap();
        assert_eq!(v, FeatureVector::default());
    }
}
