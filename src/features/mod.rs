//! Feature extraction
//!
//! Rolling team statistics, head-to-head history and the combined matchup
//! feature vector fed to every model.

pub mod game_features;
pub mod head_to_head;
pub mod team_stats;

pub use game_features::{Feature, FeatureBuilder, FeatureVector};
pub use head_to_head::{HeadToHeadAggregator, HeadToHeadStats};
pub use team_stats::{TeamStats, TeamStatsAggregator};

use serde::{Deserialize, Serialize};

/// Outcome of an aggregation over stored games
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregate<T> {
    /// Computed from `games` qualifying games
    Observed { value: T, games: usize },
    /// No qualifying games exist
    Unavailable,
}

impl<T> Aggregate<T> {
    /// Resolve to the observed value or the supplied profile
    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Aggregate::Observed { value, .. } => value,
            Aggregate::Unavailable => default,
        }
    }

    pub fn games(&self) -> usize {
        match self {
            Aggregate::Observed { games, .. } => *games,
            Aggregate::Unavailable => 0,
        }
    }

    pub fn is_observed(&self) -> bool {
        matches!(self, Aggregate::Observed { .. })
    }
}

/// Profiles substituted when a team or a pairing has no history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsDefaults {
    pub team: TeamStats,
    pub head_to_head: HeadToHeadStats,
}

impl Default for StatsDefaults {
    fn default() -> Self {
        StatsDefaults {
            team: TeamStats::NO_HISTORY,
            head_to_head: HeadToHeadStats::NO_HISTORY,
        }
    }
}
