//! Home win probability classifier

use crate::data::Label;
use crate::features::Feature;
use crate::model::predictor::{ModelOutput, ModelSpec, ModelState, PredictorModel};
use crate::training::Objective;

pub const OUTCOME_FEATURES: [Feature; 17] = [
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
    Feature::HomeConsistency,
    Feature::AwayConsistency,
];

const SPEC: ModelSpec = ModelSpec {
    name: "game_outcome_model",
    features: &OUTCOME_FEATURES,
    label: Label::HomeWin,
    hidden_width: None,
    objective: Objective::BinaryCrossEntropy,
};

/// Logistic regression on the outcome features.
///
/// `value` of its output is the home win probability.
#[derive(Debug, Default)]
pub struct OutcomeModel {
    state: ModelState,
}

impl OutcomeModel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PredictorModel for OutcomeModel {
    fn spec(&self) -> &ModelSpec {
        &SPEC
    }

    fn state(&self) -> &ModelState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ModelState {
        &mut self.state
    }

    /// Distance from a coin flip, scaled to [0, 1]
    fn confidence(&self, probability: f32) -> f32 {
        (probability - 0.5).abs() * 2.0
    }

    fn fallback(&self) -> ModelOutput {
        ModelOutput {
            value: 0.5,
            confidence: 0.0,
        }
    }
}
