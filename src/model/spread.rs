//! Point spread regressor (home minus away)

use crate::data::Label;
use crate::features::Feature;
use crate::model::predictor::{ModelOutput, ModelSpec, ModelState, PredictorModel};
use crate::training::Objective;

pub const SPREAD_FEATURES: [Feature; 10] = [
    Feature::HomeAvgScored,
    Feature::HomeAvgAllowed,
    Feature::AwayAvgScored,
    Feature::AwayAvgAllowed,
    Feature::PointDiffAdvantage,
    Feature::WinPctAdvantage,
    Feature::HomeCourtAdvantage,
    Feature::FormAdvantage,
    Feature::H2hAvgMargin,
    Feature::ProjectedSpread,
];

const SPEC: ModelSpec = ModelSpec {
    name: "spread_model",
    features: &SPREAD_FEATURES,
    label: Label::PointSpread,
    hidden_width: Some(16),
    objective: Objective::MeanSquaredError,
};

#[derive(Debug, Default)]
pub struct SpreadModel {
    state: ModelState,
}

impl SpreadModel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PredictorModel for SpreadModel {
    fn spec(&self) -> &ModelSpec {
        &SPEC
    }

    fn state(&self) -> &ModelState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ModelState {
        &mut self.state
    }

    // 20 points or more is as confident as a spread call gets
    fn confidence(&self, spread: f32) -> f32 {
        (spread.abs() / 20.0).min(0.8)
    }

    fn fallback(&self) -> ModelOutput {
        ModelOutput {
            value: 0.0,
            confidence: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TrainingSet;
    use crate::features::FeatureVector;
    use crate::TrainingConfig;

    #[test]
    fn test_confidence_is_capped() {
        let model = SpreadModel::new();
        assert_eq!(model.confidence(0.0), 0.0);
        assert_eq!(model.confidence(-10.0), 0.5);
        assert_eq!(model.confidence(40.0), 0.8);
    }

    #[test]
    fn test_untrained_returns_fallback() {
        let model = SpreadModel::new();
        let output = model.predict(&FeatureVector::default());
        assert_eq!(output, ModelOutput { value: 0.0, confidence: 0.0 });
    }

    #[test]
    fn test_missing_artifact_is_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = SpreadModel::new();
        assert!(!model.load(dir.path()).unwrap());
        assert!(!model.is_ready());
    }

    #[test]
    fn test_empty_training_set_leaves_model_untrained() {
        let mut model = SpreadModel::new();
        assert!(!model.train(&TrainingSet::default(), &TrainingConfig::default()));
        assert!(matches!(model.state(), ModelState::Untrained));
        assert_eq!(model.predict(&FeatureVector::default()), model.fallback());
    }
}
